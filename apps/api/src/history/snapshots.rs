//! Version Snapshot Store.
//!
//! History is append-only and lives on the document. A snapshot records the state a
//! wholesale change is about to replace (AI iteration, explicit layout application),
//! so every prior state stays reachable. Restoring copies a snapshot back without
//! creating a new one; the next snapshot still gets a fresh, never-reused number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::content::{Document, DocumentContent};
use crate::errors::ValidationError;
use crate::layout::LayoutParameters;

const DESCRIPTION_MAX_CHARS: usize = 200;
const DEFAULT_DESCRIPTION: &str = "Manual update";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub version: u32,
    pub content: DocumentContent,
    pub layout_params: LayoutParameters,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// History listing entry; omits the copied content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    pub block_count: usize,
    pub is_current: bool,
}

/// Snapshot description from the triggering feedback, capped at 200 characters.
pub fn describe(feedback: Option<&str>) -> String {
    match feedback.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => f.chars().take(DESCRIPTION_MAX_CHARS).collect(),
        None => DEFAULT_DESCRIPTION.to_string(),
    }
}

/// Appends a deep copy of the current content and layout parameters and returns
/// the new version number.
pub fn create_snapshot(document: &mut Document, description: Option<String>) -> u32 {
    let version = document.version + 1;
    document.version_history.push(VersionSnapshot {
        version,
        content: document.content.clone(),
        layout_params: document.layout_params.clone(),
        created_at: Utc::now(),
        description,
    });
    document.version = version;
    info!(document_id = %document.id, version, "snapshot created");
    version
}

/// Replaces content and layout parameters with snapshot `version`'s copies.
pub fn restore(document: &mut Document, version: u32) -> Result<(), ValidationError> {
    let snapshot = document
        .version_history
        .iter()
        .find(|s| s.version == version)
        .cloned()
        .ok_or(ValidationError::UnknownVersion(version))?;

    document.content = snapshot.content;
    document.layout_params = snapshot.layout_params;
    document.current_version = Some(version);
    document.mark_edited();
    info!(document_id = %document.id, version, "snapshot restored");
    Ok(())
}

/// Explicit layout application: snapshots the outgoing state, then installs `params`.
/// Invalid parameters are rejected before anything is recorded.
pub fn apply_layout(
    document: &mut Document,
    params: LayoutParameters,
    description: Option<&str>,
) -> Result<u32, ValidationError> {
    params.validate()?;
    let version = create_snapshot(
        document,
        Some(description.map_or_else(|| "Layout update".to_string(), |d| describe(Some(d)))),
    );
    document.layout_params = params;
    document.current_version = None;
    document.mark_edited();
    Ok(version)
}

/// Snapshots newest first.
pub fn list_snapshots(document: &Document) -> Vec<SnapshotSummary> {
    document
        .version_history
        .iter()
        .rev()
        .map(|s| SnapshotSummary {
            version: s.version,
            created_at: s.created_at,
            description: s.description.clone(),
            block_count: s.content.blocks.len(),
            is_current: document.current_version == Some(s.version),
        })
        .collect()
}

pub fn get_snapshot(document: &Document, version: u32) -> Option<&VersionSnapshot> {
    document.version_history.iter().find(|s| s.version == version)
}
