use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::content::{Document, DocumentContent, GenerationMetadata};
use crate::errors::AppError;
use crate::history::VersionSnapshot;
use crate::layout::LayoutParameters;
use crate::persistence::store::{DocumentStore, DocumentSummary};
use crate::templates::Template;

#[derive(Debug, Clone, FromRow)]
pub struct OnePagerRow {
    pub id: Uuid,
    pub title: String,
    pub template: String,
    pub content: Value,
    pub layout_params: Value,
    pub brand_kit_id: Option<Uuid>,
    pub version: i32,
    pub current_version: Option<i32>,
    pub version_history: Value,
    pub generation_metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OnePagerRow {
    /// Rebuilds the typed document. Stored layout parameters from older rows are
    /// clamped into range rather than rejected.
    pub fn into_document(self) -> Result<Document, AppError> {
        let content: DocumentContent = serde_json::from_value(self.content)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt content for {}: {e}", self.id)))?;
        let layout_params: LayoutParameters = serde_json::from_value(self.layout_params)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt layout for {}: {e}", self.id)))?;
        let version_history: Vec<VersionSnapshot> = serde_json::from_value(self.version_history)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt history for {}: {e}", self.id)))?;
        let generation: GenerationMetadata = serde_json::from_value(self.generation_metadata)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt metadata for {}: {e}", self.id)))?;
        let template: Template = self.template.parse()?;

        let mut document = Document::new(self.title, content, &generation.ai_model);
        document.id = self.id;
        document.template = template;
        document.layout_params = layout_params.clamped();
        document.brand_kit_id = self.brand_kit_id;
        document.version = self.version.max(0) as u32;
        document.current_version = self.current_version.map(|v| v.max(0) as u32);
        document.version_history = version_history;
        document.generation = generation;
        document.created_at = self.created_at;
        document.updated_at = self.updated_at;
        Ok(document)
    }
}

struct Columns {
    content: Value,
    layout_params: Value,
    version_history: Value,
    generation_metadata: Value,
}

fn columns(document: &Document) -> Result<Columns, AppError> {
    let encode = |v: serde_json::Result<Value>| v.map_err(|e| AppError::Internal(e.into()));
    Ok(Columns {
        content: encode(serde_json::to_value(&document.content))?,
        layout_params: encode(serde_json::to_value(&document.layout_params))?,
        version_history: encode(serde_json::to_value(&document.version_history))?,
        generation_metadata: encode(serde_json::to_value(&document.generation))?,
    })
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, document: &Document) -> Result<(), AppError> {
        let cols = columns(document)?;
        sqlx::query(
            r#"
            INSERT INTO onepagers
                (id, title, template, content, layout_params, brand_kit_id, version,
                 current_version, version_history, generation_metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(document.template.as_str())
        .bind(&cols.content)
        .bind(&cols.layout_params)
        .bind(document.brand_kit_id)
        .bind(document.version as i32)
        .bind(document.current_version.map(|v| v as i32))
        .bind(&cols.version_history)
        .bind(&cols.generation_metadata)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, document: &Document) -> Result<(), AppError> {
        let cols = columns(document)?;
        sqlx::query(
            r#"
            INSERT INTO onepagers
                (id, title, template, content, layout_params, brand_kit_id, version,
                 current_version, version_history, generation_metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                template = EXCLUDED.template,
                content = EXCLUDED.content,
                layout_params = EXCLUDED.layout_params,
                brand_kit_id = EXCLUDED.brand_kit_id,
                version = EXCLUDED.version,
                current_version = EXCLUDED.current_version,
                version_history = EXCLUDED.version_history,
                generation_metadata = EXCLUDED.generation_metadata,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(document.template.as_str())
        .bind(&cols.content)
        .bind(&cols.layout_params)
        .bind(document.brand_kit_id)
        .bind(document.version as i32)
        .bind(document.current_version.map(|v| v as i32))
        .bind(&cols.version_history)
        .bind(&cols.generation_metadata)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await?;
        debug!(document_id = %document.id, "one-pager saved");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let row: Option<OnePagerRow> = sqlx::query_as("SELECT * FROM onepagers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(OnePagerRow::into_document).transpose()
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>, AppError> {
        let rows: Vec<OnePagerRow> =
            sqlx::query_as("SELECT * FROM onepagers ORDER BY updated_at DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|row| row.into_document().map(|doc| DocumentSummary::from(&doc)))
            .collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM onepagers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlockContent, ContentBlock};

    fn make_row() -> OnePagerRow {
        let mut content = DocumentContent::new("Headline");
        content.blocks = vec![ContentBlock::new("a", BlockContent::Text("x".into()), 0)];
        let doc = Document::new("Doc", content, "test-model");
        let cols = columns(&doc).unwrap();
        OnePagerRow {
            id: doc.id,
            title: doc.title.clone(),
            template: "bold".to_string(),
            content: cols.content,
            layout_params: cols.layout_params,
            brand_kit_id: None,
            version: 0,
            current_version: None,
            version_history: cols.version_history,
            generation_metadata: cols.generation_metadata,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }

    #[test]
    fn test_row_into_document() {
        let row = make_row();
        let id = row.id;
        let doc = row.into_document().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.template, Template::Bold);
        assert_eq!(doc.content.blocks.len(), 1);
    }

    #[test]
    fn test_row_with_out_of_range_layout_is_clamped() {
        let mut row = make_row();
        row.layout_params = serde_json::json!({"typography": {"h1_scale": 4.0}});
        let doc = row.into_document().unwrap();
        assert_eq!(doc.layout_params.typography.h1_scale, 1.5);
    }

    #[test]
    fn test_row_with_unknown_template_fails() {
        let mut row = make_row();
        row.template = "retro".to_string();
        assert!(matches!(
            row.into_document(),
            Err(AppError::Validation(_))
        ));
    }
}
