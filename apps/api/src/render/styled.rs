//! Styled rendering: the external document-template engine and the shared markup cache.
//!
//! The engine receives the slot assignment computed here rather than re-deriving it,
//! so the styled document and the wireframe always agree on which block lands where.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::content::{BrandKit, Document};
use crate::errors::AppError;
use crate::layout::{scale, RenderSurface, ResolvedSizes, ScalingTokens};
use crate::render::controller::StyledKey;
use crate::render::export::{ExportRequest, PageFormat};
use crate::templates::{resolve, SlotAssignment, Template};

// ────────────────────────────────────────────────────────────────────────────
// Template engine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TemplateEngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template engine error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<TemplateEngineError> for AppError {
    fn from(e: TemplateEngineError) -> Self {
        AppError::TemplateEngine(e.to_string())
    }
}

/// Produces the final read-only styled markup for a document, and its paginated
/// PDF export.
#[async_trait]
pub trait TemplateEngine: Send + Sync {
    async fn render_styled(
        &self,
        document: &Document,
        template: Template,
    ) -> Result<String, TemplateEngineError>;

    async fn render_pdf(
        &self,
        document: &Document,
        template: Template,
        format: PageFormat,
        brand: Option<&BrandKit>,
    ) -> Result<Vec<u8>, TemplateEngineError>;
}

#[derive(Debug, Serialize)]
pub struct RenderRequest<'a> {
    pub document_id: uuid::Uuid,
    pub template: Template,
    pub document: &'a Document,
    pub slots: SlotAssignment,
    pub tokens: ScalingTokens,
    pub css_variables: std::collections::BTreeMap<&'static str, String>,
    pub sizes: ResolvedSizes,
}

impl<'a> RenderRequest<'a> {
    pub fn new(document: &'a Document, template: Template) -> Self {
        let tokens = scale(&document.layout_params);
        Self {
            document_id: document.id,
            template,
            document,
            slots: resolve(&document.content, template),
            css_variables: tokens.css_variables(),
            sizes: RenderSurface::Styled.resolve(&tokens),
            tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    markup: String,
}

/// HTTP client for the external template engine.
#[derive(Clone)]
pub struct HttpTemplateEngine {
    client: Client,
    base_url: String,
}

impl HttpTemplateEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TemplateEngine for HttpTemplateEngine {
    async fn render_styled(
        &self,
        document: &Document,
        template: Template,
    ) -> Result<String, TemplateEngineError> {
        let request = RenderRequest::new(document, template);
        let url = format!("{}/render", self.base_url);

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Template engine returned {}: {}", status, message);
            return Err(TemplateEngineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: RenderResponse = serde_json::from_str(&body)?;
        debug!(
            document_id = %document.id,
            %template,
            bytes = parsed.markup.len(),
            "styled markup rendered"
        );
        Ok(parsed.markup)
    }

    async fn render_pdf(
        &self,
        document: &Document,
        template: Template,
        format: PageFormat,
        brand: Option<&BrandKit>,
    ) -> Result<Vec<u8>, TemplateEngineError> {
        let request = ExportRequest::new(document, template, format, brand);
        let url = format!("{}/export/pdf", self.base_url);

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Template engine export returned {}: {}", status, message);
            return Err(TemplateEngineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        debug!(
            document_id = %document.id,
            %template,
            %format,
            bytes = bytes.len(),
            "pdf exported"
        );
        Ok(bytes.to_vec())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Markup cache
// ────────────────────────────────────────────────────────────────────────────

/// Shared cache of rendered markup keyed by `StyledKey::cache_key`.
#[async_trait]
pub trait MarkupCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn put(&self, key: &str, markup: &str) -> Result<(), AppError>;
}

pub struct RedisMarkupCache {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisMarkupCache {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }
}

#[async_trait]
impl MarkupCache for RedisMarkupCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(cached)
    }

    async fn put(&self, key: &str, markup: &str) -> Result<(), AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(markup)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

/// Process-local cache; used in tests and when no Redis is configured.
#[derive(Default)]
pub struct MemoryMarkupCache {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl MarkupCache for MemoryMarkupCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, markup: &str) -> Result<(), AppError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), markup.to_string());
        Ok(())
    }
}

/// Cached styled rendering. A cache failure degrades to a direct render.
pub async fn fetch_styled(
    engine: &dyn TemplateEngine,
    cache: &dyn MarkupCache,
    document: &Document,
    template: Template,
) -> Result<String, AppError> {
    let key = StyledKey::new(document, template).cache_key();

    match cache.get(&key).await {
        Ok(Some(markup)) => {
            debug!(%key, "styled cache hit");
            return Ok(markup);
        }
        Ok(None) => {}
        Err(e) => warn!(%key, error = %e, "styled cache read failed"),
    }

    let markup = engine.render_styled(document, template).await?;
    info!(document_id = %document.id, %template, "styled document rendered");

    if let Err(e) = cache.put(&key, &markup).await {
        warn!(%key, error = %e, "styled cache write failed");
    }
    Ok(markup)
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Echoes the slot assignment's region names so tests can see what was sent.
    #[derive(Default)]
    pub struct EchoTemplateEngine {
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    #[async_trait]
    impl TemplateEngine for EchoTemplateEngine {
        async fn render_styled(
            &self,
            document: &Document,
            template: Template,
        ) -> Result<String, TemplateEngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TemplateEngineError::Api {
                    status: 500,
                    message: "engine down".to_string(),
                });
            }
            let request = RenderRequest::new(document, template);
            let regions: Vec<&str> = request.slots.regions.iter().map(|r| r.region).collect();
            Ok(format!("<article data-template=\"{template}\">{}</article>", regions.join(",")))
        }

        async fn render_pdf(
            &self,
            document: &Document,
            template: Template,
            format: PageFormat,
            brand: Option<&BrandKit>,
        ) -> Result<Vec<u8>, TemplateEngineError> {
            let markup = self.render_styled(document, template).await?;
            let company = brand.map(|b| b.company_name.as_str()).unwrap_or("default");
            Ok(format!("%PDF-1.4 {format} {company} {markup}").into_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::fakes::EchoTemplateEngine;
    use super::*;
    use crate::content::DocumentContent;

    fn make_document() -> Document {
        Document::new("Doc", DocumentContent::new("Headline"), "test-model")
    }

    #[tokio::test]
    async fn test_fetch_styled_caches_by_key() {
        let engine = EchoTemplateEngine::default();
        let cache = MemoryMarkupCache::default();
        let doc = make_document();

        let first = fetch_styled(&engine, &cache, &doc, Template::Business).await.unwrap();
        let second = fetch_styled(&engine, &cache, &doc, Template::Business).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert!(first.contains("metrics"));
    }

    #[tokio::test]
    async fn test_edit_changes_cache_key() {
        let engine = EchoTemplateEngine::default();
        let cache = MemoryMarkupCache::default();
        let mut doc = make_document();

        fetch_styled(&engine, &cache, &doc, Template::Bold).await.unwrap();
        doc.updated_at += chrono::Duration::seconds(1);
        fetch_styled(&engine, &cache, &doc, Template::Bold).await.unwrap();
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_engine_failure_maps_to_template_engine_error() {
        let engine = EchoTemplateEngine {
            fail: true,
            ..Default::default()
        };
        let cache = MemoryMarkupCache::default();
        let err = fetch_styled(&engine, &cache, &make_document(), Template::Product)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TemplateEngine(_)));
    }

    #[test]
    fn test_render_request_carries_assignment_and_tokens() {
        let doc = make_document();
        let request = RenderRequest::new(&doc, Template::Product);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["template"], "product");
        assert_eq!(json["slots"]["template"], "product");
        assert_eq!(json["css_variables"]["--layout-section-gap"], "20px");
        assert_eq!(json["sizes"]["body_px"], 11.0);
    }
}
