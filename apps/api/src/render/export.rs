//! Paginated export. The template engine lays out the same slot assignment the
//! styled surface uses onto a fixed page size and returns the finished PDF.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::{BrandKit, Document};
use crate::errors::{AppError, ValidationError};
use crate::render::styled::{RenderRequest, TemplateEngine};
use crate::templates::Template;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    Letter,
    A4,
    Tabloid,
}

impl PageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PageFormat::Letter => "letter",
            PageFormat::A4 => "a4",
            PageFormat::Tabloid => "tabloid",
        }
    }

    /// Page size in inches, width then height.
    pub fn size_in(self) -> (f64, f64) {
        match self {
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::A4 => (8.27, 11.69),
            PageFormat::Tabloid => (11.0, 17.0),
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letter" => Ok(PageFormat::Letter),
            "a4" => Ok(PageFormat::A4),
            "tabloid" => Ok(PageFormat::Tabloid),
            other => Err(ValidationError::Message(format!(
                "unknown page format '{other}' (expected letter, a4 or tabloid)"
            ))),
        }
    }
}

/// Body sent to the engine's export endpoint.
#[derive(Debug, Serialize)]
pub struct ExportRequest<'a> {
    #[serde(flatten)]
    pub render: RenderRequest<'a>,
    pub page_format: PageFormat,
    pub page_width_in: f64,
    pub page_height_in: f64,
    pub brand: Option<&'a BrandKit>,
}

impl<'a> ExportRequest<'a> {
    pub fn new(
        document: &'a Document,
        template: Template,
        page_format: PageFormat,
        brand: Option<&'a BrandKit>,
    ) -> Self {
        let (page_width_in, page_height_in) = page_format.size_in();
        Self {
            render: RenderRequest::new(document, template),
            page_format,
            page_width_in,
            page_height_in,
            brand,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub format: PageFormat,
    pub bytes: Vec<u8>,
}

/// `Launch Plan` exported as A4 becomes `Launch_Plan_a4.pdf`. Quotes and path
/// separators are dropped so the name is safe inside a header.
pub fn export_filename(title: &str, format: PageFormat) -> String {
    let stem: String = title
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '/' | '\\') && !c.is_control())
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    let stem = if stem.is_empty() { "onepager".to_string() } else { stem };
    format!("{stem}_{format}.pdf")
}

pub async fn export_document(
    engine: &dyn TemplateEngine,
    document: &Document,
    template: Template,
    format: PageFormat,
    brand: Option<&BrandKit>,
) -> Result<ExportedDocument, AppError> {
    let bytes = engine.render_pdf(document, template, format, brand).await?;
    if bytes.is_empty() {
        return Err(AppError::TemplateEngine("engine returned an empty PDF".to_string()));
    }
    tracing::info!(
        document_id = %document.id,
        %template,
        %format,
        size_kb = bytes.len() / 1024,
        "one-pager exported"
    );
    Ok(ExportedDocument {
        filename: export_filename(&document.title, format),
        format,
        bytes,
    })
}
