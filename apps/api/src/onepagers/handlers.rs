use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::content::{BlockPatch, ContentBlock, Document, DocumentContent};
use crate::editor::mutations;
use crate::errors::{AppError, AppJson, ValidationError};
use crate::generation::{apply_iteration, create_document, SessionInputs};
use crate::history::{self, SnapshotSummary, VersionSnapshot};
use crate::layout::{scale, LayoutParameters, RenderSurface, ResolvedSizes, ScalingTokens};
use crate::persistence::{load, load_brand_kit, DocumentSummary};
use crate::render::{export_document, fetch_styled, render_wireframe, PageFormat, PDF_CONTENT_TYPE};
use crate::state::AppState;
use crate::templates::{resolve, SlotAssignment, Template};

const PROMPT_MIN_CHARS: usize = 10;
const PROMPT_MAX_CHARS: usize = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Request / response bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateOnePagerRequest {
    pub title: String,
    #[serde(alias = "input_prompt")]
    pub prompt: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub brand: Option<crate::content::BrandKit>,
    /// Stored kit to generate against. Mutually exclusive with an inline `brand`.
    #[serde(default)]
    pub brand_kit_id: Option<Uuid>,
}

impl CreateOnePagerRequest {
    fn into_inputs(self) -> Result<SessionInputs, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Message("title must not be empty".to_string()));
        }
        let prompt_chars = self.prompt.trim().chars().count();
        if !(PROMPT_MIN_CHARS..=PROMPT_MAX_CHARS).contains(&prompt_chars) {
            return Err(ValidationError::Message(format!(
                "prompt must be between {PROMPT_MIN_CHARS} and {PROMPT_MAX_CHARS} characters"
            )));
        }
        if self.brand.is_some() && self.brand_kit_id.is_some() {
            return Err(ValidationError::Message(
                "give either brand or brand_kit_id, not both".to_string(),
            ));
        }
        Ok(SessionInputs {
            title: self.title,
            prompt: self.prompt.trim().to_string(),
            target_audience: self.target_audience.filter(|a| !a.trim().is_empty()),
            brand: self.brand,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IterateRequest {
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct IterateResponse {
    pub snapshot_version: u32,
    pub document: Document,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ordered_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyLayoutRequest {
    pub layout_params: LayoutParameters,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetTemplateRequest {
    pub template: Template,
}

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotCreated {
    pub version: u32,
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    #[serde(default)]
    pub template: Option<String>,
}

impl TemplateQuery {
    /// The requested template, else the document's own choice.
    fn resolve_for(&self, document: &Document) -> Result<Template, ValidationError> {
        match self.template.as_deref() {
            Some(raw) => raw.parse(),
            None => Ok(document.template),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SurfaceSizes {
    pub editor: ResolvedSizes,
    pub wireframe: ResolvedSizes,
    pub styled: ResolvedSizes,
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub tokens: ScalingTokens,
    pub css_variables: std::collections::BTreeMap<&'static str, String>,
    pub surfaces: SurfaceSizes,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Load, edit, save. A rejected edit returns before anything is written.
async fn mutate<F>(state: &AppState, id: Uuid, edit: F) -> Result<Document, AppError>
where
    F: FnOnce(&mut Document) -> Result<(), ValidationError>,
{
    let mut document = load(&*state.store, id).await?;
    edit(&mut document)?;
    state.store.save(&document).await?;
    Ok(document)
}

// ────────────────────────────────────────────────────────────────────────────
// Documents
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/onepagers
pub async fn handle_create(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateOnePagerRequest>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let brand_kit_id = req.brand_kit_id;
    let mut inputs = req.into_inputs()?;
    if let Some(kit_id) = brand_kit_id {
        inputs.brand = Some(load_brand_kit(&*state.brand_kits, kit_id).await?.kit);
    }
    let mut document = create_document(&*state.generator, &inputs).await;
    document.brand_kit_id = brand_kit_id;
    state.store.insert(&document).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/v1/onepagers
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentSummary>>, AppError> {
    Ok(Json(state.store.list().await?))
}

/// GET /api/v1/onepagers/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(load(&*state.store, id).await?))
}

/// DELETE /api/v1/onepagers/:id
///
/// The version history lives inside the record, so it goes with it.
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete(id).await? {
        return Err(AppError::NotFound(format!("One-pager {id} not found")));
    }
    info!(document_id = %id, "one-pager deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/onepagers/:id/iterate
pub async fn handle_iterate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<IterateRequest>,
) -> Result<Json<IterateResponse>, AppError> {
    let feedback = req.feedback.trim();
    if feedback.is_empty() {
        return Err(ValidationError::Message("feedback must not be empty".to_string()).into());
    }

    let _guard = state.iterations.claim(id)?;
    let mut document = load(&*state.store, id).await?;
    let content: DocumentContent = state.generator.iterate(&document, feedback).await?;

    let snapshot_version = apply_iteration(&mut document, feedback, content);
    state.store.save(&document).await?;
    Ok(Json(IterateResponse {
        snapshot_version,
        document,
    }))
}

/// PUT /api/v1/onepagers/:id/template
pub async fn handle_set_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SetTemplateRequest>,
) -> Result<Json<Document>, AppError> {
    let document = mutate(&state, id, |doc| {
        doc.template = req.template;
        doc.mark_edited();
        Ok(())
    })
    .await?;
    Ok(Json(document))
}

/// PUT /api/v1/onepagers/:id/layout
pub async fn handle_apply_layout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<ApplyLayoutRequest>,
) -> Result<Json<Document>, AppError> {
    let document = mutate(&state, id, |doc| {
        history::apply_layout(doc, req.layout_params, req.description.as_deref()).map(|_| ())
    })
    .await?;
    Ok(Json(document))
}

// ────────────────────────────────────────────────────────────────────────────
// Blocks
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/onepagers/:id/blocks
pub async fn handle_insert_block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(block): AppJson<ContentBlock>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let document = mutate(&state, id, |doc| mutations::insert(doc, block)).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// PATCH /api/v1/onepagers/:id/blocks/:block_id
pub async fn handle_update_block(
    State(state): State<AppState>,
    Path((id, block_id)): Path<(Uuid, String)>,
    AppJson(patch): AppJson<BlockPatch>,
) -> Result<Json<Document>, AppError> {
    let document = mutate(&state, id, |doc| mutations::update(doc, &block_id, &patch)).await?;
    Ok(Json(document))
}

/// DELETE /api/v1/onepagers/:id/blocks/:block_id
pub async fn handle_delete_block(
    State(state): State<AppState>,
    Path((id, block_id)): Path<(Uuid, String)>,
) -> Result<Json<Document>, AppError> {
    let document = mutate(&state, id, |doc| {
        mutations::delete(doc, &block_id).map(|_| ())
    })
    .await?;
    Ok(Json(document))
}

/// PUT /api/v1/onepagers/:id/blocks/order
pub async fn handle_reorder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<ReorderRequest>,
) -> Result<Json<Document>, AppError> {
    let mut document = load(&*state.store, id).await?;
    let revision = document.revision();
    mutations::reorder(&mut document, &req.ordered_ids)?;
    if document.revision() != revision {
        state.store.save(&document).await?;
    }
    Ok(Json(document))
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/onepagers/:id/slots?template=
pub async fn handle_slots(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<SlotAssignment>, AppError> {
    let document = load(&*state.store, id).await?;
    let template = query.resolve_for(&document)?;
    Ok(Json(resolve(&document.content, template)))
}

/// GET /api/v1/onepagers/:id/tokens
pub async fn handle_tokens(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TokensResponse>, AppError> {
    let document = load(&*state.store, id).await?;
    let tokens = scale(&document.layout_params);
    Ok(Json(TokensResponse {
        css_variables: tokens.css_variables(),
        surfaces: SurfaceSizes {
            editor: RenderSurface::Editor.resolve(&tokens),
            wireframe: RenderSurface::Wireframe.resolve(&tokens),
            styled: RenderSurface::Styled.resolve(&tokens),
        },
        tokens,
    }))
}

/// GET /api/v1/onepagers/:id/wireframe?template=
pub async fn handle_wireframe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TemplateQuery>,
) -> Result<Html<String>, AppError> {
    let document = load(&*state.store, id).await?;
    let template = query.resolve_for(&document)?;
    let assignment = resolve(&document.content, template);
    Ok(Html(render_wireframe(&document, &assignment)))
}

/// GET /api/v1/onepagers/:id/styled?template=
pub async fn handle_styled(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TemplateQuery>,
) -> Result<Html<String>, AppError> {
    let document = load(&*state.store, id).await?;
    let template = query.resolve_for(&document)?;
    let markup = fetch_styled(&*state.engine, &*state.markup_cache, &document, template).await?;
    Ok(Html(markup))
}

/// GET /api/v1/onepagers/:id/export/pdf?format=letter|a4|tabloid&template=
///
/// A dangling brand kit reference exports with the engine's default styling.
pub async fn handle_export_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let format: PageFormat = match query.format.as_deref() {
        Some(raw) => raw.parse()?,
        None => PageFormat::default(),
    };
    let document = load(&*state.store, id).await?;
    let template = TemplateQuery {
        template: query.template,
    }
    .resolve_for(&document)?;

    let brand = match document.brand_kit_id {
        Some(kit_id) => match state.brand_kits.get(kit_id).await? {
            Some(stored) => Some(stored.kit),
            None => {
                warn!(document_id = %id, brand_kit_id = %kit_id, "brand kit missing, exporting with defaults");
                None
            }
        },
        None => None,
    };

    let exported =
        export_document(&*state.engine, &document, template, format, brand.as_ref()).await?;
    let disposition = format!("attachment; filename=\"{}\"", exported.filename);
    Ok((
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        exported.bytes,
    )
        .into_response())
}

// ────────────────────────────────────────────────────────────────────────────
// Versions
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/onepagers/:id/versions
pub async fn handle_list_versions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SnapshotSummary>>, AppError> {
    let document = load(&*state.store, id).await?;
    Ok(Json(history::list_snapshots(&document)))
}

/// POST /api/v1/onepagers/:id/versions
pub async fn handle_create_snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<SnapshotRequest>>,
) -> Result<(StatusCode, Json<SnapshotCreated>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let mut document = load(&*state.store, id).await?;
    let version = history::create_snapshot(
        &mut document,
        Some(history::describe(req.description.as_deref())),
    );
    state.store.save(&document).await?;
    Ok((StatusCode::CREATED, Json(SnapshotCreated { version })))
}

/// GET /api/v1/onepagers/:id/versions/:v
pub async fn handle_get_version(
    State(state): State<AppState>,
    Path((id, version)): Path<(Uuid, u32)>,
) -> Result<Json<VersionSnapshot>, AppError> {
    let document = load(&*state.store, id).await?;
    history::get_snapshot(&document, version)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Version {version} of one-pager {id} not found")))
}

/// POST /api/v1/onepagers/:id/versions/:v/restore
pub async fn handle_restore(
    State(state): State<AppState>,
    Path((id, version)): Path<(Uuid, u32)>,
) -> Result<Json<Document>, AppError> {
    let document = mutate(&state, id, |doc| history::restore(doc, version)).await?;
    info!(document_id = %id, version, "one-pager restored");
    Ok(Json(document))
}
