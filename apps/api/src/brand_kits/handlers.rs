use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::content::{BrandKit, NonEmptyList, StoredBrandKit, TargetAudience};
use crate::errors::{AppError, AppJson};
use crate::layout::ColorScheme;
use crate::persistence::load_brand_kit;
use crate::state::AppState;

/// Partial update. Absent fields keep their stored value; an explicit `null`
/// brand voice clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBrandKitRequest {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default, with = "double_option")]
    pub brand_voice: Option<Option<String>>,
    #[serde(default)]
    pub target_audiences: Option<NonEmptyList<TargetAudience>>,
    #[serde(default)]
    pub color_palette: Option<ColorScheme>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}

impl UpdateBrandKitRequest {
    fn apply(self, kit: &mut BrandKit) {
        if let Some(name) = self.company_name {
            kit.company_name = name;
        }
        if let Some(voice) = self.brand_voice {
            kit.brand_voice = voice;
        }
        if let Some(audiences) = self.target_audiences {
            kit.target_audiences = audiences;
        }
        if let Some(palette) = self.color_palette {
            kit.color_palette = palette;
        }
    }
}

/// POST /api/v1/brand-kits
pub async fn handle_create(
    State(state): State<AppState>,
    AppJson(kit): AppJson<BrandKit>,
) -> Result<(StatusCode, Json<StoredBrandKit>), AppError> {
    kit.validate()?;
    let stored = StoredBrandKit::new(kit);
    state.brand_kits.insert(&stored).await?;
    info!(brand_kit_id = %stored.id, "brand kit created");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /api/v1/brand-kits
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredBrandKit>>, AppError> {
    Ok(Json(state.brand_kits.list().await?))
}

/// GET /api/v1/brand-kits/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredBrandKit>, AppError> {
    Ok(Json(load_brand_kit(&*state.brand_kits, id).await?))
}

/// PUT /api/v1/brand-kits/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateBrandKitRequest>,
) -> Result<Json<StoredBrandKit>, AppError> {
    let mut stored = load_brand_kit(&*state.brand_kits, id).await?;
    req.apply(&mut stored.kit);
    stored.kit.validate()?;
    stored.touch();
    state.brand_kits.save(&stored).await?;
    Ok(Json(stored))
}

/// DELETE /api/v1/brand-kits/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.brand_kits.delete(id).await? {
        return Err(AppError::NotFound(format!("Brand kit {id} not found")));
    }
    info!(brand_kit_id = %id, "brand kit deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/brand-kits/:id/audiences
pub async fn handle_add_audience(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(audience): AppJson<TargetAudience>,
) -> Result<(StatusCode, Json<StoredBrandKit>), AppError> {
    let mut stored = load_brand_kit(&*state.brand_kits, id).await?;
    stored.kit.add_audience(audience);
    stored.touch();
    state.brand_kits.save(&stored).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// DELETE /api/v1/brand-kits/:id/audiences/:index
///
/// Removing the last audience leaves one empty row, never an empty list.
pub async fn handle_remove_audience(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<StoredBrandKit>, AppError> {
    let mut stored = load_brand_kit(&*state.brand_kits, id).await?;
    stored.kit.remove_audience(index)?;
    stored.touch();
    state.brand_kits.save(&stored).await?;
    Ok(Json(stored))
}
