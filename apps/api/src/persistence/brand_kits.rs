use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::content::{BrandKit, NonEmptyList, StoredBrandKit};
use crate::errors::AppError;
use crate::layout::ColorScheme;

/// Stored brand kits. Deleting a kit leaves documents that referenced it
/// intact; they simply lose the reference.
#[async_trait]
pub trait BrandKitStore: Send + Sync {
    async fn insert(&self, kit: &StoredBrandKit) -> Result<(), AppError>;
    async fn save(&self, kit: &StoredBrandKit) -> Result<(), AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<StoredBrandKit>, AppError>;
    async fn list(&self) -> Result<Vec<StoredBrandKit>, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

pub async fn load_brand_kit(store: &dyn BrandKitStore, id: Uuid) -> Result<StoredBrandKit, AppError> {
    store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Brand kit {id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryBrandKitStore {
    kits: RwLock<HashMap<Uuid, StoredBrandKit>>,
}

impl MemoryBrandKitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BrandKitStore for MemoryBrandKitStore {
    async fn insert(&self, kit: &StoredBrandKit) -> Result<(), AppError> {
        let mut kits = self.kits.write().await;
        if kits.contains_key(&kit.id) {
            return Err(AppError::Conflict(format!("Brand kit {} already exists", kit.id)));
        }
        kits.insert(kit.id, kit.clone());
        Ok(())
    }

    async fn save(&self, kit: &StoredBrandKit) -> Result<(), AppError> {
        self.kits.write().await.insert(kit.id, kit.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredBrandKit>, AppError> {
        Ok(self.kits.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<StoredBrandKit>, AppError> {
        let mut out: Vec<StoredBrandKit> = self.kits.read().await.values().cloned().collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.kits.write().await.remove(&id).is_some())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct BrandKitRow {
    pub id: Uuid,
    pub company_name: String,
    pub brand_voice: Option<String>,
    pub target_audiences: Value,
    pub color_palette: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BrandKitRow {
    pub fn into_stored(self) -> Result<StoredBrandKit, AppError> {
        let target_audiences: NonEmptyList<_> = serde_json::from_value(self.target_audiences)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt audiences for {}: {e}", self.id)))?;
        let color_palette: ColorScheme = serde_json::from_value(self.color_palette)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt palette for {}: {e}", self.id)))?;
        Ok(StoredBrandKit {
            id: self.id,
            kit: BrandKit {
                company_name: self.company_name,
                brand_voice: self.brand_voice,
                target_audiences,
                color_palette,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgBrandKitStore {
    pool: PgPool,
}

impl PgBrandKitStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert(&self, kit: &StoredBrandKit, replace: bool) -> Result<(), AppError> {
        let audiences = serde_json::to_value(&kit.kit.target_audiences)
            .map_err(|e| AppError::Internal(e.into()))?;
        let palette = serde_json::to_value(&kit.kit.color_palette)
            .map_err(|e| AppError::Internal(e.into()))?;
        let conflict = if replace {
            r#"ON CONFLICT (id) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                brand_voice = EXCLUDED.brand_voice,
                target_audiences = EXCLUDED.target_audiences,
                color_palette = EXCLUDED.color_palette,
                updated_at = EXCLUDED.updated_at"#
        } else {
            ""
        };
        let sql = format!(
            r#"
            INSERT INTO brand_kits
                (id, company_name, brand_voice, target_audiences, color_palette,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            {conflict}
            "#
        );
        sqlx::query(&sql)
            .bind(kit.id)
            .bind(&kit.kit.company_name)
            .bind(&kit.kit.brand_voice)
            .bind(&audiences)
            .bind(&palette)
            .bind(kit.created_at)
            .bind(kit.updated_at)
            .execute(&self.pool)
            .await?;
        debug!(brand_kit_id = %kit.id, "brand kit saved");
        Ok(())
    }
}

#[async_trait]
impl BrandKitStore for PgBrandKitStore {
    async fn insert(&self, kit: &StoredBrandKit) -> Result<(), AppError> {
        self.upsert(kit, false).await
    }

    async fn save(&self, kit: &StoredBrandKit) -> Result<(), AppError> {
        self.upsert(kit, true).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredBrandKit>, AppError> {
        let row: Option<BrandKitRow> = sqlx::query_as("SELECT * FROM brand_kits WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BrandKitRow::into_stored).transpose()
    }

    async fn list(&self) -> Result<Vec<StoredBrandKit>, AppError> {
        let rows: Vec<BrandKitRow> =
            sqlx::query_as("SELECT * FROM brand_kits ORDER BY updated_at DESC")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(BrandKitRow::into_stored).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM brand_kits WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::content::TargetAudience;

    fn make_kit(name: &str) -> StoredBrandKit {
        StoredBrandKit::new(BrandKit {
            company_name: name.to_string(),
            brand_voice: Some("Plain".to_string()),
            target_audiences: NonEmptyList::new(vec![TargetAudience {
                name: "CTO".to_string(),
                description: "Technical buyers".to_string(),
            }]),
            color_palette: ColorScheme::default(),
        })
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryBrandKitStore::new();
        let kit = make_kit("Acme");
        store.insert(&kit).await.unwrap();
        assert!(matches!(store.insert(&kit).await, Err(AppError::Conflict(_))));
        assert_eq!(load_brand_kit(&store, kit.id).await.unwrap(), kit);

        assert!(store.delete(kit.id).await.unwrap());
        assert!(matches!(
            load_brand_kit(&store, kit.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_row_with_empty_audiences_gets_placeholder() {
        let row = BrandKitRow {
            id: Uuid::new_v4(),
            company_name: "Acme".to_string(),
            brand_voice: None,
            target_audiences: json!([]),
            color_palette: json!({"primary": "#000000"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let stored = row.into_stored().unwrap();
        assert_eq!(stored.kit.target_audiences.len(), 1);
        assert_eq!(stored.kit.color_palette.primary, "#000000");
        assert_eq!(stored.kit.color_palette.background, "#FFFFFF");
    }
}
