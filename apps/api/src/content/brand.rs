//! Brand kit context fed to generation, including the "at least one" collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;
use crate::layout::ColorScheme;

/// A list that can never become empty.
///
/// Removing the last entry swaps in one `T::default()` placeholder instead, so the
/// editing surface always has a row to type into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<T>", into = "Vec<T>")]
pub struct NonEmptyList<T: Clone + Default> {
    items: Vec<T>,
}

impl<T: Clone + Default> NonEmptyList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self::from(items)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Removes and returns the entry at `index`. Out-of-range indices are a no-op.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        if self.items.is_empty() {
            self.items.push(T::default());
        }
        Some(removed)
    }
}

impl<T: Clone + Default> Default for NonEmptyList<T> {
    fn default() -> Self {
        Self {
            items: vec![T::default()],
        }
    }
}

impl<T: Clone + Default> From<Vec<T>> for NonEmptyList<T> {
    fn from(items: Vec<T>) -> Self {
        if items.is_empty() {
            Self::default()
        } else {
            Self { items }
        }
    }
}

impl<T: Clone + Default> From<NonEmptyList<T>> for Vec<T> {
    fn from(list: NonEmptyList<T>) -> Self {
        list.items
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetAudience {
    pub name: String,
    pub description: String,
}

impl TargetAudience {
    pub fn is_placeholder(&self) -> bool {
        self.name.trim().is_empty() && self.description.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandKit {
    pub company_name: String,
    #[serde(default)]
    pub brand_voice: Option<String>,
    #[serde(default)]
    pub target_audiences: NonEmptyList<TargetAudience>,
    #[serde(default)]
    pub color_palette: ColorScheme,
}

impl BrandKit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.company_name.trim().is_empty() {
            return Err(ValidationError::Message(
                "company_name must not be empty".to_string(),
            ));
        }
        self.color_palette.validate()
    }

    pub fn add_audience(&mut self, audience: TargetAudience) {
        // Fill the placeholder row left behind by removing the last entry.
        let only_placeholder =
            matches!(self.target_audiences.items(), [only] if only.is_placeholder());
        if only_placeholder {
            if let Some(slot) = self.target_audiences.get_mut(0) {
                *slot = audience;
                return;
            }
        }
        self.target_audiences.push(audience);
    }

    /// Removes one audience. Removing the last leaves an empty placeholder row.
    pub fn remove_audience(&mut self, index: usize) -> Result<TargetAudience, ValidationError> {
        self.target_audiences.remove(index).ok_or_else(|| {
            ValidationError::Message(format!("target audience {index} does not exist"))
        })
    }

    /// Audience lines worth sending to the generator (placeholders skipped).
    pub fn audience_summary(&self) -> Option<String> {
        let lines: Vec<String> = self
            .target_audiences
            .items()
            .iter()
            .filter(|a| !a.is_placeholder())
            .map(|a| format!("{}: {}", a.name, a.description))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("; "))
        }
    }
}

/// A brand kit as persisted, addressable by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBrandKit {
    pub id: Uuid,
    #[serde(flatten)]
    pub kit: BrandKit,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredBrandKit {
    pub fn new(kit: BrandKit) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kit,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}
