// Template identifiers, their declarative rule tables, and the one generic resolver
// that consumes them. The wireframe renderer and the template-engine client both go
// through `resolver::resolve`, so every surface sees the same slot assignment.

pub mod display;
pub mod resolver;
pub mod rules;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

pub use resolver::{resolve, AssignmentMemo, BlockView, RegionAssignment, RegionFill, SlotAssignment};
pub use rules::{rules_for, DisplayBudget, Pick, RegionRule, RegionSpec, StaticCard};

/// The four fixed visual topologies a document can be rendered into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Minimalist,
    Bold,
    Business,
    Product,
}

impl Template {
    pub const ALL: [Template; 4] = [
        Template::Minimalist,
        Template::Bold,
        Template::Business,
        Template::Product,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Minimalist => "minimalist",
            Template::Bold => "bold",
            Template::Business => "business",
            Template::Product => "product",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimalist" => Ok(Template::Minimalist),
            "bold" => Ok(Template::Bold),
            "business" => Ok(Template::Business),
            "product" => Ok(Template::Product),
            other => Err(ValidationError::UnknownTemplate(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_templates() {
        for template in Template::ALL {
            assert_eq!(template.as_str().parse::<Template>().unwrap(), template);
        }
        assert_eq!(" Bold ".parse::<Template>().unwrap(), Template::Bold);
    }

    #[test]
    fn test_parse_unknown_template() {
        assert_eq!(
            "brutalist".parse::<Template>(),
            Err(ValidationError::UnknownTemplate("brutalist".to_string()))
        );
    }

    #[test]
    fn test_default_is_minimalist() {
        assert_eq!(Template::default(), Template::Minimalist);
    }
}
