//! Product optimization: prompt generation and reply parsing.
//!
//! The prompt asks the model to answer in a fixed numbered layout
//! (`1.` title, `2.` description, `3.` tags, `4.` explanation, `5.` score).
//! The parser reads that layout back out of free text and never fails:
//! anything it cannot find comes back empty.

pub mod parser;
pub mod prompt;

use serde::{Deserialize, Serialize};

pub use parser::{OptimizationResult, parse_optimization_result};
pub use prompt::{
    DetailLevel, OptimizationSettings, ProductFacts, PromptError, Tone, generate_optimization_prompt,
};

/// A product field the merchant asked to improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Title,
    Description,
    Tags,
}

impl FocusArea {
    /// All focus areas in prompt order.
    pub const ALL: [Self; 3] = [Self::Title, Self::Description, Self::Tags];

    /// Hebrew label shown in the optimization dialog.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Title => "כותרת המוצר",
            Self::Description => "תיאור המוצר",
            Self::Tags => "תגיות המוצר",
        }
    }

    /// Form value.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Tags => "tags",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_area_serde() {
        let areas: Vec<FocusArea> =
            serde_json::from_str(r#"["title","tags"]"#).expect("deserialize");
        assert_eq!(areas, vec![FocusArea::Title, FocusArea::Tags]);
        assert_eq!(
            serde_json::to_string(&FocusArea::Description).expect("serialize"),
            "\"description\""
        );
    }
}
