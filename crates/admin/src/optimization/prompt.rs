//! Hebrew optimization prompt.
//!
//! The answer template at the end of the prompt uses the same numbered
//! markers and labels that [`super::parser`] looks for.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::FocusArea;

const MAX_AUDIENCE_CHARS: usize = 200;
const MAX_KEYWORDS_CHARS: usize = 500;
const MAX_DESCRIPTION_CHARS: usize = 4000;

/// Invalid optimization settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Select at least one field to improve")]
    NoFocusAreas,

    #[error("{field} is too long (maximum {max} characters)")]
    TooLong { field: &'static str, max: usize },
}

/// Writing tone requested for the rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Marketing,
    Technical,
}

impl Tone {
    pub const ALL: [Self; 4] = [Self::Professional, Self::Friendly, Self::Marketing, Self::Technical];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Professional => "מקצועי ועניני",
            Self::Friendly => "ידידותי ונגיש",
            Self::Marketing => "שיווקי ומושך",
            Self::Technical => "טכני ומפורט",
        }
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Marketing => "marketing",
            Self::Technical => "technical",
        }
    }
}

/// How long the rewritten description should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Short,
    #[default]
    Medium,
    Detailed,
}

impl DetailLevel {
    pub const ALL: [Self; 3] = [Self::Short, Self::Medium, Self::Detailed];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Short => "קצר וחד",
            Self::Medium => "בינוני ומאוזן",
            Self::Detailed => "מפורט ועשיר",
        }
    }

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Detailed => "detailed",
        }
    }

    /// Length guidance for the description.
    const fn description_guidance(self) -> &'static str {
        match self {
            Self::Short => "2-3 משפטים",
            Self::Medium => "פסקה אחת עד שתיים",
            Self::Detailed => "שלוש פסקאות לפחות, כולל יתרונות ושימושים",
        }
    }
}

/// Settings chosen in the optimization dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationSettings {
    pub tone: Tone,
    pub target_audience: String,
    pub detail_level: DetailLevel,
    /// Comma-separated keywords to work into the text.
    pub additional_keywords: String,
    pub focus_areas: Vec<FocusArea>,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            target_audience: String::new(),
            detail_level: DetailLevel::default(),
            additional_keywords: String::new(),
            focus_areas: FocusArea::ALL.to_vec(),
        }
    }
}

impl OptimizationSettings {
    /// Check the settings before spending a token on them.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::NoFocusAreas` when nothing is selected, or
    /// `PromptError::TooLong` for oversized free-text fields.
    pub fn validate(&self) -> Result<(), PromptError> {
        if self.focus_areas.is_empty() {
            return Err(PromptError::NoFocusAreas);
        }
        if self.target_audience.chars().count() > MAX_AUDIENCE_CHARS {
            return Err(PromptError::TooLong {
                field: "target_audience",
                max: MAX_AUDIENCE_CHARS,
            });
        }
        if self.additional_keywords.chars().count() > MAX_KEYWORDS_CHARS {
            return Err(PromptError::TooLong {
                field: "additional_keywords",
                max: MAX_KEYWORDS_CHARS,
            });
        }
        Ok(())
    }

    /// Whether a field was selected.
    #[must_use]
    pub fn wants(&self, area: FocusArea) -> bool {
        self.focus_areas.contains(&area)
    }

    /// Additional keywords, trimmed, without empties.
    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        self.additional_keywords
            .split([',', '，'])
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// What the prompt tells the model about the product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFacts {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub price: Option<String>,
}

fn truncate_chars(text: &str, max: usize) -> &str {
    text.char_indices().nth(max).map_or(text, |(i, _)| text.split_at(i).0)
}

fn or_missing(text: &str) -> &str {
    if text.trim().is_empty() { "(אין)" } else { text.trim() }
}

/// Build the optimization prompt for a product.
///
/// # Errors
///
/// Returns a `PromptError` if the settings fail [`OptimizationSettings::validate`].
pub fn generate_optimization_prompt(
    product: &ProductFacts,
    settings: &OptimizationSettings,
) -> Result<String, PromptError> {
    settings.validate()?;

    let mut prompt = String::with_capacity(2048);

    prompt.push_str(
        "אתה מומחה לאופטימיזציה של דפי מוצר בחנויות אונליין ולקידום אורגני (SEO).\n\
         שפר את פרטי המוצר הבא כך שיהיו ברורים, משכנעים וידידותיים למנועי חיפוש.\n\n",
    );

    prompt.push_str("פרטי המוצר:\n");
    let _ = writeln!(prompt, "- כותרת נוכחית: {}", or_missing(&product.title));
    let _ = writeln!(
        prompt,
        "- תיאור נוכחי: {}",
        or_missing(truncate_chars(&product.description, MAX_DESCRIPTION_CHARS))
    );
    let _ = writeln!(prompt, "- תגיות נוכחיות: {}", or_missing(&product.tags.join(", ")));
    if let Some(category) = product.category.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(prompt, "- קטגוריה: {}", category.trim());
    }
    if let Some(price) = product.price.as_deref() {
        let _ = writeln!(prompt, "- מחיר: {price}");
    }

    prompt.push_str("\nהגדרות:\n");
    let _ = writeln!(prompt, "- גוון קול: {}", settings.tone.label());
    let _ = writeln!(
        prompt,
        "- רמת פירוט: {} ({})",
        settings.detail_level.label(),
        settings.detail_level.description_guidance()
    );
    let audience = settings.target_audience.trim();
    if !audience.is_empty() {
        let _ = writeln!(prompt, "- קהל יעד: {audience}");
    }
    let keywords = settings.keywords();
    if !keywords.is_empty() {
        let _ = writeln!(prompt, "- מילות מפתח לשילוב: {}", keywords.join(", "));
    }
    let areas: Vec<&str> = FocusArea::ALL
        .into_iter()
        .filter(|area| settings.wants(*area))
        .map(FocusArea::label)
        .collect();
    let _ = writeln!(prompt, "- מה לשפר: {}", areas.join(", "));

    prompt.push_str(
        "\nכתוב בעברית. אל תוסיף טקסט לפני או אחרי התשובה.\n\
         ענה בדיוק במבנה הבא, כל סעיף בשורה חדשה:\n\n",
    );
    if settings.wants(FocusArea::Title) {
        prompt.push_str("1. כותרת משופרת: [כותרת חדשה, עד 70 תווים]\n");
    }
    if settings.wants(FocusArea::Description) {
        prompt.push_str("2. תיאור משופר: [תיאור חדש]\n");
    }
    if settings.wants(FocusArea::Tags) {
        prompt.push_str("3. תגיות משופרות: [תגית, תגית, תגית]\n");
    }
    prompt.push_str("4. הסבר: [מה שופר ולמה, במשפט או שניים]\n");
    prompt.push_str("5. ציון: [מספר בין 0 ל-100 שמעריך את איכות הגרסה המשופרת]\n");

    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::parse_optimization_result;

    fn product() -> ProductFacts {
        ProductFacts {
            title: "Blue Shirt".to_string(),
            description: "A shirt".to_string(),
            tags: vec!["blue".to_string(), "shirt".to_string()],
            category: Some("Apparel".to_string()),
            price: Some("₪79.00".to_string()),
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = OptimizationSettings::default();
        assert_eq!(settings.tone, Tone::Professional);
        assert_eq!(settings.detail_level, DetailLevel::Medium);
        assert!(settings.target_audience.is_empty());
        assert_eq!(settings.focus_areas, FocusArea::ALL.to_vec());
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let settings: OptimizationSettings =
            serde_json::from_str(r#"{"tone":"marketing","focus_areas":["tags"]}"#).expect("parse");
        assert_eq!(settings.tone, Tone::Marketing);
        assert_eq!(settings.detail_level, DetailLevel::Medium);
        assert_eq!(settings.focus_areas, vec![FocusArea::Tags]);
    }

    #[test]
    fn test_validate_requires_focus_area() {
        let settings = OptimizationSettings {
            focus_areas: Vec::new(),
            ..OptimizationSettings::default()
        };
        assert_eq!(settings.validate(), Err(PromptError::NoFocusAreas));
        assert!(generate_optimization_prompt(&product(), &settings).is_err());
    }

    #[test]
    fn test_validate_rejects_long_audience() {
        let settings = OptimizationSettings {
            target_audience: "א".repeat(MAX_AUDIENCE_CHARS + 1),
            ..OptimizationSettings::default()
        };
        assert!(matches!(settings.validate(), Err(PromptError::TooLong { .. })));
    }

    #[test]
    fn test_prompt_includes_product_and_settings() {
        let settings = OptimizationSettings {
            tone: Tone::Friendly,
            target_audience: "משפחות".to_string(),
            detail_level: DetailLevel::Short,
            additional_keywords: "כותנה, , קיץ".to_string(),
            focus_areas: FocusArea::ALL.to_vec(),
        };
        let prompt = generate_optimization_prompt(&product(), &settings).expect("prompt");

        assert!(prompt.contains("Blue Shirt"));
        assert!(prompt.contains("blue, shirt"));
        assert!(prompt.contains("Apparel"));
        assert!(prompt.contains("₪79.00"));
        assert!(prompt.contains(Tone::Friendly.label()));
        assert!(prompt.contains(DetailLevel::Short.label()));
        assert!(prompt.contains("משפחות"));
        assert!(prompt.contains("כותנה, קיץ"));
    }

    #[test]
    fn test_template_lists_only_requested_fields() {
        let settings = OptimizationSettings {
            focus_areas: vec![FocusArea::Description],
            ..OptimizationSettings::default()
        };
        let prompt = generate_optimization_prompt(&product(), &settings).expect("prompt");

        assert!(!prompt.contains("1. כותרת משופרת"));
        assert!(prompt.contains("2. תיאור משופר"));
        assert!(!prompt.contains("3. תגיות משופרות"));
        assert!(prompt.contains("4. הסבר"));
        assert!(prompt.contains("5. ציון"));
    }

    #[test]
    fn test_template_markers_are_parseable() {
        let prompt =
            generate_optimization_prompt(&product(), &OptimizationSettings::default()).expect("prompt");
        let template = prompt
            .split_once("ענה בדיוק במבנה הבא")
            .map(|(_, rest)| rest)
            .expect("template section");

        let result = parse_optimization_result(template, &FocusArea::ALL);
        assert!(result.title.contains("כותרת חדשה"));
        assert_eq!(result.description, "[תיאור חדש]");
        assert_eq!(result.tags, vec!["[תגית", "תגית", "תגית]"]);
        assert_eq!(result.score.value(), 100);
    }

    #[test]
    fn test_long_description_is_truncated() {
        let mut facts = product();
        facts.description = "x".repeat(MAX_DESCRIPTION_CHARS + 50);
        let prompt =
            generate_optimization_prompt(&facts, &OptimizationSettings::default()).expect("prompt");
        assert!(!prompt.contains(&"x".repeat(MAX_DESCRIPTION_CHARS + 1)));
    }

    #[test]
    fn test_empty_product_fields_marked_missing() {
        let prompt = generate_optimization_prompt(&ProductFacts::default(), &OptimizationSettings::default())
            .expect("prompt");
        assert!(prompt.contains("כותרת נוכחית: (אין)"));
    }
}
