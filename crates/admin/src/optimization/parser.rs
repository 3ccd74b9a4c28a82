//! Free-text parser for optimization replies.
//!
//! A line opens a new field when it starts with a numbered marker (`1.` to
//! `5.`, or `1)`) followed by whitespace, optionally behind markdown bullets
//! or emphasis, or when it starts with a known field label followed by a
//! colon. A label decides the field when present; otherwise the marker
//! number does. Following lines are appended to the open field, joined with
//! single spaces, until the next header. Text before the first header is
//! ignored. A field that is opened again keeps its earlier text.
//!
//! Headers that could be ordinary content are only honoured when they are
//! unambiguous:
//! - a bare numbered marker opens a field not seen yet, or one numbered
//!   higher than the open field, so a numbered list inside a description
//!   stays in the description;
//! - a label without a marker only opens a field not seen yet, so prose such
//!   as "description includes: ..." stays where it is.

use std::sync::LazyLock;

use product_optimizer_core::Score;
use regex::Regex;
use serde::Serialize;

use super::FocusArea;

/// `1.` / `2)` markers, optionally behind bullets, quotes, headings or bold.
static MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[\s>#*_•\-]*([1-5])\s*[.)][*_]*(?:\s+|$)(.*)$").ok()
});

/// A field label followed by a colon, with optional emphasis around the label.
static LABEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[\s>#*_•\-]*(כותרת|תיאור|תגיות|הסבר|ציון|title|description|tags|explanation|score)[^:：\n]{0,40}?[:：]\s*(.*)$",
    )
    .ok()
});

static INTEGER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+").ok());

/// Fields extracted from an optimization reply.
///
/// Missing fields are empty; an empty string means "no change".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationResult {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub score: Score,
}

impl OptimizationResult {
    /// Whether nothing usable was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.tags.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Tags,
    Explanation,
    Score,
}

impl Field {
    const fn from_marker(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Title),
            2 => Some(Self::Description),
            3 => Some(Self::Tags),
            4 => Some(Self::Explanation),
            5 => Some(Self::Score),
            _ => None,
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "כותרת" | "title" => Some(Self::Title),
            "תיאור" | "description" => Some(Self::Description),
            "תגיות" | "tags" => Some(Self::Tags),
            "הסבר" | "explanation" => Some(Self::Explanation),
            "ציון" | "score" => Some(Self::Score),
            _ => None,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Title => 0,
            Self::Description => 1,
            Self::Tags => 2,
            Self::Explanation => 3,
            Self::Score => 4,
        }
    }
}

/// A header line: the field it opens, how it was recognized, and the text
/// after the marker and label.
struct Header<'a> {
    field: Field,
    numbered: bool,
    labeled: bool,
    rest: &'a str,
}

impl Header<'_> {
    /// Whether this line opens a field, given the fields seen so far and the
    /// open one.
    fn opens_field(&self, seen: &[bool; 5], active: Option<Field>) -> bool {
        let unseen = !seen[self.field.index()];
        match (self.numbered, self.labeled) {
            (true, true) => true,
            (true, false) => unseen || active.is_none_or(|open| self.field.index() > open.index()),
            (false, _) => unseen,
        }
    }
}

fn label_header(text: &str) -> Option<Header<'_>> {
    let caps = LABEL.as_ref()?.captures(text)?;
    let field = Field::from_label(caps.get(1)?.as_str())?;
    Some(Header {
        field,
        numbered: false,
        labeled: true,
        rest: caps.get(2).map_or("", |m| m.as_str()),
    })
}

fn classify(line: &str) -> Option<Header<'_>> {
    if let Some(caps) = MARKER.as_ref().and_then(|re| re.captures(line)) {
        let number = caps.get(1)?.as_str().parse::<u8>().ok()?;
        let rest = caps.get(2).map_or("", |m| m.as_str());
        if let Some(labeled) = label_header(rest) {
            return Some(Header {
                numbered: true,
                ..labeled
            });
        }
        return Some(Header {
            field: Field::from_marker(number)?,
            numbered: true,
            labeled: false,
            rest,
        });
    }
    label_header(line)
}

/// Trim whitespace and stray markdown emphasis.
fn clean(text: &str) -> &str {
    text.trim().trim_matches(|c: char| c == '*' || c == '_').trim()
}

/// Split tags on ASCII or fullwidth commas, trimming and dropping empties.
#[must_use]
pub fn split_tags(text: &str) -> Vec<String> {
    text.split([',', '，'])
        .map(clean)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Largest integer in `text`, clamped to a score; zero when there is none.
#[must_use]
pub fn extract_score(text: &str) -> Score {
    let Some(re) = INTEGER.as_ref() else {
        return Score::ZERO;
    };
    re.find_iter(text)
        .map(|m| m.as_str().parse::<i64>().unwrap_or(i64::MAX))
        .max()
        .map_or(Score::ZERO, Score::saturating_from)
}

/// Parse an optimization reply.
///
/// Only the requested fields are filled in; the score is always extracted.
/// Never fails: missing fields are empty strings, empty vectors or zero.
#[must_use]
pub fn parse_optimization_result(text: &str, requested: &[FocusArea]) -> OptimizationResult {
    let mut sections: [Option<String>; 5] = Default::default();
    let mut seen = [false; 5];
    let mut active: Option<Field> = None;

    for line in text.lines() {
        let header = classify(line).filter(|header| header.opens_field(&seen, active));

        let (field, piece, separator) = match header {
            Some(header) => {
                seen[header.field.index()] = true;
                active = Some(header.field);
                let separator = if header.field == Field::Tags { ", " } else { " " };
                (header.field, clean(header.rest), separator)
            }
            None => match active {
                Some(field) => (field, clean(line), " "),
                None => continue,
            },
        };

        let section = sections[field.index()].get_or_insert_with(String::new);
        if piece.is_empty() {
            continue;
        }
        if !section.is_empty() {
            section.push_str(separator);
        }
        section.push_str(piece);
    }

    let [title, description, tags, _explanation, score] = sections;
    let wants = |area: FocusArea| requested.contains(&area);

    OptimizationResult {
        title: if wants(FocusArea::Title) { title.unwrap_or_default() } else { String::new() },
        description: if wants(FocusArea::Description) {
            description.unwrap_or_default()
        } else {
            String::new()
        },
        tags: if wants(FocusArea::Tags) {
            tags.as_deref().map(split_tags).unwrap_or_default()
        } else {
            Vec::new()
        },
        score: score.as_deref().map_or(Score::ZERO, extract_score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[FocusArea] = &FocusArea::ALL;

    #[test]
    fn test_parses_labeled_markers() {
        let text = "1. כותרת משופרת: Blue Shirt\n2. תיאור משופר: Soft cotton\n3. תגיות משופרות: blue, shirt";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Blue Shirt");
        assert_eq!(result.description, "Soft cotton");
        assert_eq!(result.tags, vec!["blue", "shirt"]);
        assert_eq!(result.score, Score::ZERO);
    }

    #[test]
    fn test_bare_markers_select_by_number() {
        let text = "1. Blue Shirt\n2. Soft cotton tee\n3. blue, shirt\n4. Clearer title\n5. 87";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Blue Shirt");
        assert_eq!(result.description, "Soft cotton tee");
        assert_eq!(result.tags, vec!["blue", "shirt"]);
        assert_eq!(result.score.value(), 87);
    }

    #[test]
    fn test_continuation_lines_join_with_single_space() {
        let text = "2. תיאור משופר: Soft cotton\n   breathable fabric\n\n  machine washable  \n3. תגיות: a";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.description, "Soft cotton breathable fabric machine washable");
    }

    #[test]
    fn test_lines_before_first_marker_are_ignored() {
        let text = "Sure! Here is the improved product:\n\n1. כותרת: Blue Shirt";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Blue Shirt");
        assert!(result.description.is_empty());
    }

    #[test]
    fn test_label_wins_over_marker_number() {
        let text = "1. תגיות: red, green\n2. כותרת: Shirt";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.tags, vec!["red", "green"]);
        assert_eq!(result.title, "Shirt");
    }

    #[test]
    fn test_markdown_emphasis_and_bullets() {
        let text = "**1. כותרת משופרת:** Blue Shirt\n- 2) **תיאור משופר**: Soft cotton\n### 5. ציון: 90/100";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Blue Shirt");
        assert_eq!(result.description, "Soft cotton");
        assert_eq!(result.score.value(), 100);
    }

    #[test]
    fn test_numbered_list_inside_description_stays_in_description() {
        let text = "1. כותרת: Tent\n2. תיאור: Features:\n1. Waterproof\n2. Light\n3. תגיות: camping";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Tent");
        assert_eq!(result.description, "Features: 1. Waterproof 2. Light");
        assert_eq!(result.tags, vec!["camping"]);
    }

    #[test]
    fn test_label_without_marker_opens_field() {
        let text = "כותרת: Blue Shirt\nתיאור: Soft\nציון: 75";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Blue Shirt");
        assert_eq!(result.description, "Soft");
        assert_eq!(result.score.value(), 75);
    }

    #[test]
    fn test_fullwidth_colon_and_comma() {
        let text = "3. תגיות：כחול， חולצה ,, כותנה";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.tags, vec!["כחול", "חולצה", "כותנה"]);
    }

    #[test]
    fn test_score_takes_maximum_and_clamps() {
        assert_eq!(extract_score("ציון 60 מתוך 85").value(), 85);
        assert_eq!(extract_score("250").value(), 100);
        assert_eq!(extract_score("no digits").value(), 0);
        assert_eq!(extract_score("99999999999999999999999").value(), 100);
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let result = parse_optimization_result("", ALL);
        assert_eq!(result, OptimizationResult::default());
        assert!(result.is_empty());

        let result = parse_optimization_result("just some prose with 42 in it", ALL);
        assert_eq!(result, OptimizationResult::default());
    }

    #[test]
    fn test_unrequested_fields_are_empty() {
        let text = "1. כותרת: Blue Shirt\n2. תיאור: Soft cotton\n3. תגיות: blue\n5. ציון: 80";
        let result = parse_optimization_result(text, &[FocusArea::Description]);
        assert!(result.title.is_empty());
        assert_eq!(result.description, "Soft cotton");
        assert!(result.tags.is_empty());
        assert_eq!(result.score.value(), 80);
    }

    #[test]
    fn test_explanation_is_not_returned() {
        let text = "1. כותרת: A\n4. הסבר: shorter and clearer\n5. ציון: 70";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "A");
        assert!(!result.description.contains("shorter"));
        assert_eq!(result.score.value(), 70);
    }

    #[test]
    fn test_split_tags_trims_and_drops_empty() {
        assert_eq!(split_tags(" a , ,b,**c**,"), vec!["a", "b", "c"]);
        assert!(split_tags(" , ，").is_empty());
    }

    #[test]
    fn test_decimal_numbers_do_not_open_fields() {
        let text = "1. Phone\n2. Great phone with\n3.5 inch screen\n3. phone, mobile";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Phone");
        assert_eq!(result.description, "Great phone with 3.5 inch screen");
        assert_eq!(result.tags, vec!["phone", "mobile"]);

        let text = "1. כותרת: Phone\n2. תיאור: Great phone\n3.5 inch screen, 4.2 GHz\n3. תגיות: phone";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.description, "Great phone 3.5 inch screen, 4.2 GHz");
        assert_eq!(result.tags, vec!["phone"]);
    }

    #[test]
    fn test_bold_marker_opens_field() {
        let text = "**1.** Blue Shirt\n**2.** Soft cotton";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Blue Shirt");
        assert_eq!(result.description, "Soft cotton");
    }

    #[test]
    fn test_out_of_order_markers() {
        let text = "2. Soft cotton\n1. Blue Shirt\n3. blue, shirt\n5. 80";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Blue Shirt");
        assert_eq!(result.description, "Soft cotton");
        assert_eq!(result.tags, vec!["blue", "shirt"]);
        assert_eq!(result.score.value(), 80);
    }

    #[test]
    fn test_repeated_labeled_marker_keeps_both_parts() {
        let text = "1. כותרת: Blue\n2. תיאור: Soft\n3. תגיות: blue\n2. תיאור: Breathable\n3. תגיות: shirt";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.title, "Blue");
        assert_eq!(result.description, "Soft Breathable");
        assert_eq!(result.tags, vec!["blue", "shirt"]);
    }

    #[test]
    fn test_label_like_prose_stays_in_open_field() {
        let text = "1. כותרת: Tent\n2. תיאור: Big tent.\nתיאור המוצר כולל: עמוד ויתדות\n3. תגיות: camping";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.description, "Big tent. תיאור המוצר כולל: עמוד ויתדות");
        assert_eq!(result.tags, vec!["camping"]);
    }

    #[test]
    fn test_label_for_unseen_field_still_opens_it() {
        let text = "1. Tent\n2. Big tent\nתגיות: camping, outdoor";
        let result = parse_optimization_result(text, ALL);
        assert_eq!(result.description, "Big tent");
        assert_eq!(result.tags, vec!["camping", "outdoor"]);
    }
}
