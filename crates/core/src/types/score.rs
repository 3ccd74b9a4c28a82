//! Optimization scores and their display bands.

use serde::{Deserialize, Serialize};

/// Highest possible score.
pub const MAX_SCORE: u8 = 100;

/// An optimization score in `0..=100`.
///
/// Construction clamps out-of-range values, so every `Score` is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    /// The zero score, used when no score could be extracted.
    pub const ZERO: Self = Self(0);

    /// Create a score, clamping anything above 100.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > MAX_SCORE {
            Self(MAX_SCORE)
        } else {
            Self(value)
        }
    }

    /// Create a score from a wide integer, clamping into `0..=100`.
    #[must_use]
    pub fn saturating_from(value: i64) -> Self {
        let clamped = value.clamp(0, i64::from(MAX_SCORE));
        Self(u8::try_from(clamped).unwrap_or(MAX_SCORE))
    }

    /// Underlying value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Display band for this score.
    #[must_use]
    pub const fn band(self) -> ScoreBand {
        ScoreBand::from_score(self)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Ok(Self::saturating_from(value))
    }
}

impl From<Score> for i16 {
    fn from(score: Score) -> Self {
        Self::from(score.0)
    }
}

/// Quality band derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    /// Score of 80 or more.
    Improved,
    /// Score from 60 to 79.
    Fair,
    /// Score below 60.
    NeedsImprovement,
}

impl ScoreBand {
    /// Classify a score.
    #[must_use]
    pub const fn from_score(score: Score) -> Self {
        match score.0 {
            80.. => Self::Improved,
            60..=79 => Self::Fair,
            _ => Self::NeedsImprovement,
        }
    }

    /// Hebrew label shown to merchants.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Improved => "שופר",
            Self::Fair => "סביר",
            Self::NeedsImprovement => "דורש שיפור",
        }
    }

    /// CSS classes for the status pill.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Improved => "bg-green-100 text-green-700",
            Self::Fair => "bg-yellow-100 text-yellow-700",
            Self::NeedsImprovement => "bg-red-100 text-red-600",
        }
    }

    /// CSS class for the score bar fill.
    #[must_use]
    pub const fn bar_class(self) -> &'static str {
        match self {
            Self::Improved => "bg-green-500",
            Self::Fair => "bg-amber-500",
            Self::NeedsImprovement => "bg-red-500",
        }
    }
}
