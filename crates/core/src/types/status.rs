//! Status enums for product versions.

use serde::{Deserialize, Serialize};

/// Approval status of a stored product version.
///
/// Stored and serialized in English; the Hebrew labels shown in the UI are
/// accepted as aliases on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "optimizer.version_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Snapshot of the product before any optimization.
    #[serde(alias = "מקורית")]
    Original,
    /// AI-generated proposal awaiting approval.
    #[serde(alias = "מוצעת")]
    Proposed,
    /// Approved version pushed to the storefront.
    #[serde(alias = "נוכחית")]
    Current,
}

impl VersionStatus {
    /// Hebrew label shown to merchants.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Original => "מקורית",
            Self::Proposed => "מוצעת",
            Self::Current => "נוכחית",
        }
    }

    /// CSS classes for the status badge.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Original => "bg-blue-100 text-blue-700",
            Self::Proposed => "bg-gray-200 text-gray-700",
            Self::Current => "bg-green-100 text-green-700",
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Proposed => write!(f, "proposed"),
            Self::Current => write!(f, "current"),
        }
    }
}

impl std::str::FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "original" | "מקורית" => Ok(Self::Original),
            "proposed" | "מוצעת" => Ok(Self::Proposed),
            "current" | "נוכחית" => Ok(Self::Current),
            other => Err(format!("invalid version status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_status_accepts_hebrew_labels() {
        let status: VersionStatus = serde_json::from_str("\"נוכחית\"").expect("deserialize");
        assert_eq!(status, VersionStatus::Current);
        let status: VersionStatus = serde_json::from_str("\"proposed\"").expect("deserialize");
        assert_eq!(status, VersionStatus::Proposed);
    }

    #[test]
    fn test_version_status_serializes_english() {
        let json = serde_json::to_string(&VersionStatus::Original).expect("serialize");
        assert_eq!(json, "\"original\"");
    }

    #[test]
    fn test_version_status_from_str() {
        assert_eq!("מוצעת".parse::<VersionStatus>(), Ok(VersionStatus::Proposed));
        assert_eq!("current".parse::<VersionStatus>(), Ok(VersionStatus::Current));
        assert!("approved".parse::<VersionStatus>().is_err());
    }
}
