//! Enumeration types shared by the engine and the dashboard.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Risk classification attached to a geofence area.
///
/// Ordered from least to most severe so consumers can filter with
/// comparisons (`risk >= RiskLevel::Medium`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum RiskLevel {
    /// Advisory area; informational notifications only.
    Low,
    /// Elevated risk; the subject should be warned.
    #[default]
    Medium,
    /// Restricted area; entering requires immediate attention.
    High,
}

impl RiskLevel {
    /// Return the lowercase wire name of this level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl core::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum CrossingKind {
    /// The subject moved from outside to inside the area.
    Entered,
    /// The subject moved from inside to outside the area, or the area
    /// disappeared from the registry while the subject was inside it.
    Exited,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_wire_names() {
        let json = serde_json::to_string(&RiskLevel::High).ok();
        assert_eq!(json.as_deref(), Some("\"high\""));
        let parsed: Result<RiskLevel, _> = serde_json::from_str("\"low\"");
        assert_eq!(parsed.ok(), Some(RiskLevel::Low));
    }

    #[test]
    fn risk_levels_are_ordered_by_severity() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn crossing_kind_wire_names() {
        let json = serde_json::to_string(&CrossingKind::Exited).ok();
        assert_eq!(json.as_deref(), Some("\"exited\""));
    }
}
