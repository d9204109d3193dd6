//! Theme lifecycle state machine.
//!
//! A theme is created in `building`, moves to `active` when its build
//! succeeds and `failed` when it does not. Administrators may park an
//! active theme as `inactive`; re-uploading a failed or inactive theme
//! puts it back into `building`.

use crate::error::BuildError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeStatus {
    Active,
    Building,
    Failed,
    Inactive,
}

impl ThemeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeStatus::Active => "active",
            ThemeStatus::Building => "building",
            ThemeStatus::Failed => "failed",
            ThemeStatus::Inactive => "inactive",
        }
    }

    /// Only a successfully built theme can be previewed.
    pub fn can_preview(&self) -> bool {
        matches!(self, ThemeStatus::Active)
    }

    /// Why preview is unavailable, when it is.
    pub fn preview_blocked_reason(&self) -> Option<&'static str> {
        match self {
            ThemeStatus::Active => None,
            ThemeStatus::Building => Some("Theme is still building"),
            ThemeStatus::Failed => Some("Last build failed"),
            ThemeStatus::Inactive => Some("Theme is inactive"),
        }
    }

    pub fn is_terminal_build_state(&self) -> bool {
        matches!(self, ThemeStatus::Active | ThemeStatus::Failed)
    }
}

impl std::fmt::Display for ThemeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeStatus {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ThemeStatus::Active),
            "building" => Ok(ThemeStatus::Building),
            "failed" => Ok(ThemeStatus::Failed),
            "inactive" => Ok(ThemeStatus::Inactive),
            other => Err(BuildError::InvalidStatus(other.to_string())),
        }
    }
}

/// Transitions the platform allows. The build worker drives
/// `Building → Active | Failed`; everything else is an administrator
/// action (parking a theme, or re-uploading to rebuild it).
pub fn can_transition(from: ThemeStatus, to: ThemeStatus) -> bool {
    use ThemeStatus::*;
    match (from, to) {
        (Building, Active) | (Building, Failed) => true,
        (Active, Inactive) | (Inactive, Active) => true,
        (Failed, Building) | (Inactive, Building) | (Active, Building) => true,
        (a, b) if a == b => true,
        _ => false,
    }
}

static PROGRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("progress regex is valid"));

/// Extract the build progress percentage embedded in a theme description
/// (e.g. `"Step 3/4: Installing dependencies (75%)"`). Defaults to 0.
pub fn parse_progress(description: &str) -> u8 {
    PROGRESS_RE
        .captures(description)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .map(|p| p.min(100))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for s in ["active", "building", "failed", "inactive"] {
            let status: ThemeStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("enabled".parse::<ThemeStatus>().is_err());
    }

    #[test]
    fn preview_gate() {
        assert!(ThemeStatus::Active.can_preview());
        assert!(!ThemeStatus::Building.can_preview());
        assert!(!ThemeStatus::Failed.can_preview());
        assert!(!ThemeStatus::Inactive.can_preview());
        assert!(ThemeStatus::Active.preview_blocked_reason().is_none());
        assert_eq!(
            ThemeStatus::Building.preview_blocked_reason(),
            Some("Theme is still building")
        );
    }

    #[test]
    fn build_worker_transitions() {
        assert!(can_transition(ThemeStatus::Building, ThemeStatus::Active));
        assert!(can_transition(ThemeStatus::Building, ThemeStatus::Failed));
        assert!(!can_transition(ThemeStatus::Failed, ThemeStatus::Active));
        assert!(!can_transition(ThemeStatus::Inactive, ThemeStatus::Failed));
    }

    #[test]
    fn rebuild_transitions() {
        assert!(can_transition(ThemeStatus::Failed, ThemeStatus::Building));
        assert!(can_transition(ThemeStatus::Inactive, ThemeStatus::Building));
        assert!(can_transition(ThemeStatus::Active, ThemeStatus::Building));
    }

    #[test]
    fn progress_parsing() {
        assert_eq!(parse_progress("Step 1/4: Unzipping files... (25%)"), 25);
        assert_eq!(parse_progress("Compiling assets (90%)"), 90);
        assert_eq!(parse_progress("no percentage here"), 0);
        assert_eq!(parse_progress(""), 0);
        // First match wins
        assert_eq!(parse_progress("25% then 50%"), 25);
        // Absurd values clamp
        assert_eq!(parse_progress("overflow 250%"), 100);
    }
}
