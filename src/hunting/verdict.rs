use serde::{Deserialize, Serialize};

use super::identity::normalize_issue_number;

/// Acquisition recommendation for a scanned book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Get,
    Consider,
    Pass,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Get => "get",
            Verdict::Consider => "consider",
            Verdict::Pass => "pass",
        }
    }
}

/// Value cut-offs for the verdict rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerdictThresholds {
    pub get_at: f64,
    pub consider_at: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            get_at: 50.0,
            consider_at: 15.0,
        }
    }
}

/// Verdict with the default 50 / 15 cut-offs.
pub fn verdict(value: Option<f64>, is_key_issue: bool, issue_number: &str) -> Verdict {
    verdict_with(&VerdictThresholds::default(), value, is_key_issue, issue_number)
}

/// Rules, first match wins:
/// 1. `Get` when value >= `get_at` or the book is a key issue.
/// 2. `Consider` when value >= `consider_at` or the issue number is 1.
/// 3. `Pass` otherwise.
///
/// A missing or NaN value counts as zero.
pub fn verdict_with(
    thresholds: &VerdictThresholds,
    value: Option<f64>,
    is_key_issue: bool,
    issue_number: &str,
) -> Verdict {
    let value = value.filter(|v| !v.is_nan()).unwrap_or(0.0);

    if value >= thresholds.get_at || is_key_issue {
        Verdict::Get
    } else if value >= thresholds.consider_at || normalize_issue_number(issue_number) == "1" {
        Verdict::Consider
    } else {
        Verdict::Pass
    }
}
