//! Comic identity and valuation models exchanged with the external collaborators.

use serde::{Deserialize, Serialize};

/// Identity fields shared by recognition candidates and owned collection items.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComicIdentity {
    pub title: String,
    pub issue_number: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

impl ComicIdentity {
    pub fn new(title: impl Into<String>, issue_number: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            issue_number: issue_number.into(),
            publisher: None,
            variant: None,
        }
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

/// What the recognition service returned for a stabilized frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanCandidate {
    #[serde(flatten)]
    pub identity: ComicIdentity,
    #[serde(default)]
    pub is_key_issue: bool,
    #[serde(default)]
    pub key_issue_reason: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

impl ScanCandidate {
    pub fn new(identity: ComicIdentity) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    pub fn key_issue(mut self, reason: impl Into<String>) -> Self {
        self.is_key_issue = true;
        self.key_issue_reason = Some(reason.into());
        self
    }

    /// A candidate without a title carries no usable identity.
    pub fn is_recognized(&self) -> bool {
        !self.identity.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValueRange {
    pub low: f64,
    pub high: f64,
}

/// Valuation response. Every field is optional and absence is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueEstimate {
    #[serde(default)]
    pub recommended_value: Option<f64>,
    #[serde(default)]
    pub value_range: Option<ValueRange>,
    /// 0-100
    #[serde(default)]
    pub confidence_score: Option<u8>,
}

impl ValueEstimate {
    pub fn is_empty(&self) -> bool {
        self.recommended_value.is_none()
            && self.value_range.is_none()
            && self.confidence_score.is_none()
    }
}

/// Condition assumptions forwarded to the valuation service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradeContext {
    pub assumed_grade: f32,
    pub slabbed: bool,
}

impl Default for GradeContext {
    fn default() -> Self {
        Self {
            assumed_grade: 9.0,
            slabbed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequest {
    pub title: String,
    pub issue_number: String,
    pub publisher: Option<String>,
    pub grade_context: GradeContext,
}

impl ValuationRequest {
    pub fn for_candidate(candidate: &ScanCandidate, grade_context: GradeContext) -> Self {
        Self {
            title: candidate.identity.title.clone(),
            issue_number: candidate.identity.issue_number.clone(),
            publisher: candidate.identity.publisher.clone(),
            grade_context,
        }
    }
}
