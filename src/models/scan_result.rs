use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hunting::{IdentityKey, Ownership, Verdict};

use super::comic::{ScanCandidate, ValueEstimate};

/// Candidate plus valuation, ownership and verdict.
///
/// Stored in the result cache as-is; a re-fetch after expiry produces a new
/// result rather than mutating the old one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedScanResult {
    pub id: Uuid,
    pub identity_key: IdentityKey,
    pub candidate: ScanCandidate,
    #[serde(flatten)]
    pub value: ValueEstimate,
    pub verdict: Verdict,
    #[serde(flatten)]
    pub ownership: Ownership,
    pub scanned_at: DateTime<Utc>,
}

impl EnrichedScanResult {
    pub fn new(
        candidate: ScanCandidate,
        value: ValueEstimate,
        verdict: Verdict,
        ownership: Ownership,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_key: IdentityKey::from(&candidate.identity),
            candidate,
            value,
            verdict,
            ownership,
            scanned_at: Utc::now(),
        }
    }

    pub fn title(&self) -> &str {
        &self.candidate.identity.title
    }

    pub fn issue_number(&self) -> &str {
        &self.candidate.identity.issue_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComicIdentity;

    #[test]
    fn serializes_flat_for_the_host() {
        let result = EnrichedScanResult::new(
            ScanCandidate::new(ComicIdentity::new("Saga", "1")),
            ValueEstimate {
                recommended_value: Some(40.0),
                ..ValueEstimate::default()
            },
            Verdict::Consider,
            Ownership {
                owned: true,
                copy_count: 1,
            },
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["identityKey"], "saga|1||");
        assert_eq!(json["recommendedValue"], 40.0);
        assert_eq!(json["verdict"], "consider");
        assert_eq!(json["copyCount"], 1);
        assert_eq!(json["candidate"]["title"], "Saga");
    }
}
