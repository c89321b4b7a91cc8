use serde::Serialize;

use crate::error::ScanError;
use crate::models::EnrichedScanResult;

/// Notifications pushed to whoever renders the session.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HuntEvent {
    ScanCompleted {
        result: EnrichedScanResult,
        cached: bool,
    },
    NoMatch,
    DuplicateSkipped,
    ScanFailed {
        error: ScanError,
    },
}
