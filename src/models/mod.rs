pub mod comic;
pub mod scan_result;

pub use comic::{ComicIdentity, GradeContext, ScanCandidate, ValuationRequest, ValueEstimate, ValueRange};
pub use scan_result::EnrichedScanResult;
