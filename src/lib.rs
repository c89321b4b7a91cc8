//! Hunting Mode: continuous comic cover scanning.
//!
//! A [`HuntingSession`] samples a [`VideoSource`], waits for the scene to hold
//! still, and runs each stabilized frame through recognition, ownership and
//! valuation, ending in a Get / Consider / Pass [`Verdict`].

pub mod error;
pub mod hunting;
pub mod models;
pub mod recognition;
pub mod sensing;
pub mod settings;
pub mod stats;
pub mod utils;

pub use error::{CollaboratorError, ScanError, ScanErrorKind};
pub use hunting::{
    HuntEvent, HuntState, HuntingSession, HuntingSnapshot, IdentityKey, Ownership, ScanPipeline,
    Verdict, VerdictThresholds,
};
pub use models::{
    ComicIdentity, EnrichedScanResult, GradeContext, ScanCandidate, ValuationRequest,
    ValueEstimate, ValueRange,
};
pub use recognition::{
    CollectionStore, Recognizer, ScanOutcome, ScanStage, StaticCollection, Valuator,
};
pub use sensing::{Frame, ImagePayload, VideoSource};
pub use settings::{ScanSettings, SettingsStore};
pub use stats::SessionSnapshot;
pub use utils::init_logging;
