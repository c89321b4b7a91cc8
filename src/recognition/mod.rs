pub mod collaborators;
pub mod orchestrator;
pub mod stage;

pub use collaborators::{CollectionStore, Recognizer, StaticCollection, Valuator};
pub use orchestrator::{Enricher, Enrichment, RecognitionOrchestrator, ScanOutcome};
pub use stage::{ScanStage, ScanTicket};
