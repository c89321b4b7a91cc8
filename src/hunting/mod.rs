pub mod cache;
pub mod controller;
pub mod dedup;
pub mod events;
pub mod identity;
pub mod ownership;
pub mod pipeline;
pub mod state;
pub mod verdict;

pub use cache::ResultCache;
pub use controller::HuntingSession;
pub use dedup::ScanDeduplicator;
pub use events::HuntEvent;
pub use identity::IdentityKey;
pub use ownership::{resolve_ownership, resolve_ownership_by_key, Ownership};
pub use pipeline::ScanPipeline;
pub use state::{HuntState, HuntingSnapshot};
pub use verdict::{verdict, verdict_with, Verdict, VerdictThresholds};
