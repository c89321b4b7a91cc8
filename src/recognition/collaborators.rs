//! Ports to the external services the scanning core consumes as black boxes.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ComicIdentity, ScanCandidate, ValuationRequest, ValueEstimate};
use crate::sensing::ImagePayload;

/// Cover recognition. `Ok(None)` means "not recognized", which is not an error.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: &ImagePayload) -> Result<Option<ScanCandidate>>;
}

/// Market valuation for an identified book.
#[async_trait]
pub trait Valuator: Send + Sync {
    async fn value(&self, request: &ValuationRequest) -> Result<ValueEstimate>;
}

/// Read-only view of the user's collection.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn owned_items(&self) -> Result<Vec<ComicIdentity>>;
}

/// In-memory collection, for hosts that already hold the list.
#[derive(Debug, Clone, Default)]
pub struct StaticCollection {
    items: Vec<ComicIdentity>,
}

impl StaticCollection {
    pub fn new(items: Vec<ComicIdentity>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl CollectionStore for StaticCollection {
    async fn owned_items(&self) -> Result<Vec<ComicIdentity>> {
        Ok(self.items.clone())
    }
}
