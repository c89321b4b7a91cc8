use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::models::{EnrichedScanResult, ScanCandidate};
use crate::recognition::{
    CollectionStore, Enricher, Enrichment, RecognitionOrchestrator, Recognizer, ScanOutcome,
    ScanStage, Valuator,
};
use crate::sensing::{Fingerprint, Frame};
use crate::settings::ScanSettings;
use crate::stats::{SessionSnapshot, SessionStats};

use super::cache::ResultCache;
use super::dedup::ScanDeduplicator;
use super::events::HuntEvent;
use super::identity::IdentityKey;
use super::ownership::resolve_ownership_by_key;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const EVENT_CAPACITY: usize = 32;

struct PipelineState {
    cache: ResultCache,
    dedup: ScanDeduplicator,
    stats: SessionStats,
}

struct PipelineInner {
    orchestrator: RecognitionOrchestrator,
    collection: Arc<dyn CollectionStore>,
    settings: ScanSettings,
    state: Mutex<PipelineState>,
    events: broadcast::Sender<HuntEvent>,
}

/// Everything between a stabilized frame and a result on screen: triage,
/// the orchestrator run, and bookkeeping of what came back.
///
/// Cheap to clone; clones share the same session state.
#[derive(Clone)]
pub struct ScanPipeline {
    inner: Arc<PipelineInner>,
}

impl ScanPipeline {
    pub fn new(
        settings: ScanSettings,
        recognizer: Arc<dyn Recognizer>,
        valuator: Arc<dyn Valuator>,
        collection: Arc<dyn CollectionStore>,
    ) -> Self {
        let state = PipelineState {
            cache: ResultCache::new(settings.cache_ttl()),
            dedup: ScanDeduplicator::new(settings.memory_window(), settings.fingerprint_tolerance),
            stats: SessionStats::new(settings.history_limit),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(PipelineInner {
                orchestrator: RecognitionOrchestrator::new(recognizer, valuator, settings.clone()),
                collection,
                settings,
                state: Mutex::new(state),
                events,
            }),
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.inner.settings
    }

    pub fn stage(&self) -> ScanStage {
        self.inner.orchestrator.stage()
    }

    pub fn subscribe_stage(&self) -> watch::Receiver<ScanStage> {
        self.inner.orchestrator.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HuntEvent> {
        self.inner.events.subscribe()
    }

    /// No scan in flight, a new frame would be accepted.
    pub fn is_ready(&self) -> bool {
        self.stage().is_settled()
    }

    /// Scan one stabilized frame. Returns `Busy` without side effects while
    /// another scan holds the slot.
    pub async fn process_frame(&self, frame: &Frame, cancel: &CancellationToken) -> ScanOutcome {
        let orchestrator = &self.inner.orchestrator;
        let Some(ticket) = orchestrator.try_claim() else {
            log_debug!("scan already in flight, dropping frame");
            return ScanOutcome::Busy;
        };
        if cancel.is_cancelled() {
            orchestrator.settle(ticket, ScanStage::Idle);
            return ScanOutcome::Cancelled;
        }

        let fingerprint = Fingerprint::of(frame, self.inner.settings.fingerprint_mode);
        let now = Instant::now();

        let mut state = self.inner.state.lock().await;
        if cancel.is_cancelled() {
            drop(state);
            orchestrator.settle(ticket, ScanStage::Idle);
            return ScanOutcome::Cancelled;
        }
        if let Some(key) = state.dedup.recent_identity(&fingerprint, now) {
            if let Some(result) = state.cache.get(&key, now).cloned() {
                state.stats.record_result(&result, true);
                drop(state);
                log_info!("same frame as {key}, reusing cached result");
                orchestrator.settle(ticket, ScanStage::Complete);
                self.emit(HuntEvent::ScanCompleted {
                    result: result.clone(),
                    cached: true,
                });
                return ScanOutcome::Cached(result);
            }
        }
        if state.dedup.was_recently_processed(&fingerprint, now) {
            state.stats.record_duplicate();
            drop(state);
            log_debug!("frame matches a recent scan, skipping");
            orchestrator.settle(ticket, ScanStage::Idle);
            self.emit(HuntEvent::DuplicateSkipped);
            return ScanOutcome::Duplicate;
        }
        drop(state);

        let enricher = PipelineEnricher { inner: &self.inner };
        let outcome = orchestrator.run(ticket, frame, &enricher, cancel).await;
        self.apply(outcome, fingerprint, cancel).await
    }

    async fn apply(
        &self,
        outcome: ScanOutcome,
        fingerprint: Fingerprint,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        let now = Instant::now();
        let mut state = self.inner.state.lock().await;
        // checked under the lock so a concurrent reset cannot interleave
        if cancel.is_cancelled() {
            log_debug!("session ended mid-scan, discarding outcome");
            return ScanOutcome::Cancelled;
        }

        let event = match &outcome {
            ScanOutcome::Completed(result) => {
                state
                    .cache
                    .set(result.identity_key.clone(), result.clone(), now);
                state
                    .dedup
                    .mark_identified(fingerprint, result.identity_key.clone(), now);
                state.stats.record_result(result, false);
                Some(HuntEvent::ScanCompleted {
                    result: result.clone(),
                    cached: false,
                })
            }
            ScanOutcome::Cached(result) => {
                state
                    .dedup
                    .mark_identified(fingerprint, result.identity_key.clone(), now);
                state.stats.record_result(result, true);
                Some(HuntEvent::ScanCompleted {
                    result: result.clone(),
                    cached: true,
                })
            }
            ScanOutcome::NoMatch => {
                state.dedup.mark_processed(fingerprint, now);
                state.stats.record_no_match();
                Some(HuntEvent::NoMatch)
            }
            ScanOutcome::Failed(error) => {
                state.stats.record_error();
                Some(HuntEvent::ScanFailed {
                    error: error.clone(),
                })
            }
            ScanOutcome::Duplicate | ScanOutcome::Busy | ScanOutcome::Cancelled => None,
        };
        drop(state);

        if let Some(event) = event {
            self.emit(event);
        }
        outcome
    }

    /// Fresh cached result for a book, if any.
    pub async fn cached_result(&self, key: &IdentityKey) -> Option<EnrichedScanResult> {
        let state = self.inner.state.lock().await;
        state.cache.get(key, Instant::now()).cloned()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().await.stats.snapshot()
    }

    /// Forget everything the session learned and return the stage to idle.
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        state.cache.clear();
        state.dedup.clear();
        state.stats.reset();
        drop(state);
        self.inner.orchestrator.reset();
    }

    fn emit(&self, event: HuntEvent) {
        // nobody listening is fine
        let _ = self.inner.events.send(event);
    }
}

struct PipelineEnricher<'a> {
    inner: &'a PipelineInner,
}

#[async_trait]
impl<'a> Enricher for PipelineEnricher<'a> {
    async fn enrich(&self, key: &IdentityKey, candidate: &ScanCandidate) -> Enrichment {
        {
            let mut state = self.inner.state.lock().await;
            let now = Instant::now();
            state.cache.purge_expired(now);
            if let Some(result) = state.cache.get(key, now) {
                return Enrichment::Cached(result.clone());
            }
        }

        let owned = match self.inner.collection.owned_items().await {
            Ok(items) => items,
            Err(err) => {
                log_warn!(
                    "collection lookup failed for {} #{}, assuming not owned: {err:#}",
                    candidate.identity.title,
                    candidate.identity.issue_number
                );
                Vec::new()
            }
        };
        Enrichment::Fresh(resolve_ownership_by_key(key, &owned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunting::Verdict;
    use crate::models::{ComicIdentity, ValuationRequest, ValueEstimate};
    use crate::recognition::StaticCollection;
    use crate::sensing::ImagePayload;
    use anyhow::{anyhow, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Echo {
        candidate: Option<ScanCandidate>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Recognizer for Echo {
        async fn recognize(&self, _image: &ImagePayload) -> Result<Option<ScanCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.candidate.clone())
        }
    }

    struct Stalled;

    #[async_trait]
    impl Recognizer for Stalled {
        async fn recognize(&self, _image: &ImagePayload) -> Result<Option<ScanCandidate>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
    }

    struct Flat(f64);

    #[async_trait]
    impl Valuator for Flat {
        async fn value(&self, _request: &ValuationRequest) -> Result<ValueEstimate> {
            Ok(ValueEstimate {
                recommended_value: Some(self.0),
                ..ValueEstimate::default()
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl CollectionStore for Broken {
        async fn owned_items(&self) -> Result<Vec<ComicIdentity>> {
            Err(anyhow!("collection offline"))
        }
    }

    fn pipeline(
        candidate: Option<ScanCandidate>,
        collection: Arc<dyn CollectionStore>,
    ) -> (ScanPipeline, Arc<Echo>) {
        let recognizer = Arc::new(Echo {
            candidate,
            calls: AtomicUsize::new(0),
        });
        let pipeline = ScanPipeline::new(
            ScanSettings::default(),
            recognizer.clone(),
            Arc::new(Flat(75.0)),
            collection,
        );
        (pipeline, recognizer)
    }

    fn saga() -> ScanCandidate {
        ScanCandidate::new(ComicIdentity::new("Saga", "1").with_publisher("Image"))
    }

    #[tokio::test]
    async fn completed_scan_is_cached_and_counted() {
        let owned = vec![ComicIdentity::new("saga", "#001").with_publisher("IMAGE")];
        let (pipeline, _) = pipeline(Some(saga()), Arc::new(StaticCollection::new(owned)));
        let mut events = pipeline.subscribe();
        let frame = Frame::filled(16, 16, [10, 200, 10, 255]).unwrap();

        let outcome = pipeline.process_frame(&frame, &CancellationToken::new()).await;
        let result = outcome.result().unwrap().clone();
        assert_eq!(result.verdict, Verdict::Get);
        assert!(result.ownership.owned);

        assert!(pipeline.cached_result(&result.identity_key).await.is_some());
        assert_eq!(pipeline.snapshot().await.scan_count, 1);
        assert_eq!(
            events.recv().await.unwrap(),
            HuntEvent::ScanCompleted {
                result,
                cached: false
            }
        );
    }

    #[tokio::test]
    async fn unrecognized_frame_is_skipped_next_time() {
        let (pipeline, recognizer) = pipeline(None, Arc::new(StaticCollection::default()));
        let frame = Frame::filled(16, 16, [90, 90, 90, 255]).unwrap();
        let cancel = CancellationToken::new();

        assert_eq!(pipeline.process_frame(&frame, &cancel).await, ScanOutcome::NoMatch);
        assert_eq!(pipeline.process_frame(&frame, &cancel).await, ScanOutcome::Duplicate);
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);

        let snapshot = pipeline.snapshot().await;
        assert_eq!(snapshot.no_match_count, 1);
        assert_eq!(snapshot.duplicate_count, 1);
        assert!(pipeline.is_ready());
    }

    #[tokio::test]
    async fn collection_failure_means_not_owned() {
        let (pipeline, _) = pipeline(Some(saga()), Arc::new(Broken));
        let frame = Frame::filled(16, 16, [1, 2, 3, 255]).unwrap();

        let outcome = pipeline.process_frame(&frame, &CancellationToken::new()).await;
        let result = outcome.result().unwrap();
        assert!(!result.ownership.owned);
        assert_eq!(result.ownership.copy_count, 0);
    }

    #[tokio::test]
    async fn cancelled_scan_leaves_no_trace() {
        let (pipeline, recognizer) = pipeline(Some(saga()), Arc::new(StaticCollection::default()));
        let frame = Frame::filled(16, 16, [1, 2, 3, 255]).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(pipeline.process_frame(&frame, &cancel).await, ScanOutcome::Cancelled);
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.snapshot().await, SessionSnapshot::default());
        assert_eq!(pipeline.stage(), ScanStage::Idle);
    }

    #[tokio::test]
    async fn reset_forgets_cache_and_history() {
        let (pipeline, recognizer) = pipeline(Some(saga()), Arc::new(StaticCollection::default()));
        let frame = Frame::filled(16, 16, [40, 40, 200, 255]).unwrap();
        let cancel = CancellationToken::new();

        pipeline.process_frame(&frame, &cancel).await;
        pipeline.reset().await;

        assert_eq!(pipeline.snapshot().await.scan_count, 0);
        assert!(matches!(
            pipeline.process_frame(&frame, &cancel).await,
            ScanOutcome::Completed(_)
        ));
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abandoned_scan_frees_the_slot() {
        let pipeline = ScanPipeline::new(
            ScanSettings::default(),
            Arc::new(Stalled),
            Arc::new(Flat(75.0)),
            Arc::new(StaticCollection::default()),
        );
        let frame = Frame::filled(16, 16, [7, 7, 7, 255]).unwrap();
        let cancel = CancellationToken::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            pipeline.process_frame(&frame, &cancel),
        )
        .await;
        assert!(abandoned.is_err());

        assert!(pipeline.is_ready());
        assert_eq!(pipeline.stage(), ScanStage::Idle);
        assert_eq!(pipeline.snapshot().await, SessionSnapshot::default());
    }
}
