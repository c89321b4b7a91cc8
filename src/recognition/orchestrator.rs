use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{ScanError, ScanErrorKind};
use crate::hunting::{verdict_with, IdentityKey, Ownership};
use crate::models::{EnrichedScanResult, ScanCandidate, ValuationRequest, ValueEstimate};
use crate::sensing::{Frame, ImagePayload};
use crate::settings::ScanSettings;

use super::collaborators::{Recognizer, Valuator};
use super::stage::{ScanStage, ScanTicket, StageSlot};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// What enrichment found for an identified candidate.
#[derive(Debug, Clone)]
pub enum Enrichment {
    /// A fresh cached result exists; valuation is skipped.
    Cached(EnrichedScanResult),
    Fresh(Ownership),
}

/// Hook run at the enriching stage: cache probe and ownership lookup.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, key: &IdentityKey, candidate: &ScanCandidate) -> Enrichment;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(EnrichedScanResult),
    Cached(EnrichedScanResult),
    NoMatch,
    Duplicate,
    Busy,
    Cancelled,
    Failed(ScanError),
}

impl ScanOutcome {
    pub fn result(&self) -> Option<&EnrichedScanResult> {
        match self {
            ScanOutcome::Completed(result) | ScanOutcome::Cached(result) => Some(result),
            _ => None,
        }
    }
}

pub struct RecognitionOrchestrator {
    recognizer: Arc<dyn Recognizer>,
    valuator: Arc<dyn Valuator>,
    settings: ScanSettings,
    slot: Arc<StageSlot>,
}

impl RecognitionOrchestrator {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        valuator: Arc<dyn Valuator>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            recognizer,
            valuator,
            settings,
            slot: StageSlot::new(),
        }
    }

    pub fn stage(&self) -> ScanStage {
        self.slot.stage()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanStage> {
        self.slot.subscribe()
    }

    /// Take the in-flight slot. `None` while another scan is running.
    pub fn try_claim(&self) -> Option<ScanTicket> {
        self.slot.claim()
    }

    /// Give the slot back without running recognition.
    pub fn settle(&self, ticket: ScanTicket, stage: ScanStage) {
        let stage = if stage.is_settled() { stage } else { ScanStage::Idle };
        ticket.set_stage(stage);
    }

    /// Back to idle when a session is torn down. Scans still running on an
    /// older ticket can no longer move the stage.
    pub fn reset(&self) {
        self.slot.reset();
    }

    /// Detect, identify, enrich, value. Never panics or propagates: every
    /// failure comes back as `ScanOutcome::Failed`.
    pub async fn run(
        &self,
        ticket: ScanTicket,
        frame: &Frame,
        enricher: &dyn Enricher,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        let scan_start = Instant::now();

        let payload = match self.encode(frame).await {
            Ok(payload) => payload,
            Err(err) => return self.fail(&ticket, ScanError::categorize(&err)),
        };
        log_debug!(
            "encoded {}x{} frame to {} bytes in {}ms",
            payload.width,
            payload.height,
            payload.bytes.len(),
            scan_start.elapsed().as_millis()
        );
        if cancel.is_cancelled() {
            return self.cancelled(&ticket);
        }

        ticket.set_stage(ScanStage::Identifying);
        let recognize_start = Instant::now();
        let recognized = unless_cancelled(
            cancel,
            timeout(
                self.settings.recognition_timeout(),
                self.recognizer.recognize(&payload),
            ),
        )
        .await;
        let candidate = match recognized {
            None => return self.cancelled(&ticket),
            Some(Err(_)) => {
                let error = ScanError::new(ScanErrorKind::Timeout).with_detail(format!(
                    "recognition exceeded {}ms",
                    self.settings.recognition_timeout_ms
                ));
                return self.fail(&ticket, error);
            }
            Some(Ok(Err(err))) => return self.fail(&ticket, ScanError::categorize(&err)),
            Some(Ok(Ok(Some(candidate)))) if candidate.is_recognized() => candidate,
            Some(Ok(Ok(_))) => {
                log_info!(
                    "no match after {}ms",
                    recognize_start.elapsed().as_millis()
                );
                ticket.set_stage(ScanStage::Idle);
                return ScanOutcome::NoMatch;
            }
        };
        if cancel.is_cancelled() {
            return self.cancelled(&ticket);
        }

        ticket.set_stage(ScanStage::Enriching);
        let key = IdentityKey::from(&candidate.identity);
        let ownership = match enricher.enrich(&key, &candidate).await {
            Enrichment::Cached(result) => {
                if cancel.is_cancelled() {
                    return self.cancelled(&ticket);
                }
                log_info!("cache hit for {key}, skipping valuation");
                ticket.set_stage(ScanStage::Complete);
                return ScanOutcome::Cached(result);
            }
            Enrichment::Fresh(ownership) => ownership,
        };
        if cancel.is_cancelled() {
            return self.cancelled(&ticket);
        }

        ticket.set_stage(ScanStage::Valuing);
        let Some(value) = unless_cancelled(cancel, self.appraise(&candidate)).await else {
            return self.cancelled(&ticket);
        };

        let verdict = verdict_with(
            &self.settings.verdict_thresholds,
            value.recommended_value,
            candidate.is_key_issue,
            &candidate.identity.issue_number,
        );
        let result = EnrichedScanResult::new(candidate, value, verdict, ownership);
        log_info!(
            "scanned {} #{} -> {} (value {:?}, owned {}) in {}ms",
            result.title(),
            result.issue_number(),
            verdict.as_str(),
            result.value.recommended_value,
            result.ownership.copy_count,
            scan_start.elapsed().as_millis()
        );

        ticket.set_stage(ScanStage::Complete);
        ScanOutcome::Completed(result)
    }

    async fn encode(&self, frame: &Frame) -> Result<ImagePayload> {
        let frame = frame.clone();
        let quality = self.settings.jpeg_quality;
        tokio::task::spawn_blocking(move || ImagePayload::jpeg(&frame, quality))
            .await
            .context("frame encode worker join failed")?
    }

    /// Valuation failures are not fatal: the result just carries no value.
    async fn appraise(&self, candidate: &ScanCandidate) -> ValueEstimate {
        let request = ValuationRequest::for_candidate(candidate, self.settings.grade_context);
        match timeout(self.settings.valuation_timeout(), self.valuator.value(&request)).await {
            Ok(Ok(estimate)) => estimate,
            Ok(Err(err)) => {
                log_warn!(
                    "valuation failed for {} #{}: {err:#}",
                    request.title,
                    request.issue_number
                );
                ValueEstimate::default()
            }
            Err(_) => {
                log_warn!(
                    "valuation timeout (> {}ms) for {} #{}",
                    self.settings.valuation_timeout_ms,
                    request.title,
                    request.issue_number
                );
                ValueEstimate::default()
            }
        }
    }

    fn fail(&self, ticket: &ScanTicket, error: ScanError) -> ScanOutcome {
        log_warn!(
            "scan failed ({:?}): {}",
            error.kind,
            error.detail.as_deref().unwrap_or(error.message.as_str())
        );
        ticket.set_stage(ScanStage::Error);
        ScanOutcome::Failed(error)
    }

    fn cancelled(&self, ticket: &ScanTicket) -> ScanOutcome {
        log_debug!(
            "scan cancelled at stage {:?} (current session: {})",
            self.stage(),
            ticket.is_current()
        );
        ticket.set_stage(ScanStage::Idle);
        ScanOutcome::Cancelled
    }
}

/// `None` once `cancel` fires, even if `work` is still pending.
async fn unless_cancelled<F: Future>(cancel: &CancellationToken, work: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = work => Some(output),
    }
}
