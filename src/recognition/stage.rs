use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Progress stepper for one scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ScanStage {
    Idle,
    Detecting,
    Identifying,
    Enriching,
    Valuing,
    Complete,
    Error,
}

impl Default for ScanStage {
    fn default() -> Self {
        ScanStage::Idle
    }
}

impl ScanStage {
    /// No scan is in flight.
    pub fn is_settled(&self) -> bool {
        matches!(self, ScanStage::Idle | ScanStage::Complete | ScanStage::Error)
    }

    /// Position in the stepper, `None` outside the linear flow.
    pub fn step(&self) -> Option<u8> {
        match self {
            ScanStage::Detecting => Some(1),
            ScanStage::Identifying => Some(2),
            ScanStage::Enriching => Some(3),
            ScanStage::Valuing => Some(4),
            ScanStage::Complete => Some(5),
            ScanStage::Idle | ScanStage::Error => None,
        }
    }
}

/// The single in-flight slot. The generation moves on every reset, which
/// locks out tickets handed out before it.
#[derive(Debug)]
pub(super) struct StageSlot {
    stage_tx: watch::Sender<ScanStage>,
    generation: AtomicU64,
}

impl StageSlot {
    pub(super) fn new() -> Arc<Self> {
        let (stage_tx, _) = watch::channel(ScanStage::Idle);
        Arc::new(Self {
            stage_tx,
            generation: AtomicU64::new(0),
        })
    }

    pub(super) fn stage(&self) -> ScanStage {
        *self.stage_tx.borrow()
    }

    pub(super) fn subscribe(&self) -> watch::Receiver<ScanStage> {
        self.stage_tx.subscribe()
    }

    pub(super) fn claim(self: &Arc<Self>) -> Option<ScanTicket> {
        let mut generation = 0;
        let claimed = self.stage_tx.send_if_modified(|stage| {
            if !stage.is_settled() {
                return false;
            }
            generation = self.generation.load(Ordering::SeqCst);
            *stage = ScanStage::Detecting;
            true
        });
        claimed.then(|| ScanTicket {
            slot: Arc::clone(self),
            generation,
        })
    }

    /// Invalidate every outstanding ticket and go back to idle.
    pub(super) fn reset(&self) {
        // bump first: a stale write racing this reset either lands before the
        // Idle below or sees the new generation and is dropped
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.stage_tx.send_replace(ScanStage::Idle);
    }

    fn write(&self, generation: u64, next: ScanStage, only_if_busy: bool) -> bool {
        self.stage_tx.send_if_modified(|stage| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            if only_if_busy && stage.is_settled() {
                return false;
            }
            if *stage == next {
                return false;
            }
            *stage = next;
            true
        })
    }
}

/// Proof of holding the in-flight scan slot.
///
/// Only [`RecognitionOrchestrator::try_claim`](super::RecognitionOrchestrator::try_claim)
/// hands these out. Dropping a ticket mid-scan gives the slot back as idle;
/// a ticket from before a reset can no longer touch the stage.
#[derive(Debug)]
#[must_use = "dropping the ticket releases the scan slot"]
pub struct ScanTicket {
    slot: Arc<StageSlot>,
    generation: u64,
}

impl ScanTicket {
    /// Still belongs to the current session.
    pub fn is_current(&self) -> bool {
        self.slot.generation.load(Ordering::SeqCst) == self.generation
    }

    pub(super) fn set_stage(&self, stage: ScanStage) {
        self.slot.write(self.generation, stage, false);
    }
}

impl Drop for ScanTicket {
    fn drop(&mut self) {
        self.slot.write(self.generation, ScanStage::Idle, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_terminal_stages_are_settled() {
        assert!(ScanStage::Idle.is_settled());
        assert!(ScanStage::Complete.is_settled());
        assert!(ScanStage::Error.is_settled());
        assert!(!ScanStage::Detecting.is_settled());
        assert!(!ScanStage::Valuing.is_settled());
    }

    #[test]
    fn steps_follow_pipeline_order() {
        let steps: Vec<_> = [
            ScanStage::Detecting,
            ScanStage::Identifying,
            ScanStage::Enriching,
            ScanStage::Valuing,
            ScanStage::Complete,
        ]
        .iter()
        .filter_map(ScanStage::step)
        .collect();
        assert_eq!(steps, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn dropping_a_busy_ticket_frees_the_slot() {
        let slot = StageSlot::new();
        let ticket = slot.claim().unwrap();
        ticket.set_stage(ScanStage::Valuing);
        assert!(slot.claim().is_none());

        drop(ticket);
        assert_eq!(slot.stage(), ScanStage::Idle);
        assert!(slot.claim().is_some());
    }

    #[test]
    fn dropping_a_settled_ticket_keeps_its_stage() {
        let slot = StageSlot::new();
        let ticket = slot.claim().unwrap();
        ticket.set_stage(ScanStage::Complete);
        drop(ticket);
        assert_eq!(slot.stage(), ScanStage::Complete);
    }

    #[test]
    fn tickets_from_before_a_reset_are_ignored() {
        let slot = StageSlot::new();
        let stale = slot.claim().unwrap();
        stale.set_stage(ScanStage::Valuing);

        slot.reset();
        assert!(!stale.is_current());
        assert_eq!(slot.stage(), ScanStage::Idle);

        let fresh = slot.claim().unwrap();
        fresh.set_stage(ScanStage::Identifying);

        stale.set_stage(ScanStage::Idle);
        drop(stale);
        assert_eq!(slot.stage(), ScanStage::Identifying);
        assert!(slot.claim().is_none());

        drop(fresh);
        assert_eq!(slot.stage(), ScanStage::Idle);
    }
}
