use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::hunting::ScanPipeline;
use crate::recognition::ScanOutcome;

use super::sampler::FrameSampler;
use super::stability::StabilityDetector;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Sample, check stability, hand stabilized frames to the pipeline.
///
/// Runs until `cancel_token` fires, then releases the video source.
pub async fn sampling_loop(
    session_id: String,
    mut sampler: FrameSampler,
    mut detector: StabilityDetector,
    pipeline: ScanPipeline,
    progress_tx: Arc<watch::Sender<f32>>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(pipeline.settings().sample_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                ticks += 1;
                let frame = match sampler.sample() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(err) => {
                        log_warn!("frame sample failed for session {}: {err:#}", session_id);
                        continue;
                    }
                };

                let captured_at = frame.captured_at();
                let stabilized = detector.observe(frame, captured_at, pipeline.is_ready());
                publish_progress(&progress_tx, detector.progress());

                if let Some(frame) = stabilized {
                    log_info!("scene stabilized at tick {} for session {}", ticks, session_id);
                    let pipeline = pipeline.clone();
                    let token = cancel_token.clone();
                    tokio::spawn(async move {
                        let outcome = pipeline.process_frame(&frame, &token).await;
                        log_debug!("frame processed: {}", outcome_label(&outcome));
                    });
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down for session {} after {} ticks", session_id, ticks);
                break;
            }
        }
    }

    sampler.release();
    publish_progress(&progress_tx, 0.0);
}

fn publish_progress(progress_tx: &watch::Sender<f32>, progress: f32) {
    progress_tx.send_if_modified(|current| {
        if (*current - progress).abs() > f32::EPSILON {
            *current = progress;
            true
        } else {
            false
        }
    });
}

fn outcome_label(outcome: &ScanOutcome) -> &'static str {
    match outcome {
        ScanOutcome::Completed(_) => "completed",
        ScanOutcome::Cached(_) => "cached",
        ScanOutcome::NoMatch => "no match",
        ScanOutcome::Duplicate => "duplicate",
        ScanOutcome::Busy => "busy",
        ScanOutcome::Cancelled => "cancelled",
        ScanOutcome::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunting::HuntEvent;
    use crate::models::{ComicIdentity, ScanCandidate, ValuationRequest, ValueEstimate};
    use crate::recognition::{Recognizer, StaticCollection, Valuator};
    use crate::sensing::{ImagePayload, VideoSource};
    use crate::settings::ScanSettings;
    use anyhow::Result;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// First call is slow and finds nothing, later calls answer at once.
    struct SlowFirstLook {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Recognizer for SlowFirstLook {
        async fn recognize(&self, _image: &ImagePayload) -> Result<Option<ScanCandidate>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
                return Ok(None);
            }
            Ok(Some(ScanCandidate::new(ComicIdentity::new("Sandman", "8"))))
        }
    }

    struct NoValue;

    #[async_trait]
    impl Valuator for NoValue {
        async fn value(&self, _request: &ValuationRequest) -> Result<ValueEstimate> {
            Ok(ValueEstimate::default())
        }
    }

    /// Dark scene for the first few draws, then a bright one for good.
    struct SceneCut {
        draws: usize,
        cut_at: usize,
    }

    impl VideoSource for SceneCut {
        fn dimensions(&self) -> (u32, u32) {
            (32, 32)
        }

        fn draw(&mut self, surface: &mut RgbaImage) -> Result<()> {
            self.draws += 1;
            let shade = if self.draws <= self.cut_at { 10 } else { 220 };
            for pixel in surface.pixels_mut() {
                *pixel = Rgba([shade, shade, shade, 255]);
            }
            Ok(())
        }

        fn release(&mut self) {}
    }

    #[tokio::test]
    async fn scene_that_settles_while_busy_is_scanned_once_the_slot_frees() {
        let settings = ScanSettings {
            sample_interval_ms: 10,
            stabilization_ms: 30,
            ..ScanSettings::default()
        };
        let recognizer = Arc::new(SlowFirstLook {
            calls: AtomicUsize::new(0),
        });
        let pipeline = ScanPipeline::new(
            settings,
            recognizer.clone(),
            Arc::new(NoValue),
            Arc::new(StaticCollection::default()),
        );
        let mut events = pipeline.subscribe();
        let (progress_tx, progress_rx) = watch::channel(0.0);
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(sampling_loop(
            "deferral".to_string(),
            FrameSampler::new(Box::new(SceneCut { draws: 0, cut_at: 5 })),
            StabilityDetector::new(pipeline.settings().stability()),
            pipeline.clone(),
            Arc::new(progress_tx),
            cancel.clone(),
        ));

        let first = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("dark scene never scanned")
            .unwrap();
        assert_eq!(first, HuntEvent::NoMatch);

        let second = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("deferred scene never scanned")
            .unwrap();
        // the bright scene settled during the slow first look and waited for it
        assert!(matches!(second, HuntEvent::ScanCompleted { cached: false, .. }));
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 2);

        cancel.cancel();
        worker.await.unwrap();
        assert_eq!(*progress_rx.borrow(), 0.0);
    }
}
