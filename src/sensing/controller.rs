use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::hunting::ScanPipeline;

use super::loop_worker::sampling_loop;
use super::sampler::{FrameSampler, VideoSource};
use super::stability::StabilityDetector;

/// Owns the background sampling task for one session at a time.
pub struct SamplingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SamplingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    /// The token is also handed to every scan the loop spawns, so cancelling
    /// it discards in-flight results too.
    pub fn start(
        &mut self,
        session_id: String,
        source: Box<dyn VideoSource>,
        pipeline: ScanPipeline,
        progress_tx: Arc<watch::Sender<f32>>,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sampling already active");
        }

        let cancel_token = CancellationToken::new();
        let detector = StabilityDetector::new(pipeline.settings().stability());
        let handle = tokio::spawn(sampling_loop(
            session_id,
            FrameSampler::new(source),
            detector,
            pipeline,
            progress_tx,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            info!("Waiting for sampling loop to release the video source");
            handle
                .await
                .context("sampling loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SamplingController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SamplingController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
