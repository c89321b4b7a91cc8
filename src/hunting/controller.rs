use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex};
use uuid::Uuid;

use crate::sensing::{SamplingController, VideoSource};
use crate::stats::SessionSnapshot;

use super::events::HuntEvent;
use super::pipeline::ScanPipeline;
use super::state::{HuntState, HuntingSnapshot};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Debug)]
struct ActiveSession {
    session_id: String,
    started_at: DateTime<Utc>,
}

/// Start/stop surface for Hunting Mode. One session at a time; clones share it.
#[derive(Clone)]
pub struct HuntingSession {
    pipeline: ScanPipeline,
    active: Arc<Mutex<Option<ActiveSession>>>,
    sampling: Arc<Mutex<SamplingController>>,
    progress_tx: Arc<watch::Sender<f32>>,
}

impl HuntingSession {
    pub fn new(pipeline: ScanPipeline) -> Self {
        let (progress_tx, _) = watch::channel(0.0);
        Self {
            pipeline,
            active: Arc::new(Mutex::new(None)),
            sampling: Arc::new(Mutex::new(SamplingController::new())),
            progress_tx: Arc::new(progress_tx),
        }
    }

    pub fn pipeline(&self) -> &ScanPipeline {
        &self.pipeline
    }

    /// Begin sampling `source`. Fails if a session is already running.
    pub async fn start(&self, source: Box<dyn VideoSource>) -> Result<String> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            bail!("hunting session already active");
        }

        self.pipeline.reset().await;
        self.progress_tx.send_replace(0.0);

        let session_id = Uuid::new_v4().to_string();
        self.sampling.lock().await.start(
            session_id.clone(),
            source,
            self.pipeline.clone(),
            Arc::clone(&self.progress_tx),
        )?;

        *active = Some(ActiveSession {
            session_id: session_id.clone(),
            started_at: Utc::now(),
        });
        log_info!("hunting session {} started", session_id);
        Ok(session_id)
    }

    /// Stop sampling, release the source, and drop everything the session
    /// learned. Returns the final stats. Stopping an idle session is a no-op.
    pub async fn stop(&self) -> Result<SessionSnapshot> {
        let mut active = self.active.lock().await;
        let Some(session) = active.take() else {
            return Ok(self.pipeline.snapshot().await);
        };

        let joined = self.sampling.lock().await.stop().await;
        if let Err(err) = &joined {
            log_error!("sampling loop for session {} ended badly: {err:#}", session.session_id);
        }

        let summary = self.pipeline.snapshot().await;
        self.pipeline.reset().await;
        self.progress_tx.send_replace(0.0);
        log_info!(
            "hunting session {} stopped after {} results",
            session.session_id,
            summary.scan_count
        );

        joined.map(|_| summary)
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn state(&self) -> HuntState {
        HuntState::resolve(self.is_active().await, self.pipeline.stage())
    }

    pub fn progress(&self) -> f32 {
        *self.progress_tx.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<f32> {
        self.progress_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HuntEvent> {
        self.pipeline.subscribe()
    }

    pub async fn snapshot(&self) -> HuntingSnapshot {
        let (session_id, started_at) = match self.active.lock().await.as_ref() {
            Some(session) => (Some(session.session_id.clone()), Some(session.started_at)),
            None => (None, None),
        };
        let stage = self.pipeline.stage();
        HuntingSnapshot {
            state: HuntState::resolve(session_id.is_some(), stage),
            session_id,
            stage,
            progress: self.progress(),
            started_at,
            stats: self.pipeline.snapshot().await,
        }
    }
}
