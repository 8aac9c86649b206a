//! # Feeder Module
//!
//! The frame loop: pull a frame, classify it, rank the classes, let the
//! policy decide, then print / save / alert.
//!
//! Classifier and storage failures are logged and counted; the loop keeps
//! going. Only the frame source can end a run with an error. Alerts are
//! sent from background tasks so a slow notification API never delays the
//! next frame; in-flight alerts are awaited before [`Feeder::run`] returns.

use crate::api::SharedStats;
use crate::classifier::Classifier;
use crate::error::AppError;
use crate::notify::{Alert, Notifier};
use crate::source::{Frame, FrameSource};
use crate::storage::CaptureStore;
use birdfeeder_core::{
    CaptureTag, Classification, FeederPolicy, FeederStats, FrameTiming, LabelMap, PolicyConfig,
    Score, render_results,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Ranking and policy settings for a run.
#[derive(Debug, Clone)]
pub struct FeederSettings {
    pub labels: LabelMap,
    pub threshold: Score,
    pub top_k: usize,
    pub policy: PolicyConfig,
}

/// One feeder run.
pub struct Feeder<S, C, N> {
    source: S,
    classifier: C,
    notifier: Option<Arc<N>>,
    store: CaptureStore,
    labels: LabelMap,
    threshold: Score,
    top_k: usize,
    policy: FeederPolicy,
    stats: SharedStats,
    start: Instant,
    last_frame: Instant,
    alerts: JoinSet<()>,
}

impl<S, C, N> Feeder<S, C, N>
where
    S: FrameSource,
    C: Classifier,
    N: Notifier + Send + Sync + 'static,
{
    /// Cooldowns are armed now.
    pub fn new(
        source: S,
        classifier: C,
        store: CaptureStore,
        settings: FeederSettings,
        notifier: Option<N>,
    ) -> Self {
        let start = Instant::now();
        Self {
            source,
            classifier,
            notifier: notifier.map(Arc::new),
            store,
            labels: settings.labels,
            threshold: settings.threshold,
            top_k: settings.top_k.max(1),
            policy: FeederPolicy::new(settings.policy, start),
            stats: SharedStats::default(),
            start,
            last_frame: start,
            alerts: JoinSet::new(),
        }
    }

    /// Handle for the status endpoint.
    #[must_use]
    pub fn stats(&self) -> SharedStats {
        Arc::clone(&self.stats)
    }

    /// Run until the source ends or `shutdown` resolves.
    pub async fn run(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<FeederStats, AppError> {
        tokio::pin!(shutdown);
        info!(labels = self.labels.len(), "feeder running");

        let outcome = loop {
            let next = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break Ok(());
                }
                next = self.source.next_frame() => next,
            };

            match next {
                Ok(Some(frame)) => self.process(frame).await,
                Ok(None) => {
                    info!("frame source finished");
                    break Ok(());
                }
                Err(err) => break Err(err),
            }
        };

        while self.alerts.join_next().await.is_some() {}

        let stats = self.stats.read().await.clone();
        info!(
            frames = stats.frames,
            detections = stats.detections,
            captures = stats.captures,
            alerts = stats.alerts,
            errors = stats.errors,
            "feeder stopped"
        );
        outcome.map(|()| stats)
    }

    async fn process(&mut self, frame: Frame) {
        // reap finished alert tasks
        while self.alerts.try_join_next().is_some() {}

        self.stats.write().await.record_frame();
        let started = Instant::now();

        let raw = match self.classifier.classify(&frame).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "classification failed");
                self.stats.write().await.record_error();
                return;
            }
        };

        let finished = Instant::now();
        let classification = Classification::rank(&raw, &self.labels, self.threshold, self.top_k);
        let decision = self.policy.evaluate(&classification, finished);
        debug!(results = %classification.summary(), ?decision, "frame classified");

        if decision.print {
            let timing = FrameTiming {
                inference: finished.saturating_duration_since(started),
                interval: finished.saturating_duration_since(self.last_frame),
            };
            print!("{}", render_results(&timing, &classification));
        }
        self.last_frame = finished;

        if let Some(top) = classification.top().filter(|_| decision.detection) {
            self.stats.write().await.record_detection(top);
        }

        if let Some(reason) = decision.save {
            let tag = CaptureTag::at(self.start, finished);
            match self.store.save(&frame, &classification, tag, reason).await {
                Ok(record) => self.stats.write().await.record_capture(record.file),
                Err(err) => {
                    warn!(error = %err, tag = %tag, "failed to save frame");
                    self.stats.write().await.record_error();
                }
            }
        }

        if decision.alert {
            self.dispatch_alert(frame, &classification);
        }
    }

    fn dispatch_alert(&mut self, frame: Frame, classification: &Classification) {
        let (Some(notifier), Some(top)) = (self.notifier.as_ref(), classification.top()) else {
            return;
        };

        let notifier = Arc::clone(notifier);
        let stats = Arc::clone(&self.stats);
        let alert = Alert::detection(top.label.clone(), frame.jpeg);
        info!(label = %alert.message, "sending alert");

        self.alerts.spawn(async move {
            match notifier.notify(&alert).await {
                Ok(()) => stats.write().await.record_alert(),
                Err(err) => {
                    warn!(error = %err, "alert delivery failed");
                    stats.write().await.record_error();
                }
            }
        });
    }
}
