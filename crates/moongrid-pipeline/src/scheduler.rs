//! Refresh scheduling
//!
//! Re-renders the still mosaic on a fixed interval. The first refresh happens
//! immediately; refreshes that collide with an animation are skipped and
//! counted, not queued.

use std::time::{Duration, Instant};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::driver::RenderError;
use crate::inference::InferenceBackend;
use crate::session::{MosaicSink, RefreshOutcome, Session};

/// Refresh counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshStats {
    /// Refreshes that rendered a mosaic
    pub completed: u64,
    /// Refreshes skipped because the backend was busy
    pub skipped: u64,
    /// Duration of the last completed refresh
    pub last_render_ms: Option<f64>,
}

/// Periodic refresh driver
pub struct RefreshScheduler {
    period: Duration,
    stats: RefreshStats,
}

impl RefreshScheduler {
    /// Create a scheduler with the given period
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            stats: RefreshStats::default(),
        }
    }

    /// Scheduler using `refresh_interval_secs`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.refresh_interval())
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> &RefreshStats {
        &self.stats
    }

    /// Refresh `session` every period, taking the loop phase from `phase`
    /// at each tick.
    ///
    /// Runs `max_ticks` refreshes, or forever when `None`. The first render
    /// error ends the loop and is returned.
    pub async fn run<B, M, C>(
        &mut self,
        session: &Session<B>,
        sink: &mut M,
        mut phase: C,
        max_ticks: Option<u64>,
    ) -> Result<(), RenderError>
    where
        B: InferenceBackend,
        M: MosaicSink + ?Sized,
        C: FnMut() -> f64,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = self.period.as_secs_f64(), "Periodic refresh started");

        let mut ticks = 0u64;
        while max_ticks.is_none_or(|max| ticks < max) {
            ticker.tick().await;
            ticks += 1;

            let start = Instant::now();
            match session.refresh(phase(), sink).await? {
                RefreshOutcome::Rendered => {
                    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                    self.stats.completed += 1;
                    self.stats.last_render_ms = Some(elapsed);
                    debug!(tick = ticks, duration_ms = elapsed, "Refresh completed");
                }
                RefreshOutcome::Skipped => {
                    self.stats.skipped += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::tests::PaletteStub;
    use crate::session::SessionState;
    use moongrid_core::{Features, LatentRng, MosaicFrame};

    async fn loaded_session() -> Session<PaletteStub> {
        let config = EngineConfig::default()
            .with_tile_size(2)
            .with_latent_dim(4)
            .with_tile_yield(None);
        let features = Features {
            grid_resolution: 2,
            num_phases: 2,
        };
        let session =
            Session::new(PaletteStub::new(4, 2, vec![[0.5; 3]]), config, features).unwrap();
        session.load(&mut LatentRng::seeded(3)).await.unwrap();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh() {
        let session = loaded_session().await;
        let mut scheduler = RefreshScheduler::from_config(session.config());
        assert_eq!(scheduler.period(), Duration::from_secs(3600));

        let mut sink: Vec<MosaicFrame> = Vec::new();
        let mut phases = [0.1, 0.2, 0.3].into_iter();
        let started = tokio::time::Instant::now();
        scheduler
            .run(&session, &mut sink, || phases.next().unwrap_or(0.0), Some(3))
            .await
            .unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(scheduler.stats().completed, 3);
        assert_eq!(scheduler.stats().skipped, 0);
        assert!(scheduler.stats().last_render_ms.is_some());
        // first tick is immediate, then two full periods
        assert_eq!(started.elapsed(), Duration::from_secs(7200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_refreshes_are_counted() {
        let session = loaded_session().await;
        session.force_state(SessionState::Animating);

        let mut scheduler = RefreshScheduler::new(Duration::from_secs(60));
        let mut sink: Vec<MosaicFrame> = Vec::new();
        scheduler
            .run(&session, &mut sink, || 0.5, Some(2))
            .await
            .unwrap();

        assert!(sink.is_empty());
        assert_eq!(scheduler.stats().skipped, 2);
        assert_eq!(scheduler.stats().last_render_ms, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_error_stops_loop() {
        let session = loaded_session().await;
        session.force_state(SessionState::Loading);

        let mut scheduler = RefreshScheduler::new(Duration::from_secs(60));
        let mut sink: Vec<MosaicFrame> = Vec::new();
        let result = scheduler.run(&session, &mut sink, || 0.0, None).await;

        assert!(result.is_err());
        assert_eq!(scheduler.stats(), &RefreshStats::default());
    }
}
