//! Render session
//!
//! A session owns the backend, the seeded base grids and the configuration
//! for one run. Still refreshes and full animations share the backend, so
//! they are mutually exclusive:
//!
//! ```text
//! Loading ──load()──▶ Ready ──animate()──▶ Animating
//!                       ▲                      │
//!                       └──── refresh, done ───┘
//! ```
//!
//! A refresh that arrives while an animation runs is skipped, and an
//! animation requested before loading finished is ignored.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::NaiveDate;
use moongrid_core::{
    CircularInterpolator, Features, LatentRng, MoonPhaseLabel, MosaicFrame, TileLayout,
    UniformSource, moon_phase,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::animation::{AnimationPlan, AnimationProgress, BaseGrids, FrameSink, render_animation};
use crate::config::EngineConfig;
use crate::driver::{RenderError, TileDriver};
use crate::inference::{InferenceBackend, InferenceError};

/// Receives still mosaics for display
pub trait MosaicSink: Send {
    fn present(&mut self, frame: &MosaicFrame) -> Result<(), RenderError>;
}

impl MosaicSink for Vec<MosaicFrame> {
    fn present(&mut self, frame: &MosaicFrame) -> Result<(), RenderError> {
        self.push(frame.clone());
        Ok(())
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Backend or grids not ready yet
    Loading = 0,
    /// Idle, accepting refreshes and animations
    Ready = 1,
    /// An animation owns the backend
    Animating = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Ready,
            2 => Self::Animating,
            _ => Self::Loading,
        }
    }
}

/// Result of a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rendered,
    /// Another render held the backend
    Skipped,
}

/// Result of an animation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    Rendered { frames: usize },
    /// The session was still loading or already animating
    Ignored,
}

/// Puts the session back to `Ready` when an animation ends, including when
/// its future is dropped
struct AnimatingGuard<'a>(&'a AtomicU8);

impl Drop for AnimatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(SessionState::Ready as u8, Ordering::Release);
    }
}

/// One seeded run over one backend
pub struct Session<B> {
    config: EngineConfig,
    features: Features,
    layout: TileLayout,
    interpolator: CircularInterpolator,
    driver: Mutex<TileDriver<B>>,
    grids: OnceLock<BaseGrids>,
    state: AtomicU8,
}

impl<B: InferenceBackend> Session<B> {
    /// Create a session in the `Loading` state
    pub fn new(backend: B, config: EngineConfig, features: Features) -> Result<Self, RenderError> {
        config.validate()?;
        let interpolator = CircularInterpolator::new(config.circular_radius)?;
        let driver = TileDriver::new(backend, config.yield_policy());

        Ok(Self {
            layout: features.tile_layout(),
            config,
            features,
            interpolator,
            driver: Mutex::new(driver),
            grids: OnceLock::new(),
            state: AtomicU8::new(SessionState::Loading as u8),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    pub fn interpolator(&self) -> &CircularInterpolator {
        &self.interpolator
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Base grids, once loaded
    pub fn grids(&self) -> Option<&BaseGrids> {
        self.grids.get()
    }

    /// Load the backend, then sample grids A, B and C from `rng`.
    ///
    /// Loading an already loaded session keeps the existing grids.
    pub async fn load<S: UniformSource>(&self, rng: &mut LatentRng<S>) -> Result<(), RenderError> {
        let mut driver = self.driver.lock().await;
        if !driver.backend().is_ready() {
            driver.backend_mut().load().await?;
        }
        let dim = driver.backend().latent_dim();
        if dim != self.config.latent_dim {
            warn!(
                configured = self.config.latent_dim,
                backend = dim,
                "Backend latent size differs from configuration, using backend's"
            );
        }

        if self.grids.get().is_none() {
            let side = self.features.num_phases as usize;
            let grids = BaseGrids::sample(rng, side, dim)?;
            // loads are serialized by the driver lock
            let _ = self.grids.set(grids);
            debug!(side, dim, "Base grids sampled");
        }

        self.state.store(SessionState::Ready as u8, Ordering::Release);
        info!(backend = driver.backend().name(), "Session ready");
        Ok(())
    }

    /// Render the base mosaic at loop phase `phase` into `sink`.
    ///
    /// Skipped while an animation or another refresh holds the backend.
    pub async fn refresh<M>(&self, phase: f64, sink: &mut M) -> Result<RefreshOutcome, RenderError>
    where
        M: MosaicSink + ?Sized,
    {
        match self.state() {
            SessionState::Loading => return Err(InferenceError::ModelNotLoaded.into()),
            SessionState::Animating => {
                debug!("Refresh skipped, animation in progress");
                return Ok(RefreshOutcome::Skipped);
            }
            SessionState::Ready => {}
        }

        let Ok(mut driver) = self.driver.try_lock() else {
            debug!("Refresh skipped, backend busy");
            return Ok(RefreshOutcome::Skipped);
        };
        self.present_phase(&mut *driver, phase, sink).await?;
        Ok(RefreshOutcome::Rendered)
    }

    /// Refresh at the moon phase of `date`
    pub async fn refresh_at<M>(
        &self,
        date: NaiveDate,
        sink: &mut M,
    ) -> Result<RefreshOutcome, RenderError>
    where
        M: MosaicSink + ?Sized,
    {
        self.refresh(moon_phase(date), sink).await
    }

    /// Render the full looping animation into `frames`, then refresh the
    /// still mosaic at `phase` into `still`.
    ///
    /// Ignored unless the session is `Ready`. The session returns to `Ready`
    /// whether or not rendering succeeded.
    pub async fn animate<F, P, M>(
        &self,
        frames: &mut F,
        progress: &mut P,
        phase: f64,
        still: &mut M,
    ) -> Result<AnimationOutcome, RenderError>
    where
        F: FrameSink + ?Sized,
        P: AnimationProgress + ?Sized,
        M: MosaicSink + ?Sized,
    {
        if let Err(current) = self.state.compare_exchange(
            SessionState::Ready as u8,
            SessionState::Animating as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            debug!(state = ?SessionState::from_u8(current), "Animation request ignored");
            return Ok(AnimationOutcome::Ignored);
        }
        let _guard = AnimatingGuard(&self.state);

        let Some(grids) = self.grids.get() else {
            return Ok(AnimationOutcome::Ignored);
        };

        let mut driver = self.driver.lock().await;
        let plan = AnimationPlan::from_config(&self.config);
        info!(frames = plan.num_frames, "Rendering animation");

        let rendered = render_animation(
            &mut *driver,
            grids,
            &self.interpolator,
            self.layout,
            &plan,
            frames,
            progress,
        )
        .await;
        let restored = self.present_phase(&mut *driver, phase, still).await;

        let frames = rendered?;
        restored?;
        Ok(AnimationOutcome::Rendered { frames })
    }

    async fn present_phase<M>(
        &self,
        driver: &mut TileDriver<B>,
        phase: f64,
        sink: &mut M,
    ) -> Result<(), RenderError>
    where
        M: MosaicSink + ?Sized,
    {
        let grids = self
            .grids
            .get()
            .ok_or(RenderError::Inference(InferenceError::ModelNotLoaded))?;

        info!("Phase: {:.2} ({})", phase, MoonPhaseLabel::from_phase(phase));
        let grid = grids.at_phase(&self.interpolator, phase)?;
        let frame = driver.render(&grid, self.layout).await?;
        sink.present(&frame)
    }

    #[cfg(test)]
    pub(crate) fn force_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
