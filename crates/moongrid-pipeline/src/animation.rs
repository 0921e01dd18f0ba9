//! Looping animation
//!
//! Each frame sweeps the loop parameter `l` from 0 to 1 over the base grids
//! A, B and C, renders the circular-interpolated grid through the tile driver
//! and hands the mosaic to a [`FrameSink`] in frame order.

use std::time::Duration;

use moongrid_core::{
    CircularInterpolator, LatentGrid, LatentRng, MosaicFrame, Result as CoreResult, TileLayout,
    UniformSource,
};
use tracing::{Instrument, Level, debug, span};

use crate::config::EngineConfig;
use crate::driver::{RenderError, TileDriver};
use crate::inference::InferenceBackend;

/// Smallest denominator base for the loop parameter
const MIN_FRAME_SPAN: f64 = 1.000_000_01;

/// The three seeded grids a session interpolates between
#[derive(Debug, Clone, PartialEq)]
pub struct BaseGrids {
    pub a: LatentGrid,
    pub b: LatentGrid,
    pub c: LatentGrid,
}

impl BaseGrids {
    /// Sample A, B and C, in that order, as `side × side` grids
    pub fn sample<S: UniformSource>(
        rng: &mut LatentRng<S>,
        side: usize,
        dim: usize,
    ) -> CoreResult<Self> {
        let a = LatentGrid::random(rng, side, side, dim)?;
        let b = LatentGrid::random(rng, side, side, dim)?;
        let c = LatentGrid::random(rng, side, side, dim)?;
        Ok(Self { a, b, c })
    }

    /// Grid at loop phase `l`
    pub fn at_phase(&self, interpolator: &CircularInterpolator, l: f64) -> CoreResult<LatentGrid> {
        interpolator.interpolate(&self.a, &self.b, &self.c, l)
    }
}

/// Receives finished animation frames
pub trait FrameSink: Send {
    /// Accept the next frame, shown for `delay`
    fn push_frame(&mut self, frame: &MosaicFrame, delay: Duration) -> Result<(), RenderError>;

    /// Called once after the last frame
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

impl FrameSink for Vec<MosaicFrame> {
    fn push_frame(&mut self, frame: &MosaicFrame, _delay: Duration) -> Result<(), RenderError> {
        self.push(frame.clone());
        Ok(())
    }
}

/// Animation progress callback
pub trait AnimationProgress: Send {
    /// `done` of `total` frames are finished
    fn on_frame(&mut self, done: usize, total: usize);
}

impl<F: FnMut(usize, usize) + Send> AnimationProgress for F {
    fn on_frame(&mut self, done: usize, total: usize) {
        self(done, total)
    }
}

/// Frame count and timing for one animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationPlan {
    pub num_frames: usize,
    pub frame_delay: Duration,
}

impl AnimationPlan {
    pub fn new(num_frames: usize, frame_delay: Duration) -> Self {
        Self {
            num_frames,
            frame_delay,
        }
    }

    /// Plan from `gif_duration_secs`, `gif_framerate`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.num_frames(), config.frame_delay())
    }

    /// Loop parameter of frame `index`: `index / (n - 1)`.
    ///
    /// The last frame lands on `l = 1`, which matches frame 0. A single
    /// frame gets `l = 0`.
    pub fn loop_parameter(&self, index: usize) -> f64 {
        let span = (self.num_frames as f64).max(MIN_FRAME_SPAN) - 1.0;
        index as f64 / span
    }

    /// Loop parameters for every frame, in order
    pub fn phases(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.num_frames).map(|i| self.loop_parameter(i))
    }
}

/// Render every frame of `plan` into `sink`, returning the frame count.
///
/// The first failing frame aborts the animation; `sink.finish` is only
/// called when all frames were delivered.
pub async fn render_animation<B, F, P>(
    driver: &mut TileDriver<B>,
    grids: &BaseGrids,
    interpolator: &CircularInterpolator,
    layout: TileLayout,
    plan: &AnimationPlan,
    sink: &mut F,
    progress: &mut P,
) -> Result<usize, RenderError>
where
    B: InferenceBackend,
    F: FrameSink + ?Sized,
    P: AnimationProgress + ?Sized,
{
    let total = plan.num_frames;
    for (frame_index, phase) in plan.phases().enumerate() {
        let grid = grids.at_phase(interpolator, phase)?;
        let span = span!(Level::DEBUG, "animation_frame", frame = frame_index, phase);
        let frame = driver.render(&grid, layout).instrument(span).await?;

        sink.push_frame(&frame, plan.frame_delay)?;
        progress.on_frame(frame_index + 1, total);
    }
    sink.finish()?;

    debug!(frames = total, "Animation complete");
    Ok(total)
}
