//! Animate command

use std::path::Path;

use chrono::Local;
use moongrid_core::{MosaicFrame, moon_phase};
use moongrid_pipeline::{AnimationOutcome, MosaicSink};
use tracing::{info, warn};

use super::loaded_session;
use crate::RunOptions;
use crate::sinks::{GifSink, PngSink};

pub async fn run(
    options: &RunOptions,
    output: &Path,
    still: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = loaded_session(options).await?;
    let config = session.config().clone();

    let mut gif = GifSink::create(output, config.gif_size, config.saturation)?;
    let mut progress = |done: usize, total: usize| info!("Frame {} / {}", done, total);
    let mut closing: Vec<MosaicFrame> = Vec::new();
    let phase = moon_phase(Local::now().date_naive());

    match session
        .animate(&mut gif, &mut progress, phase, &mut closing)
        .await?
    {
        AnimationOutcome::Rendered { frames } => {
            println!("{} frames written to {}", frames, output.display());
        }
        AnimationOutcome::Ignored => {
            warn!("Animation ignored, session not ready");
            return Ok(());
        }
    }

    if let (Some(path), Some(frame)) = (still, closing.last()) {
        PngSink::new(path, config.saturation).present(frame)?;
        println!("Still written to {}", path.display());
    }
    Ok(())
}
