//! Render command

use std::path::Path;

use chrono::{Local, NaiveDate};
use moongrid_core::moon::wrap_phase;
use moongrid_core::moon_phase;
use moongrid_pipeline::RefreshOutcome;
use tracing::{info, warn};

use super::loaded_session;
use crate::RunOptions;
use crate::sinks::PngSink;

/// Loop parameter for a still: an explicit phase wins over the date
pub fn still_phase(date: Option<NaiveDate>, phase: Option<f64>) -> f64 {
    match phase {
        Some(phase) => wrap_phase(phase),
        None => moon_phase(date.unwrap_or_else(|| Local::now().date_naive())),
    }
}

pub async fn run(
    options: &RunOptions,
    date: Option<NaiveDate>,
    phase: Option<f64>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = loaded_session(options).await?;
    let phase = still_phase(date, phase);

    info!("Rendering still to {}", output.display());
    let mut sink = PngSink::new(output, session.config().saturation);
    match session.refresh(phase, &mut sink).await? {
        RefreshOutcome::Rendered => println!("Mosaic written to {}", output.display()),
        RefreshOutcome::Skipped => warn!("Render skipped, backend busy"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_phase() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 21).unwrap();
        assert_eq!(still_phase(Some(date), None), moon_phase(date));
        assert_eq!(still_phase(Some(date), Some(0.25)), 0.25);
        assert_eq!(still_phase(None, Some(1.25)), 0.25);
        assert!((0.0..1.0).contains(&still_phase(None, None)));
    }
}
