//! Watch command

use std::path::Path;

use chrono::Local;
use moongrid_core::moon_phase;
use moongrid_pipeline::RefreshScheduler;
use tracing::info;

use super::loaded_session;
use crate::RunOptions;
use crate::sinks::PngSink;

pub async fn run(
    options: &RunOptions,
    output: &Path,
    ticks: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = loaded_session(options).await?;
    let mut sink = PngSink::new(output, session.config().saturation);
    let mut scheduler = RefreshScheduler::from_config(session.config());

    info!(
        "Refreshing {} every {}s",
        output.display(),
        scheduler.period().as_secs()
    );
    scheduler
        .run(
            &session,
            &mut sink,
            || moon_phase(Local::now().date_naive()),
            ticks,
        )
        .await?;

    let stats = scheduler.stats();
    println!(
        "{} refreshes written to {} ({} skipped)",
        stats.completed,
        output.display(),
        stats.skipped
    );
    Ok(())
}
