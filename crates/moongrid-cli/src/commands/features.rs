//! Features command

use tracing::info;

use super::prepare;
use crate::RunOptions;

pub fn run(options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let setup = prepare(options)?;
    let layout = setup.features.tile_layout();
    info!(
        tiles = layout.tile_count(),
        grid = setup.features.num_phases,
        "Run shape"
    );

    println!("{}", serde_json::to_string_pretty(&setup.features)?);
    Ok(())
}
