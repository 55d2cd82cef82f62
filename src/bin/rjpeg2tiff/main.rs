mod args;

use anyhow::{Context, Result};
use itertools::{Itertools, MinMaxResult};
use tracing::{info, warn};

use radiometric::{
    cli::{init_logging, ThermalInput},
    output::{copy_metadata, output_path_for, write_temperature_tiff_path},
};

use crate::args::Args;

fn main() -> Result<()> {
    init_logging();
    let args = Args::from_cmd_line()?;

    let input = ThermalInput::load(&args.path, args.kind)
        .with_context(|| format!("could not read thermal image {}", args.path.display()))?;
    let (height, width) = input.image.image.dim();
    info!(width, height, "read {}", args.path.display());

    let raster = input.image.temperatures(&args.overrides)?;
    if let MinMaxResult::MinMax(min, max) = raster.iter().minmax_by(|a, b| a.total_cmp(b)) {
        info!(min, max, "temperature range (C)");
    }

    let out_path = output_path_for(&input.source, args.output.as_deref())?;
    write_temperature_tiff_path(&raster, &out_path)?;
    match (args.copy_metadata, &input.metadata_source) {
        (true, Some(source)) => copy_metadata(source, &out_path)?,
        (true, None) => warn!("no source image recorded in the json; metadata not copied"),
        (false, _) => {}
    }
    info!("wrote {}", out_path.display());

    Ok(())
}
