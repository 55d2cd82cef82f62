//! Persist temperature rasters as 32-bit float TIFFs.

use std::{
    fs::File,
    io::{BufWriter, Seek, Write},
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{anyhow, ensure, Context, Result};
use tiff::encoder::{colortype::Gray32Float, Compression, TiffEncoder};
use tracing::debug;

use crate::pipeline::TemperatureRaster;

/// `<dir>/<stem>.tif`, where `dir` is `output_dir` if given
/// and the directory of `input` otherwise.
pub fn output_path_for(input: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("no file name in {}", input.display()))?;
    let dir = match output_dir {
        Some(dir) => dir,
        None => input.parent().unwrap_or_else(|| Path::new("")),
    };
    Ok(dir.join(stem).with_extension("tif"))
}

/// Write `raster` as a single-band, LZW compressed, IEEE
/// float grayscale TIFF.
pub fn write_temperature_tiff<W>(raster: &TemperatureRaster, writer: W) -> Result<()>
where
    W: Write + Seek,
{
    let (height, width) = raster.dim();
    let data = raster.as_standard_layout();
    let data = data
        .as_slice()
        .ok_or_else(|| anyhow!("raster is not contiguous"))?;

    TiffEncoder::new(writer)?
        .with_compression(Compression::Lzw)
        .write_image::<Gray32Float>(width as u32, height as u32, data)?;
    Ok(())
}

pub fn write_temperature_tiff_path(raster: &TemperatureRaster, path: &Path) -> Result<()> {
    debug!("writing {}", path.display());
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_temperature_tiff(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Copy all metadata of `source` onto `target` (requires
/// exiftool).
pub fn copy_metadata(source: &Path, target: &Path) -> Result<()> {
    let status = Command::new("exiftool")
        .arg("-TagsFromFile")
        .arg(source)
        .arg("-all:all>all:all")
        .arg(target)
        .arg("-overwrite_original")
        .status()
        .context("could not run exiftool")?;
    ensure!(
        status.success(),
        "failed to copy metadata from {} to {}",
        source.display(),
        target.display()
    );
    Ok(())
}
