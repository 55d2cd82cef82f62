//! Thermal images: the raw sensor frame and its metadata.

use std::{
    convert::TryFrom,
    fs::{read, File},
    io::{BufReader, Cursor, Read},
    path::Path,
    process::Command,
};

use anyhow::{anyhow, bail, ensure, Context, Result};
use image::{codecs::tiff::TiffDecoder, ColorType, ImageDecoder};
use img_parts::jpeg::Jpeg;
use ndarray::Array2;
use serde_derive::*;
use tracing::{debug, info, warn};

use crate::{
    calibration::CalibrationParameterSet,
    environment::EnvironmentOverrides,
    flir::parse_rjpeg,
    metadata::{CameraMetadata, TagValue},
    pipeline::{convert, RawThermalFrame, TemperatureRaster},
};

pub struct ThermalImage {
    pub metadata: CameraMetadata,
    pub image: RawThermalFrame,
}

impl ThermalImage {
    /// Parse an R-JPEG with FFF-encoded FLIR segments.
    pub fn from_rjpeg(image: &Jpeg) -> Result<Self> {
        let (image, metadata) = parse_rjpeg(image)?;
        Ok(ThermalImage { metadata, image })
    }

    pub fn try_from_rjpeg_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = Jpeg::from_bytes(read(path)?.into())
            .with_context(|| format!("reading jpeg {}", path.display()))?;
        Self::from_rjpeg(&image)
    }

    /// Parse the output of `exiftool -j -b` for a single
    /// image.
    pub fn try_from_exiftool_json<R: Read>(rdr: R) -> Result<Self> {
        Self::try_from(ThermalExiftoolJson::from_reader(rdr)?)
    }

    pub fn try_from_exiftool_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::try_from_exiftool_json(BufReader::new(File::open(path)?))
    }

    /// Run `exiftool -j -b` on `path` and parse its output.
    pub fn try_from_exiftool<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("running exiftool on {}", path.display());
        let output = Command::new("exiftool")
            .arg("-j")
            .arg("-b")
            .arg(path)
            .output()
            .context("could not run exiftool")?;
        ensure!(
            output.status.success(),
            "exiftool failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Self::try_from_exiftool_json(&output.stdout[..])
    }

    /// Convert the raw frame to temperatures in celsius.
    ///
    /// Calibration constants are read from the metadata;
    /// scene parameters come from `overrides`, falling back
    /// to the metadata.
    pub fn temperatures(
        &self,
        overrides: &EnvironmentOverrides,
    ) -> crate::error::Result<TemperatureRaster> {
        for tag in self.metadata.missing() {
            match self.metadata.value(tag) {
                Some(TagValue::Unparseable(text)) => warn!("{} is not a number: `{}`", tag, text),
                _ => debug!("{} absent from metadata", tag),
            }
        }
        let calibration = CalibrationParameterSet::from_metadata(&self.metadata)?;
        let env = overrides.resolve(&self.metadata)?;
        info!(
            emissivity = env.emissivity,
            distance = env.distance,
            ambient = env.ambient_temperature,
            reflected = env.reflected_temperature,
            humidity = env.relative_humidity,
            "scene parameters"
        );
        convert(&self.image, &calibration, &env)
    }
}

/// `exiftool -j -b` output for one image.
#[derive(Deserialize, Debug)]
pub struct ThermalExiftoolJson {
    #[serde(rename = "SourceFile", default)]
    pub source_file: Option<String>,

    #[serde(flatten)]
    pub metadata: CameraMetadata,

    #[serde(flatten)]
    pub raw: ThermalRawBytes,
}

impl ThermalExiftoolJson {
    /// Read an exiftool json array holding a single image.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut values: Vec<ThermalExiftoolJson> = serde_json::from_reader(rdr)?;
        ensure!(
            values.len() == 1,
            "expected exiftool json array with one item, found {}",
            values.len()
        );
        Ok(values.remove(0))
    }
}

impl TryFrom<ThermalExiftoolJson> for ThermalImage {
    type Error = anyhow::Error;

    fn try_from(json: ThermalExiftoolJson) -> Result<Self> {
        Ok(ThermalImage {
            image: json.raw.thermal_image()?,
            metadata: json.metadata,
        })
    }
}

/// The embedded raw thermal image as extracted by ExifTool.
#[derive(Deserialize, Debug)]
pub struct ThermalRawBytes {
    #[serde(rename = "RawThermalImageType")]
    ty: String,

    #[serde(
        rename = "RawThermalImage",
        deserialize_with = "serde_helpers::base64_bytes"
    )]
    bytes: Vec<u8>,
}

impl ThermalRawBytes {
    pub fn thermal_image(&self) -> Result<RawThermalFrame> {
        match self.ty.as_str() {
            "TIFF" => decode_tiff(&self.bytes),
            "PNG" => decode_flir_png(&self.bytes),
            ty => bail!("unsupported raw thermal image type: {}", ty),
        }
    }
}

/// Upper bound on the size of an embedded raw frame.
const MAX_RAW_PIXELS: usize = 1 << 24;

fn decode_tiff(bytes: &[u8]) -> Result<RawThermalFrame> {
    let decoder = TiffDecoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions();
    let pixels = raw_pixel_count(width, height)?;
    let (width, height) = (width as usize, height as usize);

    use zerocopy::AsBytes;
    let values: Vec<u16> = match decoder.color_type() {
        ColorType::L16 => {
            let mut buf = vec![0u16; pixels];
            decoder.read_image(buf.as_bytes_mut())?;
            buf
        }
        ColorType::L8 => {
            let mut buf = vec![0u8; pixels];
            decoder.read_image(&mut buf)?;
            buf.into_iter().map(u16::from).collect()
        }
        ty => bail!("unsupported raw thermal color type: {:?}", ty),
    };

    Ok(Array2::from_shape_vec((height, width), values)?)
}

fn raw_pixel_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .filter(|&n| n <= MAX_RAW_PIXELS)
        .ok_or_else(|| anyhow!("raw thermal frame too large: {}x{}", width, height))
}

/// Decode a 16-bit grayscale PNG raw frame.
///
/// FLIR writes the samples little-endian, against the PNG
/// convention.
pub(crate) fn decode_flir_png(bytes: &[u8]) -> Result<RawThermalFrame> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::IDENTITY);
    let (info, mut reader) = decoder.read_info()?;
    ensure!(
        info.color_type == png::ColorType::Grayscale && info.bit_depth == png::BitDepth::Sixteen,
        "unsupported raw thermal png: {:?} {:?}",
        info.color_type,
        info.bit_depth
    );
    raw_pixel_count(info.width, info.height)?;

    let mut buf = vec![0; info.buffer_size()];
    reader.next_frame(&mut buf)?;
    let values: Vec<u16> = buf
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();

    Array2::from_shape_vec((info.height as usize, info.width as usize), values)
        .map_err(|e| anyhow!("raw thermal png: {}", e))
}

mod serde_helpers {
    use lazy_static::lazy_static;
    use regex::Regex;
    use serde::*;

    pub fn base64_bytes<'de, D>(de: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^base64:").unwrap();
        }

        use serde::de::Error;
        let str_rep = <String as Deserialize>::deserialize(de)?;
        let prefix = RE
            .find(&str_rep)
            .ok_or_else(|| Error::custom("unexpected format: must begin with `base64:`"))?;

        base64::decode(&str_rep[prefix.end()..]).map_err(Error::custom)
    }
}
