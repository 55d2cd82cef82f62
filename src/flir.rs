//! Parse the raw sensor frame and calibration parameters
//! from FLIR R-JPEGs.
//!
//! This follows the FLIR handling of [ExifTool] by Phil
//! Harvey, restricted to FFF-encoded data: the raw data
//! record (16-bit values or PNG) and the camera info record
//! holding the Planck and atmospheric constants.
//!
//! [ExifTool]: //exiftool.org

use std::io::Cursor;

use anyhow::{anyhow, bail, ensure, Context, Result};
use byteordered::{ByteOrdered, Endianness};
use img_parts::jpeg::{markers, Jpeg};
use ndarray::Array2;
use tracing::debug;

use crate::{
    calibration::CELSIUS_OFFSET,
    image::decode_flir_png,
    metadata::{CameraMetadata, MetadataTag},
    parse::Parseable,
};

const RAW_DATA_RECORD: u16 = 0x01;
const CAMERA_INFO_RECORD: u16 = 0x20;

/// Concatenated FLIR segments of an R-JPEG, with their
/// record directory.
#[derive(Debug)]
pub struct FlirSegment {
    data: Vec<u8>,
    dir: Vec<FlirRecordDirEntry>,
}

impl FlirSegment {
    pub fn try_from_jpeg(image: &Jpeg) -> Result<Self> {
        let data = collect_flir_segment_data_from_jpeg(image)?;
        let dir = parse_flir_directory(&data)?;
        debug!(records = dir.len(), bytes = data.len(), "parsed FFF directory");
        Ok(FlirSegment { data, dir })
    }

    /// The raw sensor frame, or `None` if the segment has no
    /// raw data record.
    pub fn try_parse_raw_data(&self) -> Result<Option<Array2<u16>>> {
        self.dir
            .iter()
            .find_map(|e| e.try_parse_raw_data(&self.data).transpose())
            .transpose()
    }

    /// The camera parameters, or `None` if the segment has
    /// no camera info record.
    pub fn try_parse_camera_params(&self) -> Result<Option<FlirCameraParams>> {
        self.dir
            .iter()
            .find_map(|e| e.try_parse_camera_params(&self.data).transpose())
            .transpose()
    }
}

/// Collect FLIR data from Jpeg APP1 segments.
///
/// Each segment is laid out as:
///
/// - 0x0: signature: "FLIR\0"
/// - 0x6: segment number: zero-based idx
/// - 0x7: last segment number (= total segments - 1)
/// - 0x8..: data
fn collect_flir_segment_data_from_jpeg(image: &Jpeg) -> Result<Vec<u8>> {
    let mut parts: Vec<Option<Vec<u8>>> = vec![];

    for segment in image.segments_by_marker(markers::APP1) {
        let contents = segment.contents();
        if contents.len() < 8 || &contents[0..5] != b"FLIR\0" {
            continue;
        }

        let idx = contents[6] as usize;
        let total = contents[7] as usize + 1;
        if parts.is_empty() {
            parts.resize(total, None);
        }
        ensure!(
            parts.len() == total,
            "inconsistent count of FLIR segments: {} != {}",
            parts.len(),
            total
        );
        ensure!(idx < total, "FLIR segment idx out of bounds: {} >= {}", idx, total);
        ensure!(parts[idx].is_none(), "duplicate FLIR segment: idx = {}", idx);
        parts[idx] = Some(contents[8..].to_vec());
    }

    ensure!(!parts.is_empty(), "no FLIR segments found");
    let found = parts.iter().filter(|p| p.is_some()).count();
    ensure!(
        found == parts.len(),
        "expected {} FLIR segments, found only {}",
        parts.len(),
        found
    );

    Ok(parts.into_iter().flatten().flatten().collect())
}

parseable_struct! {
    struct FffHeader {
        format: [u8; 4],
        creator: [u8; 16],
        version: u32,
        dir_offset: u32,
        num_entries: u32,
    }
}

// The file format version reads as 1xx in the byte order of
// the file.
fn fff_byte_order(data: &[u8]) -> Result<Endianness> {
    let hdr = FffHeader::parse(&mut ByteOrdered::le(data)).context("reading FFF header")?;
    ensure!(&hdr.format == b"FFF\0", "unexpected signature in FLIR segment");
    Ok(if (100..200).contains(&hdr.version) {
        Endianness::Little
    } else {
        Endianness::Big
    })
}

fn parse_flir_directory(data: &[u8]) -> Result<Vec<FlirRecordDirEntry>> {
    let order = fff_byte_order(data)?;
    let hdr = FffHeader::parse(&mut ByteOrdered::runtime(data, order))?;

    let mut dir = ByteOrdered::runtime(
        data.get(hdr.dir_offset as usize..)
            .ok_or_else(|| anyhow!("FFF record directory out of bounds"))?,
        order,
    );
    (0..hdr.num_entries)
        .map(|_| FlirRecordDirEntry::parse(&mut dir))
        .collect()
}

// Records that carry their own byte order start with a
// 16-bit word reading 2 in little endian.
fn record_byte_order(record: &[u8]) -> Result<Endianness> {
    Ok(if u16::parse(&mut ByteOrdered::le(record))? == 2 {
        Endianness::Little
    } else {
        Endianness::Big
    })
}

parseable_struct! {
    #[derive(Debug)]
    pub struct FlirRecordDirEntry {
        ty: u16,
        sub_type: u16,
        version: u32,
        id: u32,
        offset: u32,
        length: u32,
        parent: u32,
        obj_num: u32,
        checksum: u32,
    }
}

impl FlirRecordDirEntry {
    fn data<'a>(&self, segment: &'a [u8]) -> Result<&'a [u8]> {
        let start = self.offset as usize;
        segment
            .get(start..start + self.length as usize)
            .ok_or_else(|| anyhow!("unexpected end of FLIR segment while reading record"))
    }

    fn try_parse_raw_data(&self, segment: &[u8]) -> Result<Option<Array2<u16>>> {
        if self.ty != RAW_DATA_RECORD {
            return Ok(None);
        }
        let data = self.data(segment)?;
        ensure!(
            data.len() >= 0x20,
            "raw data record too short: {} bytes",
            data.len()
        );

        let order = record_byte_order(data)?;
        let mut rdr = ByteOrdered::runtime(&data[2..], order);
        let width = u16::parse(&mut rdr)? as usize;
        let height = u16::parse(&mut rdr)? as usize;

        if self.sub_type == 3 {
            let frame = decode_flir_png(&data[0x20..])?;
            ensure!(
                frame.dim() == (height, width),
                "PNG raw data is {:?}, record says {}x{}",
                frame.dim(),
                width,
                height
            );
            return Ok(Some(frame));
        }

        let expected = 0x20 + 2 * width * height;
        ensure!(
            data.len() == expected,
            "raw data record size mismatch: expected {} bytes, found {}",
            expected,
            data.len()
        );

        let mut rdr = ByteOrdered::runtime(Cursor::new(&data[0x20..]), order);
        let values = (0..width * height)
            .map(|_| u16::parse(&mut rdr))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Array2::from_shape_vec((height, width), values)?))
    }

    fn try_parse_camera_params(&self, segment: &[u8]) -> Result<Option<FlirCameraParams>> {
        if self.ty != CAMERA_INFO_RECORD {
            return Ok(None);
        }
        let data = self.data(segment)?;
        ensure!(
            data.len() >= 0x384,
            "camera info record too short: expected at least {} bytes, found {}",
            0x384,
            data.len()
        );

        let order = record_byte_order(data)?;
        let temperature_params =
            FlirTemperatureParams::parse(&mut ByteOrdered::runtime(&data[0x20..], order))?;
        let extra_params =
            FlirExtraParams::parse(&mut ByteOrdered::runtime(&data[0x308..], order))?;
        Ok(Some(FlirCameraParams {
            temperature_params,
            extra_params,
        }))
    }
}

#[derive(Debug)]
pub struct FlirCameraParams {
    temperature_params: FlirTemperatureParams,
    extra_params: FlirExtraParams,
}

parseable_struct! {
    // Temperatures in kelvin.
    #[derive(Debug)]
    pub struct FlirTemperatureParams {
        emissivity: f32,
        object_distance: f32,
        reflected_apparent_temperature: f32,
        atmospheric_temperature: f32,
        ir_window_temperature: f32,
        ir_window_transmission: f32,
        _reserved: u32,
        relative_humidity: f32,
        _reserved_1: [u32; 6],
        planck_r1: f32,
        planck_b: f32,
        planck_f: f32,
        _reserved_2: [u32; 3],
        atmospheric_trans_alpha_1: f32,
        atmospheric_trans_alpha_2: f32,
        atmospheric_trans_beta_1: f32,
        atmospheric_trans_beta_2: f32,
        atmospheric_trans_x: f32,
    }
}

parseable_struct! {
    #[derive(Debug)]
    pub struct FlirExtraParams {
        planck_o: i32,
        planck_r2: f32,
    }
}

impl From<&FlirCameraParams> for CameraMetadata {
    fn from(params: &FlirCameraParams) -> Self {
        let t = &params.temperature_params;
        let x = &params.extra_params;

        // Stored as a fraction by most cameras, as percent by
        // a few.
        let rh = t.relative_humidity as f64;
        let rh = if rh > 2. { rh } else { rh * 100. };

        CameraMetadata::default()
            .with(MetadataTag::Emissivity, t.emissivity as f64)
            .with(MetadataTag::ObjectDistance, t.object_distance as f64)
            .with(
                MetadataTag::ReflectedApparentTemperature,
                t.reflected_apparent_temperature as f64 - CELSIUS_OFFSET,
            )
            .with(
                MetadataTag::AtmosphericTemperature,
                t.atmospheric_temperature as f64 - CELSIUS_OFFSET,
            )
            .with(MetadataTag::RelativeHumidity, rh)
            .with(MetadataTag::PlanckR1, t.planck_r1 as f64)
            .with(MetadataTag::PlanckB, t.planck_b as f64)
            .with(MetadataTag::PlanckF, t.planck_f as f64)
            .with(MetadataTag::PlanckO, x.planck_o as f64)
            .with(MetadataTag::PlanckR2, x.planck_r2 as f64)
            .with(
                MetadataTag::AtmosphericTransAlpha1,
                t.atmospheric_trans_alpha_1 as f64,
            )
            .with(
                MetadataTag::AtmosphericTransAlpha2,
                t.atmospheric_trans_alpha_2 as f64,
            )
            .with(
                MetadataTag::AtmosphericTransBeta1,
                t.atmospheric_trans_beta_1 as f64,
            )
            .with(
                MetadataTag::AtmosphericTransBeta2,
                t.atmospheric_trans_beta_2 as f64,
            )
            .with(MetadataTag::AtmosphericTransX, t.atmospheric_trans_x as f64)
    }
}

/// Raw frame and metadata from the FLIR segments of `image`.
pub(crate) fn parse_rjpeg(image: &Jpeg) -> Result<(Array2<u16>, CameraMetadata)> {
    let segment = FlirSegment::try_from_jpeg(image)?;
    let raw = segment
        .try_parse_raw_data()?
        .ok_or_else(|| anyhow!("no raw data found"))?;
    let params = match segment.try_parse_camera_params()? {
        Some(params) => params,
        None => bail!("no camera params found"),
    };
    Ok((raw, (&params).into()))
}
