//! Helpers for the accompanying binary: argument parsing,
//! input loading and logging setup.
//!
//! APIs here shouldn't be considered stable / used as a
//! library.

use std::{
    convert::TryFrom,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Result;
pub use clap::{App, Arg};
pub use inflector::Inflector;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{ThermalExiftoolJson, ThermalImage};

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::App::new($name)
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
    }};
}

#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .value_name(&$name.to_screaming_snake_case())
    }};
}

/// How the input path is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// An R-JPEG, parsed natively.
    RJpeg,
    /// A json file written by `exiftool -j -b`.
    ExiftoolJson,
    /// An image handed to `exiftool -j -b`.
    Exiftool,
}

pub struct ThermalInput {
    /// The source image. For exiftool json this is its
    /// `SourceFile`, if recorded.
    pub source: PathBuf,
    /// The image to copy metadata from, if known.
    pub metadata_source: Option<PathBuf>,
    pub image: ThermalImage,
}

impl ThermalInput {
    pub fn load(path: &Path, kind: InputKind) -> Result<Self> {
        debug!(?kind, "loading {}", path.display());
        let (metadata_source, image) = match kind {
            InputKind::RJpeg => (Some(path.to_owned()), ThermalImage::try_from_rjpeg_path(path)?),
            InputKind::Exiftool => (Some(path.to_owned()), ThermalImage::try_from_exiftool(path)?),
            InputKind::ExiftoolJson => {
                let json = ThermalExiftoolJson::from_reader(BufReader::new(File::open(path)?))?;
                let source = json.source_file.clone().map(PathBuf::from);
                (source, ThermalImage::try_from(json)?)
            }
        };
        Ok(ThermalInput {
            source: metadata_source.clone().unwrap_or_else(|| path.to_owned()),
            metadata_source,
            image,
        })
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
