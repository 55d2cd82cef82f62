use anyhow::Result;
use clap::{value_t_or_exit, ArgMatches};
use std::path::PathBuf;
use radiometric::{arg, args_parser, cli::InputKind, opt, EnvironmentOverrides};

pub struct Args {
    pub path: PathBuf,
    pub kind: InputKind,
    pub overrides: EnvironmentOverrides,
    pub output: Option<PathBuf>,
    pub copy_metadata: bool,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("rjpeg2tiff")
            .setting(clap::AppSettings::AllowLeadingHyphen)
            .about("Convert a radiometric R-JPEG into a 32-bit float temperature TIFF.")
            .arg(
                opt!("json")
                    .short("j")
                    .takes_value(false)
                    .conflicts_with("exiftool")
                    .help("Path is a json created using `exiftool -j -b` (default: path is an rjpeg)"),
            )
            .arg(
                opt!("exiftool")
                    .takes_value(false)
                    .help("Read the image metadata by running exiftool"),
            )
            .arg(
                opt!("emissivity")
                    .short("e")
                    .help("Object emissivity (default: from metadata)"),
            )
            .arg(
                opt!("distance")
                    .short("d")
                    .help("Object distance in meters (default: from metadata)"),
            )
            .arg(
                opt!("ambient temperature")
                    .help("Atmospheric temperature in celsius (default: from metadata)"),
            )
            .arg(
                opt!("reflected temperature")
                    .help("Reflected apparent temperature in celsius (default: from metadata)"),
            )
            .arg(
                opt!("relative humidity")
                    .help("Relative humidity in percent (default: from metadata)"),
            )
            .arg(
                opt!("output")
                    .short("o")
                    .help("Output directory (default: next to the input)"),
            )
            .arg(
                opt!("no copy metadata")
                    .short("n")
                    .takes_value(false)
                    .help("Do not copy metadata from the source image to the tiff (copying requires exiftool)"),
            )
            .arg(arg!("image").required(true).help("Image / json path"))
            .get_matches();

        let path = value_t_or_exit!(matches, "image", PathBuf);
        let kind = if matches.is_present("json") {
            InputKind::ExiftoolJson
        } else if matches.is_present("exiftool") {
            InputKind::Exiftool
        } else {
            InputKind::RJpeg
        };

        let overrides = EnvironmentOverrides {
            emissivity: optional_f64(&matches, "emissivity"),
            distance: optional_f64(&matches, "distance"),
            ambient_temperature: optional_f64(&matches, "ambient temperature"),
            reflected_temperature: optional_f64(&matches, "reflected temperature"),
            relative_humidity: optional_f64(&matches, "relative humidity"),
        };
        let output = matches
            .is_present("output")
            .then(|| value_t_or_exit!(matches, "output", PathBuf));
        let copy_metadata = !matches.is_present("no copy metadata");

        Ok(Args {
            path,
            kind,
            overrides,
            output,
            copy_metadata,
        })
    }
}

fn optional_f64(matches: &ArgMatches, name: &str) -> Option<f64> {
    matches
        .is_present(name)
        .then(|| value_t_or_exit!(matches, name, f64))
}
