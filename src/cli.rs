use std::path::PathBuf;
use std::time::Duration;

use clap::builder::{styling::AnsiColor, Styles};
use clap::Parser;

use crate::openweather::{Coordinate, BASE_URL};

const ABOUT: &str = "OpenWeatherMap weather TUI";

const LONG_ABOUT: &str = "
TUI for viewing current conditions and a 5-day forecast from OpenWeatherMap.

An OpenWeatherMap API key is required, either with --api-key or through the OPENWEATHER_API_KEY
environment variable.

The starting location is taken from --lat/--lon, or looked up from --city. Without either, the
location is unavailable and only the search box can pick a place.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(
        long,
        env = "OPENWEATHER_API_KEY",
        hide_env_values = true,
        help = "OpenWeatherMap API key"
    )]
    pub api_key: Option<String>,

    #[arg(
        long,
        requires = "lon",
        allow_negative_numbers = true,
        value_parser = parse_latitude,
        help = "Latitude of the device position"
    )]
    pub lat: Option<f64>,

    #[arg(
        long,
        requires = "lat",
        allow_negative_numbers = true,
        value_parser = parse_longitude,
        help = "Longitude of the device position"
    )]
    pub lon: Option<f64>,

    #[arg(
        long,
        conflicts_with_all = ["lat", "lon"],
        help = "Use this place as the device position (e.g. \"Madison, US\")"
    )]
    pub city: Option<String>,

    #[arg(
        long,
        default_value_t = 10,
        help = "Seconds to wait for a position on an explicit location request"
    )]
    pub location_timeout: u64,

    #[arg(long, default_value = BASE_URL, hide = true)]
    pub base_url: String,

    #[arg(long, help = "Print a plain-text report and exit")]
    pub plain: bool,

    #[arg(long, help = "Write logs to this file (filter with RUST_LOG)")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout)
    }
}

fn parse_latitude(s: &str) -> Result<f64, String> {
    parse_degrees(s, 90.0)
}

fn parse_longitude(s: &str) -> Result<f64, String> {
    parse_degrees(s, 180.0)
}

fn parse_degrees(s: &str, limit: f64) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if value.is_finite() && value.abs() <= limit {
        Ok(value)
    } else {
        Err(format!("must be between -{limit} and {limit}"))
    }
}
