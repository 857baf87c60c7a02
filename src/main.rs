use clap::{Parser, Subcommand};
use fieldproof::config::{self, StampConfig};
use fieldproof::geolocation::{FixedPosition, NoPosition, PositionSource};
use fieldproof::imaging::read_orientation;
use fieldproof::output;
use fieldproof::pipeline::PipelineSupervisor;
use fieldproof::scoring::{self, RatingSheet};
use fieldproof::types::{CaptureContext, Coordinates, RawCapture};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fieldproof")]
#[command(version, about = "Stamp inspection photos and score inspections")]
#[command(long_about = "\
Stamp inspection photos and score inspections

A stamped photo carries its evidence in the pixels: location name, local
capture time, and street address (or raw GPS when no address could be found)
in a box bottom-left, plus a branding mark top-right. The photo is oriented
upright, downscaled, and re-encoded. If any step fails or runs out of time
the photo is still written, at worst unmodified.

Config is read from ./fieldproof.toml when present, or from --config.
Run 'fieldproof gen-config' to generate a documented config file.

Logging goes to stderr; set RUST_LOG (e.g. RUST_LOG=fieldproof=debug).")]
struct Cli {
    /// Config file (default: ./fieldproof.toml if it exists)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct StampArgs {
    /// Captured photo
    input: PathBuf,

    /// Where to write the stamped photo
    #[arg(long, short)]
    output: PathBuf,

    /// Location name for the first watermark line
    #[arg(long)]
    location: String,

    /// Capture time as RFC 3339 (default: now, local time)
    #[arg(long)]
    timestamp: Option<String>,

    /// Organization the capture belongs to
    #[arg(long, default_value = "")]
    organization: String,

    /// Latitude of the capture
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of the capture
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Position accuracy radius in meters
    #[arg(long, requires = "lat")]
    accuracy: Option<f64>,

    /// Skip reverse geocoding; show raw coordinates
    #[arg(long)]
    no_geocode: bool,

    /// Print the full result as JSON instead of the summary
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Orient, watermark, downscale, and re-encode a photo
    Stamp(StampArgs),
    /// Print the EXIF orientation code (1-8) of a JPEG
    Orientation {
        /// Photo to inspect
        input: PathBuf,
    },
    /// Score a file of component ratings
    Score {
        /// TOML file with [[ratings]] entries
        ratings: PathBuf,
    },
    /// Print a stock fieldproof.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Stamp(args) => {
            let mut config = load_config(cli.config.as_deref())?;
            if args.no_geocode {
                config.geocoding.enabled = false;
            }
            stamp(args, &config).await?;
        }
        Command::Orientation { input } => {
            let bytes = std::fs::read(&input)?;
            println!("{}", read_orientation(&bytes).code());
        }
        Command::Score { ratings } => {
            let config = load_config(cli.config.as_deref())?;
            let content = std::fs::read_to_string(&ratings)?;
            let sheet: RatingSheet = toml::from_str(&content)?;
            let weights = &config.scoring.weights;
            let score = scoring::score(&sheet.ratings, weights);
            let breakdown = scoring::category_breakdown(&sheet.ratings, weights);
            output::print_score(&score, &breakdown);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

async fn stamp(args: StampArgs, config: &StampConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.input)?;
    let mime_type = image::ImageFormat::from_path(&args.input)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string());

    let position: Arc<dyn PositionSource> = match (args.lat, args.lon) {
        (Some(latitude), Some(longitude)) => Arc::new(FixedPosition(Coordinates {
            latitude,
            longitude,
            accuracy_m: args.accuracy,
        })),
        _ => Arc::new(NoPosition),
    };

    let context = CaptureContext {
        location_name: args.location,
        timestamp_iso: args.timestamp.unwrap_or_else(|| {
            chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
        }),
        organization_id: args.organization,
    };

    let supervisor = PipelineSupervisor::from_config(config, position)?;
    let photo = supervisor
        .run(RawCapture::new(bytes, mime_type), &context)
        .await;

    std::fs::write(&args.output, &photo.bytes)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&photo)?);
    } else {
        output::print_stamp_report(&photo, &args.output);
    }
    Ok(())
}

/// Explicit `--config` must exist; otherwise `./fieldproof.toml` is optional.
fn load_config(path: Option<&Path>) -> Result<StampConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}
