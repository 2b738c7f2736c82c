//! Convert an `.osm` file into a JSON scene
//!
//! Usage:
//!   osm_scene <input.osm> [--output scene.json] [--config config.json] [--allow-large]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use osm_scene::config::ConversionConfig;
use osm_scene::conversion::{ConversionLog, Converter, Phase, ProgressListener};
use osm_scene::error::ConversionError;
use osm_scene::export::write_scene_json;
use osm_scene::osm::parse_osm_file;

#[derive(Parser, Debug)]
#[command(name = "osm_scene", version)]
struct Args {
    /// Input `.osm` XML file
    input: PathBuf,

    /// Output JSON scene
    #[arg(long, short, default_value = "scene.json")]
    output: PathBuf,

    /// Conversion configuration as JSON; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Convert inputs larger than the configured bounds limit
    #[arg(long, default_value_t = false)]
    allow_large: bool,
}

struct PhaseLogger;

impl ProgressListener for PhaseLogger {
    fn phase_started(&self, phase: Phase) {
        log::info!("[Phase] {:?}", phase);
    }
}

fn load_config(args: &Args) -> Result<ConversionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            ConversionConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ConversionConfig::default(),
    };
    if args.allow_large {
        config.fail_on_large_bbox = false;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let osm = parse_osm_file(&args.input)?;

    let mut converter = Converter::new(config);
    converter.add_listener(Box::new(PhaseLogger));
    let log = ConversionLog::new();

    let result = match converter.convert(&osm, &log) {
        Err(ConversionError::BoundsTooLarge(e)) => {
            anyhow::bail!("{} (use --allow-large to convert anyway)", e)
        }
        other => other.context("Conversion failed")?,
    };
    if let Some(e) = &result.elevation_error {
        log::warn!("{}", e);
    }

    write_scene_json(&result.meshes, &args.output)?;
    println!(
        "{} meshes written to {} ({} conversion warnings/errors)",
        result.meshes.len(),
        args.output.display(),
        log.len()
    );
    Ok(())
}
