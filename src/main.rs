use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use well_segment::depth::parse_depth;
use well_segment::{MatchParams, Segment, SegmentOptions};

/// Inspect a well segment, register its core photographs and match core depths
/// against the wireline log.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Segment directory (contains meta.json)
    segment: PathBuf,

    /// Slice top, e.g. `1500m` or `150000cm`
    #[arg(long)]
    from: Option<String>,

    /// Slice bottom
    #[arg(long)]
    to: Option<String>,

    /// Match core logs against wireline logs
    #[arg(long = "match")]
    match_logs: bool,

    /// JSON file with match parameters (defaults otherwise)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Log mnemonic to match on, overrides the parameter file
    #[arg(long)]
    mnemonic: Option<String>,

    /// Write the registered daylight/ultraviolet images as PNG into this directory
    #[arg(long)]
    core_images: Option<PathBuf>,

    #[arg(long, default_value_t = SegmentOptions::default().core_width)]
    core_width: u32,

    #[arg(long, default_value_t = SegmentOptions::default().pixels_per_cm)]
    pixels_per_cm: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut segment = Segment::open(&args.segment)
        .with_context(|| format!("opening segment {}", args.segment.display()))?;
    segment.set_options(SegmentOptions {
        core_width: args.core_width,
        pixels_per_cm: args.pixels_per_cm,
    })?;

    if args.from.is_some() || args.to.is_some() {
        let from = match &args.from {
            Some(text) => parse_depth(text)?,
            None => segment.depth_from(),
        };
        let to = match &args.to {
            Some(text) => parse_depth(text)?,
            None => segment.depth_to(),
        };
        segment = segment.slice(from, to)?;
    }
    info!(
        "segment {} ({}) [{}, {}) cm",
        segment.name(),
        segment.field(),
        segment.depth_from(),
        segment.depth_to()
    );

    if args.match_logs {
        let mut params = match &args.params {
            Some(path) => MatchParams::read(path)
                .with_context(|| format!("reading match parameters {}", path.display()))?,
            None => MatchParams::default(),
        };
        if let Some(mnemonic) = args.mnemonic {
            params.mnemonic = mnemonic;
        }

        let before = segment.matching_r2(&params.mnemonic)?;
        let report = segment.match_core_logs(&params)?;
        let after = segment.matching_r2(&params.mnemonic)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        println!(
            "R² {}: {} → {}",
            params.mnemonic,
            fmt_r2(before),
            fmt_r2(after)
        );
    }

    if let Some(dir) = &args.core_images {
        std::fs::create_dir_all(dir).context("creating output directory")?;
        let images = segment.core_images()?;
        images.dl.save_png(&dir.join(format!("{}_dl.png", segment_stem(&args.segment))))?;
        images.uv.save_png(&dir.join(format!("{}_uv.png", segment_stem(&args.segment))))?;
        info!("wrote core images of shape {:?} to {}", images.shape(), dir.display());
    }

    Ok(())
}

fn fmt_r2(r2: Option<f64>) -> String {
    r2.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

fn segment_stem(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("segment")
        .to_string()
}
