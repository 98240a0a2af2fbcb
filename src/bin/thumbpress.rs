use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context as _};
use clap::{ArgGroup, Parser};
use image::{DynamicImage, RgbaImage};
use thumbpress::{compose, RasterEngine, RawPlacements, Size};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "thumbpress", version, about)]
#[command(group(ArgGroup::new("base_image").required(true).args(["base", "canvas"])))]
struct Cli {
    /// Base image to composite onto.
    #[arg(long)]
    base: Option<PathBuf>,

    /// Composite onto a blank transparent canvas of this size instead, e.g. `1280x720`.
    #[arg(long, value_parser = parse_canvas)]
    canvas: Option<Size>,

    /// Placement file: a JSON object of area name to area record, in paint order.
    #[arg(long)]
    placements: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Only report warnings and errors.
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Report per-area progress and font size search steps.
    #[arg(long, short)]
    verbose: bool,
}

fn parse_canvas(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("canvas must not be empty, got '{s}'"));
    }
    Ok(Size::new(w, h))
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), default_level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_base(cli: &Cli) -> anyhow::Result<DynamicImage> {
    if let Some(path) = &cli.base {
        return image::open(path).with_context(|| format!("open base image '{}'", path.display()));
    }
    if let Some(size) = cli.canvas {
        return Ok(DynamicImage::ImageRgba8(RgbaImage::new(size.width, size.height)));
    }
    bail!("either --base or --canvas is required")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let started = Instant::now();
    let engine = RasterEngine;

    let raw = RawPlacements::from_path(&cli.placements)
        .with_context(|| format!("read placements '{}'", cli.placements.display()))?;
    let placements = raw
        .normalize(&engine)
        .with_context(|| format!("validate placements '{}'", cli.placements.display()))?;
    info!(areas = placements.len(), "loaded placements");

    let base = load_base(&cli)?;
    let out = compose(base, &placements, &engine).context("composite placements")?;
    out.save(&cli.out)
        .with_context(|| format!("write '{}'", cli.out.display()))?;

    info!(
        out = %cli.out.display(),
        width = out.width(),
        height = out.height(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "wrote image"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canvas_sizes() {
        assert_eq!(parse_canvas("1280x720"), Ok(Size::new(1280, 720)));
        assert_eq!(parse_canvas("64X32"), Ok(Size::new(64, 32)));
        assert!(parse_canvas("0x10").is_err());
        assert!(parse_canvas("wide").is_err());
    }

    #[test]
    fn base_or_canvas_is_required() {
        assert!(Cli::try_parse_from(["thumbpress", "--placements", "p.json", "--out", "o.png"]).is_err());
        let cli = Cli::try_parse_from([
            "thumbpress",
            "--canvas",
            "10x10",
            "--placements",
            "p.json",
            "--out",
            "o.png",
        ])
        .unwrap();
        assert_eq!(cli.canvas, Some(Size::new(10, 10)));
    }
}
