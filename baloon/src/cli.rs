//! Définition et implémentation des commandes CLI
//!
//! - `convert`: un fichier vers un ou plusieurs formats
//! - `batch`: une arborescence de fichiers BLN
//! - `formats`: formats disponibles
//! - `inspect`: résumé d'un fichier BLN

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use geo::{BoundingRect, Coord, LineString};
use tracing::info;

use baloon::{batch, convert, registry, Config};

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a file to one or more formats
    Convert {
        /// Input file (BLN or any readable format)
        input: PathBuf,

        /// Target format extension, repeatable (default: geojson)
        #[arg(short = 't', long = "to")]
        to: Vec<String>,

        /// Output directory (default: next to the input)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Convert every .bln file under a directory
    Batch {
        /// Directory scanned recursively
        dir: PathBuf,

        /// Target format extension, repeatable (default: geojson)
        #[arg(short = 't', long = "to")]
        to: Vec<String>,

        /// Output directory, relative structure preserved
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Maximum number of files converted concurrently
        #[arg(short, long, alias = "threads")]
        jobs: Option<usize>,

        /// Save the conversion report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List available formats
    Formats,

    /// Show a summary of a BLN file
    Inspect {
        /// BLN file
        input: PathBuf,
    },
}

/// Exécute la commande convert
pub fn cmd_convert(config: &Config, input: &Path, to: &[String], out: Option<&Path>) -> Result<()> {
    let targets = config.targets(to);
    let out = out.or(config.output_dir.as_deref());

    info!(input = %input.display(), targets = ?targets, "Converting");

    let outcomes = convert::convert(input, &targets, out)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => println!("✓ {} -> {}", outcome.extension, outcome.output.display()),
            Err(e) => println!("✗ {}: {}", outcome.extension, e),
        }
    }

    Ok(())
}

/// Exécute la commande batch
pub fn cmd_batch(
    config: &Config,
    dir: &Path,
    to: &[String],
    out: Option<&Path>,
    jobs: Option<usize>,
    report_path: Option<&Path>,
) -> Result<()> {
    let targets = config.targets(to);
    let out = out.or(config.output_dir.as_deref());
    let jobs = jobs.or(config.jobs);

    let report = batch::convert_tree(dir, &targets, out, jobs)
        .with_context(|| format!("Batch conversion failed for {}", dir.display()))?;

    report.display();
    println!("{}", report.summary());

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report saved");
    }

    Ok(())
}

/// Exécute la commande formats
pub fn cmd_formats() {
    let mark = |supported: bool| if supported { "✓" } else { "-" };

    println!(
        "{:<12} {:<16} {:<5} {:<5} {}",
        "FORMAT", "EXTENSIONS", "READ", "WRITE", "DESCRIPTION"
    );
    for descriptor in registry::list_formats() {
        println!(
            "{:<12} {:<16} {:<5} {:<5} {}",
            descriptor.name,
            descriptor.extensions.join(", "),
            mark(descriptor.can_decode()),
            mark(descriptor.can_encode()),
            descriptor.description
        );
    }
}

/// Exécute la commande inspect
pub fn cmd_inspect(input: &Path) -> Result<()> {
    let points = bln::parse_path(input)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Points: {}", points.len());

    let line: LineString = points.iter().map(|p| Coord::from(*p)).collect();
    if let Some(bounds) = line.bounding_rect() {
        println!(
            "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
            bounds.min().x,
            bounds.min().y,
            bounds.max().x,
            bounds.max().y
        );
        println!("Width: {:.6}, Height: {:.6}", bounds.width(), bounds.height());
    }

    println!("First coordinates:");
    for p in points.iter().take(5) {
        println!("  {}, {}", p.x, p.y);
    }
    if points.len() > 5 {
        println!("  ... and {} more", points.len() - 5);
    }

    Ok(())
}
