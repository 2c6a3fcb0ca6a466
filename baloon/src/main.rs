//! Point d'entrée CLI pour baloon

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

use baloon::Config;

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Convertir des contours BLN vers GeoJSON, Shapefile, GeoPackage, KML ou SVG
#[derive(Parser)]
#[command(name = "baloon")]
#[command(author, version)]
#[command(about = "Convert BLN polygon boundaries to GeoJSON, Shapefile, GeoPackage, KML and SVG")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON (défaut: $BALOON_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    let config = Config::resolve(cli.config.as_deref())?;
    debug!(config = ?config, "Configuration loaded");

    match cli.command {
        Commands::Convert { input, to, out } => {
            cli::cmd_convert(&config, &input, &to, out.as_deref())?;
        }
        Commands::Batch {
            dir,
            to,
            out,
            jobs,
            report,
        } => {
            cli::cmd_batch(
                &config,
                &dir,
                &to,
                out.as_deref(),
                jobs,
                report.as_deref(),
            )?;
        }
        Commands::Formats => cli::cmd_formats(),
        Commands::Inspect { input } => cli::cmd_inspect(&input)?,
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
