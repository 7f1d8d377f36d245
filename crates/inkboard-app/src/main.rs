//! InkBoard command-line entry point.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inkboard_app::{AppConfig, ExportFormat, Session, confirm, parse_script};
use inkboard_core::storage::FileStorage;
use inkboard_core::{DEFAULT_CACHE_KEY, PersistenceGateway, Storage, create_default_storage};
use kurbo::Size;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "inkboard", about = "Whiteboard with undo/redo history", version)]
struct Cli {
    /// Directory for cached boards
    #[arg(long, env = "INKBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Cache key of the board
    #[arg(short, long, env = "INKBOARD_CACHE_KEY", default_value = DEFAULT_CACHE_KEY)]
    key: String,

    /// Board width in pixels
    #[arg(long, default_value_t = 800.0)]
    width: f64,

    /// Board height in pixels
    #[arg(long, default_value_t = 600.0)]
    height: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an edit script against the board
    Run {
        /// JSON script file
        script: PathBuf,
    },
    /// Export the board
    Export {
        #[arg(short, long, value_enum, default_value = "png")]
        format: ExportFormat,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Delete the cached board and its history
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List cached boards
    Keys,
}

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Starting InkBoard");

    let cli = Cli::parse();
    let config = AppConfig {
        data_dir: cli.data_dir,
        cache_key: cli.key,
        size: Size::new(cli.width, cli.height),
        ..Default::default()
    };

    let storage = match &config.data_dir {
        Some(dir) => Arc::new(FileStorage::new(dir.clone()).context("failed to open data directory")?),
        None => create_default_storage().context("failed to open default storage")?,
    };

    match cli.command {
        Commands::Run { script } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("failed to read {}", script.display()))?;
            let commands = parse_script(&text)?;

            let mut session = Session::open(&config, storage)?;
            let result = session.run(&commands);
            session.close()?;
            let outcomes = result?;
            println!("Applied {} commands", outcomes.len());
        }
        Commands::Export { format, out } => {
            let session = Session::open(&config, storage)?;
            let artifact = session.export(format);
            session.close()?;
            let path = artifact?.write_to(&out)?;
            println!("{}", path.display());
        }
        Commands::Reset { yes } => {
            if !storage.exists(&config.cache_key)? {
                bail!("no board named '{}'", config.cache_key);
            }
            let question = format!("Reset board '{}'? This cannot be undone.", config.cache_key);
            if !yes && !confirm(&question, std::io::stdin().lock(), std::io::stdout())? {
                println!("Cancelled");
                return Ok(());
            }
            let mut session = Session::open(&config, storage)?;
            let result = session.reset();
            session.close()?;
            result?;
            println!("Reset '{}'", config.cache_key);
        }
        Commands::Keys => {
            let gateway = PersistenceGateway::new(storage, config.history.extra_props.clone());
            for key in gateway.list_keys()? {
                println!("{}", key);
            }
        }
    }

    Ok(())
}
