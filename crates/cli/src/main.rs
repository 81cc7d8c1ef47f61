use std::path::PathBuf;
use std::time::Duration;

use crate::prelude::*;
use clap::Parser;

mod batch;
mod config;
mod document;
mod error;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract a title and an H1/H2/H3 outline from PDF files"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML file overriding the default classifier thresholds
    #[clap(long, env = "PDF_OUTLINE_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Process every PDF in a directory into one JSON file
    Batch(batch::BatchOptions),

    /// Print the outline of a single PDF
    Extract {
        /// Path to the PDF file
        path: PathBuf,

        /// Include the leveled `outline` array
        #[arg(long)]
        levels: bool,
    },

    /// Print document metadata
    Info {
        /// Path to the PDF file
        path: PathBuf,
    },

    /// Print the effective thresholds as TOML
    Thresholds,
}

async fn run(app: App) -> Result<()> {
    let config_path = app.global.config.as_deref();
    match app.command {
        SubCommands::Batch(options) => {
            batch::run(options, config::load_thresholds(config_path)?).await
        }
        SubCommands::Extract { path, levels } => {
            document::extract(&path, levels, &config::load_thresholds(config_path)?)
        }
        SubCommands::Info { path } => document::info(&path),
        SubCommands::Thresholds => config::print(&config::load_thresholds(config_path)?),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(app));
    // Extractions abandoned after a timeout may still hold blocking threads.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}
