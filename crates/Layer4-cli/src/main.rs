//! Hotswap CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use hotswap_foundation::HotswapConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Hotswap - online classifiers retrained behind a hot swap
#[derive(Parser, Debug)]
#[command(name = "hotswap")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Data directory (overrides config dataDir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the classifier slot for a job
    Init {
        #[arg(long)]
        job: u64,

        /// Backend kind (defaults to config defaultBackend)
        #[arg(long)]
        backend: Option<String>,
    },
    /// Show the slot record of a job
    Show {
        #[arg(long)]
        job: u64,
    },
    /// List all slot records
    List,
    /// Train the standby instance and swap it in
    Train {
        #[arg(long)]
        job: u64,

        /// JSON array of samples: [{"text": "...", "label": "..."}]
        #[arg(long)]
        samples: PathBuf,

        /// Incremental update instead of a full retrain
        #[arg(long)]
        update: bool,
    },
    /// Classify a text with the serving instance
    Classify {
        #[arg(long)]
        job: u64,

        #[arg(long)]
        text: String,

        /// Print backend metadata as well
        #[arg(long)]
        info: bool,
    },
    /// Performance report of the serving instance
    Analyze {
        #[arg(long)]
        job: u64,
    },
    /// Swap roles without training
    Switch {
        #[arg(long)]
        job: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load configuration
    let mut config = HotswapConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        HotswapConfig::default()
    });
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    let app = cli::App::open(&config)?;

    match args.command {
        Command::Init { job, backend } => app.init(job, backend.as_deref()),
        Command::Show { job } => app.show(job),
        Command::List => app.list(),
        Command::Train {
            job,
            samples,
            update,
        } => app.train(job, &samples, update).await,
        Command::Classify { job, text, info } => app.classify(job, &text, info).await,
        Command::Analyze { job } => app.analyze(job).await,
        Command::Switch { job } => app.switch(job).await,
    }
}
