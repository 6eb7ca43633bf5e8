use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use photolog_kernel::adapters::unsplash::UnsplashPhoto;
use photolog_kernel::config::{ConfigOverrides, ServerConfig};
use photolog_kernel::http::{self, AppState};
use photolog_kernel::log::{FileHistoryStore, HistoryStore, InMemoryHistoryStore};

/// Photolog image history service
#[derive(Parser, Debug)]
#[command(name = "photolog")]
#[command(about = "Persistent history of fetched images", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP history service
    Serve(ServeArgs),

    /// Print the stored history as JSON
    List(DataArgs),

    /// Append a record built from an Unsplash photo JSON file
    Add {
        /// Path to the photo JSON returned by Unsplash
        #[arg(long)]
        photo: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Print the record fetched before the given image
    Previous {
        #[arg(long)]
        image_url: String,

        #[command(flatten)]
        data: DataArgs,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to server config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long)]
    address: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// History backing file
    #[arg(long)]
    data: Option<PathBuf>,

    /// Answer 500 when the store fails instead of pretending success
    #[arg(long)]
    strict: bool,

    /// Keep history in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[derive(Args, Debug)]
struct DataArgs {
    /// History backing file
    #[arg(long, default_value = "public/data/data.json")]
    data: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug {
        "photolog=debug,photolog_kernel=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::List(data) => {
            let log = FileHistoryStore::new(data.data).try_load()?;
            println!("{}", serde_json::to_string_pretty(&log)?);
            Ok(())
        }
        Command::Add { photo, data } => {
            let raw = fs::read_to_string(&photo)
                .with_context(|| format!("reading {}", photo.display()))?;
            let record = serde_json::from_str::<UnsplashPhoto>(&raw)?.into_record();

            FileHistoryStore::new(data.data).try_append(record.clone())?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Command::Previous { image_url, data } => {
            let log = FileHistoryStore::new(data.data).try_load()?;
            match log.previous(&image_url) {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(record)?);
                    Ok(())
                }
                None => bail!("no history entry before {image_url}"),
            }
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let base = match &args.config {
        Some(path) => ServerConfig::from_json_file(path)?,
        None => ServerConfig::default(),
    };
    let config = base.with_overrides(ConfigOverrides {
        address: args.address,
        port: args.port,
        data_file: args.data,
        strict: args.strict,
    });

    let store: Arc<dyn HistoryStore> = if args.ephemeral {
        warn!("running with in-memory history; nothing will be persisted");
        Arc::new(InMemoryHistoryStore::default())
    } else {
        Arc::new(FileHistoryStore::new(config.data_file.clone()))
    };

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(
        %addr,
        data_file = %config.data_file.display(),
        policy = ?config.failure_policy,
        "history server listening"
    );

    http::serve(listener, AppState::new(store, config.failure_policy), async {
        let _ = tokio::signal::ctrl_c().await;
        warn!("received Ctrl+C, shutting down");
    })
    .await?;

    Ok(())
}
