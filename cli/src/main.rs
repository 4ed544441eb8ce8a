//! navgraph - headless driver for device navigation trees.

mod commands;
mod config;
mod paths;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{CliOverrides, Config};

/// navgraph - inspect, edit and drive device navigation trees
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the host API
    #[arg(long, env = "NAVGRAPH_URL")]
    url: Option<String>,

    /// Bearer token for the host API
    #[arg(long, env = "NAVGRAPH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory for local state (preview cache)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Navigation tree operations
    Tree {
        #[command(subcommand)]
        action: TreeAction,
    },
    /// Drive a device to a node
    Navigate {
        tree: String,
        node: String,
        /// Host the device is attached to
        #[arg(long)]
        host: String,
        #[arg(long)]
        device: String,
    },
    /// Run an exploration/validation pass over a tree
    Explore {
        tree: String,
        #[arg(long)]
        host: String,
        #[arg(long)]
        device: String,
        /// Device model, e.g. android_tv
        #[arg(long)]
        model: String,
    },
    /// Local preview cache operations
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum TreeAction {
    /// Print a tree's nodes and edges
    Show { tree: String },
    /// Replace a tree's graph with a JSON file and save the difference
    Import { tree: String, file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Drop every cached path preview
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_figment(&CliOverrides {
        server_url: args.url.clone(),
        auth_token: args.token.clone(),
        data_dir: args.data_dir.clone(),
        log_level: args.log_level.clone(),
    })?;
    let _guard = init_logging(&config)?;
    info!("Using host {}", config.server_url);

    match args.command {
        Command::Tree {
            action: TreeAction::Show { tree },
        } => commands::show_tree(&config, &tree).await,
        Command::Tree {
            action: TreeAction::Import { tree, file },
        } => commands::import_tree(&config, &tree, &file).await,
        Command::Navigate {
            tree,
            node,
            host,
            device,
        } => commands::navigate(&config, &tree, &node, &host, &device).await,
        Command::Explore {
            tree,
            host,
            device,
            model,
        } => commands::explore(&config, &tree, &host, &device, &model).await,
        Command::Cache {
            action: CacheAction::Clear,
        } => commands::clear_cache(&config),
    }
}

/// Log to stderr, and to `log_file` as well when configured.
///
/// `RUST_LOG` wins over the configured level. The returned guard must live until exit.
fn init_logging(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.as_deref().unwrap_or("info")))?;

    let stderr_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match config.log_file {
        Some(ref path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}
