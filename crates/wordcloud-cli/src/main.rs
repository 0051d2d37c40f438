//! wordcloud - live word cloud MCP server and viewer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use wordcloud_core::{Config, Snapshot};
use wordcloud_mcp::{LineTransport, McpServer, ToolRegistry, WordCloudTools};
use wordcloud_storage::{CloudState, JsonFileBackend, SnapshotBackend, StateStore};
use wordcloud_viewer::ViewerOptions;

/// How long the viewer gets to wind down once stdin is closed.
const VIEWER_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "wordcloud")]
#[command(author, version, about = "Live word cloud for AI assistants", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio, with the browser viewer alongside
    Serve {
        /// Snapshot file to use
        #[arg(long, value_name = "PATH")]
        data: Option<PathBuf>,

        /// Viewer port (0 picks a free one)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not start the browser viewer
        #[arg(long)]
        no_viewer: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print the stored word cloud
    Words {
        /// Snapshot file to read
        #[arg(long, value_name = "PATH")]
        data: Option<PathBuf>,

        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Get a value (e.g. `viewer.port`)
    Get { key: String },

    /// Set a value (e.g. `viewer.port 9000`)
    Set { key: String, value: String },

    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr: stdout carries protocol frames.
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command {
        Some(Commands::Serve {
            data,
            port,
            no_viewer,
        }) => {
            let mut config = load_config(&config_path)?;
            if let Some(data) = data {
                config.storage.path = Some(data);
            }
            if let Some(port) = port {
                config.viewer.port = port;
            }
            if no_viewer {
                config.viewer.enabled = false;
            }
            serve(config).await?;
        }
        Some(Commands::Config { command }) => run_config(command, &config_path)?,
        Some(Commands::Words { data, json }) => {
            let config = load_config(&config_path)?;
            let path = match data {
                Some(path) => path,
                None => config.snapshot_path()?,
            };
            print_words(&path, json)?;
        }
        None => {
            println!("wordcloud - live word cloud for AI assistants");
            println!("Run with --help for usage information");
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load_from(path).with_context(|| format!("Failed to load config {}", path.display()))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let snapshot_path = config.snapshot_path()?;
    let store = StateStore::open(JsonFileBackend::new(&snapshot_path))
        .with_context(|| format!("Failed to open word cloud {}", snapshot_path.display()))?;
    let cloud = CloudState::new(store);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let (viewer_url, viewer) = start_viewer(&config, &cloud, shutdown_rx).await;

    let mut registry = ToolRegistry::new();
    WordCloudTools::new(cloud, viewer_url)
        .with_claude_desktop_config(config.claude_desktop_config_path())
        .register(&mut registry)
        .context("Failed to register tools")?;

    let mut server = McpServer::new(config.server.name.clone(), registry);
    let result = tokio::task::spawn_blocking(move || {
        let mut transport = LineTransport::stdio();
        server.run(&mut transport)
    })
    .await
    .context("MCP server task failed")?;

    let _ = shutdown_tx.send(());
    if let Some(viewer) = viewer {
        if tokio::time::timeout(VIEWER_SHUTDOWN_GRACE, viewer).await.is_err() {
            tracing::debug!("Viewer still has open streams, leaving them behind");
        }
    }

    result.context("MCP transport failed")
}

/// Bind and spawn the viewer. A viewer that cannot start is logged and
/// skipped; the stdio server runs regardless.
async fn start_viewer(
    config: &Config,
    cloud: &CloudState,
    shutdown: oneshot::Receiver<()>,
) -> (String, Option<tokio::task::JoinHandle<()>>) {
    let configured_url = config.viewer.url();
    if !config.viewer.enabled {
        tracing::info!("Viewer disabled");
        return (configured_url, None);
    }

    let listener = match TcpListener::bind(config.viewer.bind_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::warn!(addr = %config.viewer.bind_addr(), error = %e, "Viewer could not start");
            return (configured_url, None);
        }
    };

    let url = match listener.local_addr() {
        Ok(addr) => format!("http://{}/", addr),
        Err(_) => configured_url,
    };

    let options = ViewerOptions::from(&config.viewer);
    let cloud = cloud.clone();
    let handle = tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown.await;
        };
        if let Err(e) = wordcloud_viewer::serve(listener, cloud, options, shutdown).await {
            tracing::error!(error = %e, "Viewer stopped with an error");
        }
    });

    (url, Some(handle))
}

fn run_config(command: ConfigCommands, path: &Path) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = load_config(path)?;
            let contents =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("# {}", path.display());
            print!("{}", contents);
        }
        ConfigCommands::Get { key } => {
            let config = load_config(path)?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = load_config(path)?;
            config.set(&key, &value)?;
            config.save_to(path)?;
            println!("{} = {}", key, value);
        }
        ConfigCommands::Path => println!("{}", path.display()),
    }
    Ok(())
}

fn print_words(path: &Path, json: bool) -> anyhow::Result<()> {
    let snapshot = JsonFileBackend::new(path)
        .load()
        .with_context(|| format!("Failed to read {}", path.display()))?
        .unwrap_or_else(Snapshot::new);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if snapshot.words.is_empty() {
        println!("The word cloud is empty ({})", path.display());
        return Ok(());
    }

    println!("Words ({}):", snapshot.words.len());
    for word in snapshot.words_by_size() {
        println!("  {:<24} {:<12} size {}", word.word, word.category, word.size);
    }

    if !snapshot.connections.is_empty() {
        println!();
        println!("Connections ({}):", snapshot.connections.len());
        for connection in &snapshot.connections {
            if connection.label.is_empty() {
                println!("  {} -> {}", connection.source, connection.target);
            } else {
                println!(
                    "  {} -> {} [{}]",
                    connection.source, connection.target, connection.label
                );
            }
        }
    }

    if let Some(updated) = &snapshot.last_update {
        println!();
        println!("Last update: {}", updated);
    }

    Ok(())
}
