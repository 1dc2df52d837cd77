//! FollowGraph - batched follow graph over the GitHub REST API
//!
//! Main entry point for the FollowGraph CLI.

use clap::{Parser, Subcommand};
use followgraph::client::{FollowClient, HttpFollowApi, LoadOutcome};
use followgraph::config::{validate_config_result, FollowGraphConfig};
use followgraph::connector::GitHubConnector;
use followgraph::github::HttpFetcher;
use followgraph::graph::{BoundResolver, GraphResolver, QueryBoundary};
use followgraph::server::FollowServer;
use followgraph::FollowGraphError;
use std::process;
use std::sync::Arc;

/// FollowGraph - who you are and whom you follow, batched and paginated
#[derive(Parser, Debug)]
#[command(name = "followgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/followgraph/config.yaml)
    #[arg(short, long)]
    config: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize FollowGraph configuration
    Init {
        /// Login of the identity every query runs as
        #[arg(short, long)]
        login: String,

        /// REST API root (default: https://api.github.com)
        #[arg(long)]
        api_url: Option<String>,
    },

    /// Serve the query boundary over HTTP
    Serve {
        /// Listen address (default: from config)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Show yourself and the users you follow
    Me {
        /// Page size
        #[arg(short = 'n', long, default_value = "10")]
        per_page: u32,

        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: u32,

        /// Query a running `followgraph serve` instead of GitHub directly
        #[arg(short, long, env = "FOLLOWGRAPH_SERVER")]
        server: Option<String>,
    },

    /// Follow a user
    Follow {
        /// Login to follow
        login: String,

        /// Query a running `followgraph serve` instead of GitHub directly
        #[arg(short, long, env = "FOLLOWGRAPH_SERVER")]
        server: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = followgraph::logging::init_with_verbosity(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> followgraph::Result<()> {
    // Handle init command first (creates config)
    if let Commands::Init {
        ref login,
        ref api_url,
    } = cli.command
    {
        return handle_init_command(&cli.config, login, api_url.as_deref());
    }

    let config = load_config(&cli.config)?;
    validate_config_result(&config)?;
    tracing::info!(login = %config.login, "Configuration loaded");

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| FollowGraphError::Io(format!("Failed to start runtime: {}", e)))?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Init { .. } => Ok(()),
            Commands::Serve { listen } => {
                let addr = listen.unwrap_or_else(|| config.server.listen.clone());
                println!("Serving follow graph for @{} on http://{}", config.login, addr);
                FollowServer::new(&config)?.run(&addr).await
            }
            Commands::Me {
                per_page,
                pages,
                server,
            } => match server {
                Some(url) => {
                    let api = HttpFollowApi::new(url, config.request_timeout())?;
                    handle_me_command(FollowClient::new(api), per_page, pages).await
                }
                None => {
                    let client = FollowClient::new(local_boundary(&config)?);
                    handle_me_command(client, per_page, pages).await
                }
            },
            Commands::Follow { login, server } => match server {
                Some(url) => {
                    let api = HttpFollowApi::new(url, config.request_timeout())?;
                    handle_follow_command(FollowClient::new(api), &login).await
                }
                None => {
                    let client = FollowClient::new(local_boundary(&config)?);
                    handle_follow_command(client, &login).await
                }
            },
        }
    })
}

fn load_config(path: &Option<String>) -> followgraph::Result<FollowGraphConfig> {
    let result = match path {
        Some(path) => FollowGraphConfig::load(path),
        None => FollowGraphConfig::load_default(),
    };

    match result {
        Err(FollowGraphError::Config(msg)) if msg.contains("Config file not found") => {
            Err(FollowGraphError::Config(
                "No configuration found. Run 'followgraph init --login <you>' first.".to_string(),
            ))
        }
        other => other,
    }
}

/// In-process boundary straight over the GitHub REST API
fn local_boundary(config: &FollowGraphConfig) -> followgraph::Result<BoundResolver> {
    let fetcher = HttpFetcher::new(config)?;
    if !fetcher.is_authenticated() {
        tracing::warn!("No access token configured; follow requests will be rejected");
    }
    let connector = GitHubConnector::new(Arc::new(fetcher));
    let resolver = GraphResolver::new(connector, config.server.default_per_page);
    Ok(BoundResolver::new(Arc::new(resolver), config.login.clone()))
}

fn handle_init_command(
    config_path: &Option<String>,
    login: &str,
    api_url: Option<&str>,
) -> followgraph::Result<()> {
    let mut config = FollowGraphConfig::new(login);
    if let Some(api_url) = api_url {
        config = config.with_api_url(api_url);
    }
    validate_config_result(&config)?;

    match config_path {
        Some(path) => {
            config.save(path)?;
            println!("Wrote configuration to {}", path);
        }
        None => {
            config.save_default()?;
            println!(
                "Wrote configuration to {}",
                FollowGraphConfig::default_path().display()
            );
        }
    }

    println!("Set GITHUB_TOKEN or add access_token to the file to enable follows.");
    Ok(())
}

async fn handle_me_command<Q: QueryBoundary>(
    client: FollowClient<Q>,
    per_page: u32,
    pages: u32,
) -> followgraph::Result<()> {
    client.load(per_page).await?;

    for _ in 1..pages {
        match client.load_more().await? {
            LoadOutcome::Appended { page, added } => {
                tracing::debug!(page, added, "Loaded page");
            }
            LoadOutcome::Exhausted
            | LoadOutcome::AlreadyLoading
            | LoadOutcome::Superseded { .. } => break,
        }
    }

    let Some(viewer) = client.state().viewer else {
        return Ok(());
    };

    match &viewer.name {
        Some(name) => println!("@{} ({}) [{}]", viewer.login, name, viewer.id),
        None => println!("@{} [{}]", viewer.login, viewer.id),
    }
    println!("Following {}:", viewer.following_count);
    for user in &viewer.following {
        match &user.name {
            Some(name) => println!("  @{} ({})", user.login, name),
            None => println!("  @{}", user.login),
        }
    }

    if client.has_more() {
        println!("  ... more available (use --pages)");
    }
    Ok(())
}

async fn handle_follow_command<Q: QueryBoundary>(
    client: FollowClient<Q>,
    login: &str,
) -> followgraph::Result<()> {
    let user = client.follow(login).await?;
    println!("Now following @{} [{}]", user.login, user.id);
    Ok(())
}
