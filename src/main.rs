use anyhow::Result;
use clap::{Parser, Subcommand};
use rankdex::output;
use rankdex::query::{PlayerLookup, PrefixLookup, QueryEngine};
use rankdex::snapshot::stats;
use rankdex::utils::app_data::AppConfig;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rankdex")]
#[command(about = "Fast player lookups over a binary ranking snapshot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Snapshot file (overrides the configured path)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one player by exact name (case-insensitive)
    Player { name: String },
    /// Show the exact match and top ten players for a name prefix
    Prefix { prefix: String },
    /// Show snapshot statistics
    Stats,
    /// Check name order, item decoding and cached top lists
    Verify,
    /// Manage the ranking server daemon (keeps a snapshot warm)
    #[cfg(all(unix, feature = "daemon"))]
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[cfg(all(unix, feature = "daemon"))]
#[derive(Subcommand)]
enum DaemonAction {
    /// Start the daemon in background
    Start,
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
    /// Run daemon in foreground (for debugging)
    Foreground,
    /// Re-read the snapshot now, ignoring the refresh interval
    Reload,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rankdex=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "using default configuration");
        AppConfig::default()
    });
    if let Some(file) = cli.file {
        config.snapshot_path = file;
    }
    let color = !cli.no_color;

    match cli.command {
        Commands::Player { name } => {
            let result = lookup_player(&config, &name)?;
            if cli.json {
                output::print_json(&result)?;
            } else {
                output::print_player(&result, color)?;
            }
        }
        Commands::Prefix { prefix } => {
            let result = lookup_prefix(&config, &prefix)?;
            if cli.json {
                output::print_json(&result)?;
            } else {
                output::print_prefix(&result, color)?;
            }
        }
        Commands::Stats => {
            stats::show_stats(&config.snapshot_path, config.use_mmap)?;
        }
        Commands::Verify => {
            if !stats::run_verify(&config.snapshot_path, config.use_mmap)? {
                std::process::exit(1);
            }
        }
        #[cfg(all(unix, feature = "daemon"))]
        Commands::Daemon { action } => {
            handle_daemon_command(action, config)?;
        }
    }

    Ok(())
}

/// Ask the daemon when it serves the same snapshot file, otherwise open it here
#[cfg(all(unix, feature = "daemon"))]
fn lookup_player(config: &AppConfig, name: &str) -> Result<PlayerLookup> {
    if let Some(mut client) = rankdex::server::RankClient::connect_serving(&config.snapshot_path) {
        return Ok(client.get_player(name)?);
    }
    Ok(QueryEngine::open(config).get_player(name))
}

#[cfg(not(all(unix, feature = "daemon")))]
fn lookup_player(config: &AppConfig, name: &str) -> Result<PlayerLookup> {
    Ok(QueryEngine::open(config).get_player(name))
}

#[cfg(all(unix, feature = "daemon"))]
fn lookup_prefix(config: &AppConfig, prefix: &str) -> Result<PrefixLookup> {
    if let Some(mut client) = rankdex::server::RankClient::connect_serving(&config.snapshot_path) {
        return Ok(client.query_prefix(prefix)?);
    }
    Ok(QueryEngine::open(config).query_prefix(prefix))
}

#[cfg(not(all(unix, feature = "daemon")))]
fn lookup_prefix(config: &AppConfig, prefix: &str) -> Result<PrefixLookup> {
    Ok(QueryEngine::open(config).query_prefix(prefix))
}

#[cfg(all(unix, feature = "daemon"))]
fn handle_daemon_command(action: DaemonAction, config: AppConfig) -> Result<()> {
    use rankdex::server::{daemon, get_socket_path, is_daemon_running, RankClient};
    use std::time::Duration;

    match action {
        DaemonAction::Start => {
            if is_daemon_running() {
                println!("Daemon is already running");
                return Ok(());
            }

            println!("Starting rankdex daemon...");
            daemon::daemonize(config)?;

            // Wait a moment for daemon to start
            std::thread::sleep(Duration::from_millis(500));

            if is_daemon_running() {
                println!("Daemon started (socket: {})", get_socket_path().display());
            } else {
                println!("Daemon may have failed to start. Check /tmp/rankdex-error.log");
            }
        }

        DaemonAction::Stop => {
            if !is_daemon_running() {
                println!("Daemon is not running");
                return Ok(());
            }

            println!("Stopping daemon...");

            // Try graceful shutdown via client first
            if let Some(mut client) = RankClient::connect() {
                let _ = client.shutdown();
                std::thread::sleep(Duration::from_millis(500));
            }

            // Force stop if still running
            if is_daemon_running() {
                daemon::stop_daemon()?;
            }

            println!("Daemon stopped");
        }

        DaemonAction::Status => {
            if !is_daemon_running() {
                println!("Daemon is not running");
                return Ok(());
            }

            let Some(mut client) = RankClient::connect() else {
                println!("Daemon is running but not responding");
                return Ok(());
            };

            match client.status() {
                Ok(status) => {
                    println!("rankdex daemon status:");
                    println!("  Uptime: {}s", status.uptime_secs);
                    println!("  Snapshot: {}", status.source);
                    println!("  State: {:?}", status.phase);
                    match status.players {
                        Some(players) => println!("  Players: {}", players),
                        None => println!("  Players: no snapshot loaded"),
                    }
                    if let Some(prefixes) = status.cached_prefixes {
                        println!("  Cached prefixes: {}", prefixes);
                    }
                    if let Some(age) = status.snapshot_age_secs {
                        println!("  Snapshot age: {}s", age);
                    }
                    println!("  Queries served: {}", status.queries_served);
                    println!(
                        "  Loads: {} parsed, {} failed, {} unchanged of {} checks",
                        status.loader.parses,
                        status.loader.failures,
                        status.loader.unchanged,
                        status.loader.checks
                    );
                }
                Err(e) => {
                    println!("Failed to get status: {}", e);
                }
            }
        }

        DaemonAction::Foreground => {
            if is_daemon_running() {
                println!("Daemon is already running in background. Stop it first with 'rankdex daemon stop'");
                return Ok(());
            }

            println!("Running daemon in foreground (Ctrl+C to stop)...");
            daemon::run_foreground(&config)?;
        }

        DaemonAction::Reload => {
            let Some(mut client) = RankClient::connect() else {
                println!("Daemon is not running. Start it with 'rankdex daemon start'");
                return Ok(());
            };

            match client.reload() {
                Ok((true, message)) => println!("Reloaded: {}", message),
                Ok((false, message)) => println!("Reload failed: {}", message),
                Err(e) => println!("Failed to reload: {}", e),
            }
        }
    }

    Ok(())
}
