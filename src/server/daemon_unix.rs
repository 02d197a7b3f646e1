//! Unix ranking server daemon
//!
//! Keeps one query engine warm and serves lookups over a Unix socket.

use crate::query::QueryEngine;
use crate::server::protocol::{read_message, write_message, Request, Response, StatusResponse};
use crate::server::{get_pid_path, get_socket_path};
use crate::utils::app_data::AppConfig;
use anyhow::{Context, Result};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{error, info, warn};

/// Connection timeout
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// The ranking server daemon
pub struct RankServer {
    engine: QueryEngine,
    socket_path: PathBuf,
    start_time: Instant,
    /// Shutdown flag
    shutdown: AtomicBool,
}

impl RankServer {
    /// Create a new server on the default socket, wrapped in Arc
    pub fn new(engine: QueryEngine) -> Arc<Self> {
        Self::with_socket(engine, get_socket_path())
    }

    pub fn with_socket(engine: QueryEngine, socket_path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            engine,
            socket_path,
            start_time: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Write the PID file and serve until shutdown (blocking)
    pub fn run(self: &Arc<Self>) -> Result<()> {
        let pid_path = get_pid_path();

        // Write PID file
        if let Some(parent) = pid_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&pid_path, format!("{}", std::process::id()))?;

        let result = self.serve();

        let _ = fs::remove_file(&pid_path);
        result
    }

    /// Listen on the socket until a shutdown request arrives
    pub fn serve(self: &Arc<Self>) -> Result<()> {
        let socket_path = self.socket_path.as_path();

        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Remove stale socket file
        if socket_path.exists() {
            fs::remove_file(socket_path)?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind to {}", socket_path.display()))?;

        // Set socket permissions (user only)
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(socket_path, fs::Permissions::from_mode(0o600))?;
        }

        info!(socket = %socket_path.display(), "listening");

        // Warm up so the first query doesn't pay for the initial load
        self.engine.loader().refresh();

        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            match stream {
                Ok(stream) => {
                    let _ = stream.set_read_timeout(Some(CONNECTION_TIMEOUT));
                    let _ = stream.set_write_timeout(Some(CONNECTION_TIMEOUT));

                    let server = Arc::clone(self);
                    thread::spawn(move || {
                        if let Err(e) = server.handle_connection(stream) {
                            warn!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            }
        }

        let _ = fs::remove_file(socket_path);
        info!("server stopped");
        Ok(())
    }

    /// Handle a single client connection
    fn handle_connection(&self, stream: UnixStream) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        loop {
            let request: Request = match read_message(&mut reader) {
                Ok(req) => req,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // Client disconnected
                    break;
                }
                Err(e) => {
                    let resp = Response::Error {
                        message: format!("Invalid request: {}", e),
                    };
                    write_message(&mut writer, &resp)?;
                    continue;
                }
            };

            let response = self.handle_request(request);
            write_message(&mut writer, &response)?;

            if matches!(response, Response::ShuttingDown) {
                self.wake_listener();
                break;
            }
        }

        Ok(())
    }

    /// Handle a single request
    fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::GetPlayer { name } => Response::Player {
                result: self.engine.get_player(&name),
            },

            Request::QueryPrefix { prefix } => Response::Prefix {
                result: self.engine.query_prefix(&prefix),
            },

            Request::Status => Response::Status(self.status()),

            Request::Reload => self.handle_reload(),

            Request::Shutdown => {
                self.shutdown.store(true, Ordering::Relaxed);
                Response::ShuttingDown
            }

            Request::Ping => Response::Pong,
        }
    }

    fn status(&self) -> StatusResponse {
        let loader = self.engine.loader();
        let snapshot = loader.current();

        StatusResponse {
            uptime_secs: self.start_time.elapsed().as_secs(),
            queries_served: self.engine.queries_served(),
            source: loader.source().describe(),
            phase: loader.phase(),
            players: snapshot.as_ref().map(|s| s.num_items()),
            cached_prefixes: snapshot.as_ref().map(|s| s.prefix_cache().len()),
            snapshot_age_secs: snapshot.as_ref().map(|s| {
                SystemTime::now()
                    .duration_since(s.loaded_at())
                    .unwrap_or_default()
                    .as_secs()
            }),
            loader: loader.stats(),
        }
    }

    fn handle_reload(&self) -> Response {
        let loader = self.engine.loader();
        let failures_before = loader.stats().failures;
        loader.refresh_now();

        let failed = loader.stats().failures > failures_before;
        match loader.current() {
            Some(snapshot) if !failed => Response::Reloaded {
                success: true,
                message: format!("Serving {} players", snapshot.num_items()),
            },
            Some(snapshot) => Response::Reloaded {
                success: false,
                message: format!(
                    "Reload failed, still serving {} players from the previous snapshot",
                    snapshot.num_items()
                ),
            },
            None => Response::Reloaded {
                success: false,
                message: "No snapshot could be loaded".to_string(),
            },
        }
    }

    /// The accept loop only notices the shutdown flag on the next connection
    fn wake_listener(&self) {
        let _ = UnixStream::connect(&self.socket_path);
    }
}

/// Daemonize the current process
pub fn daemonize(config: AppConfig) -> Result<()> {
    // Fork using double-fork technique for proper daemonization
    match unsafe { libc::fork() } {
        -1 => anyhow::bail!("First fork failed"),
        0 => {
            // Child process
            // Create new session
            if unsafe { libc::setsid() } == -1 {
                anyhow::bail!("setsid failed");
            }

            // Second fork to prevent acquiring a controlling terminal
            match unsafe { libc::fork() } {
                -1 => anyhow::bail!("Second fork failed"),
                0 => {
                    // Grandchild - this becomes the daemon
                    unsafe {
                        libc::close(0);
                        libc::close(1);
                        libc::close(2);

                        // Redirect to /dev/null
                        let null = libc::open(
                            c"/dev/null".as_ptr(),
                            libc::O_RDWR,
                        );
                        if null != -1 {
                            libc::dup2(null, 0);
                            libc::dup2(null, 1);
                            libc::dup2(null, 2);
                            if null > 2 {
                                libc::close(null);
                            }
                        }
                    }

                    // Resolve a relative snapshot path before leaving the working directory
                    let config = with_absolute_snapshot(config);
                    let _ = std::env::set_current_dir("/");

                    let server = RankServer::new(QueryEngine::open(&config));
                    if let Err(e) = server.run() {
                        // Can't really report this since stdout is closed
                        let _ = fs::write("/tmp/rankdex-error.log", format!("{}", e));
                    }
                    std::process::exit(0);
                }
                _ => {
                    // First child exits immediately
                    std::process::exit(0);
                }
            }
        }
        _ => {
            // Parent process - wait for first child then exit
            unsafe {
                let mut status: libc::c_int = 0;
                libc::wait(&mut status);
            }
            Ok(())
        }
    }
}

/// Start the daemon in foreground (for debugging)
pub fn run_foreground(config: &AppConfig) -> Result<()> {
    let config = with_absolute_snapshot(config.clone());
    let server = RankServer::new(QueryEngine::open(&config));
    server.run()
}

/// Clients match the status `source` against their own absolute path
fn with_absolute_snapshot(mut config: AppConfig) -> AppConfig {
    if let Ok(abs) = std::path::absolute(&config.snapshot_path) {
        config.snapshot_path = abs;
    }
    config
}

/// Stop the running daemon
pub fn stop_daemon() -> Result<bool> {
    let pid_path = get_pid_path();

    if !pid_path.exists() {
        return Ok(false);
    }

    let pid_str = fs::read_to_string(&pid_path)?;
    let pid: i32 = pid_str.trim().parse()?;

    // Send SIGTERM
    unsafe {
        if libc::kill(pid, libc::SIGTERM) == 0 {
            // Wait a bit for graceful shutdown
            thread::sleep(Duration::from_millis(500));

            // Check if still running, send SIGKILL if needed
            if libc::kill(pid, 0) == 0 {
                thread::sleep(Duration::from_secs(1));
                if libc::kill(pid, 0) == 0 {
                    libc::kill(pid, libc::SIGKILL);
                }
            }
        }
    }

    // Clean up socket and pid files
    let _ = fs::remove_file(get_socket_path());
    let _ = fs::remove_file(&pid_path);

    Ok(true)
}
