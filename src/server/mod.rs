//! Persistent ranking server
//!
//! Keeps a loaded snapshot warm in a background process so short-lived CLI
//! invocations skip the initial parse.
//!
//! - Daemon: owns a query engine, listens on a Unix socket
//! - Client: sends one request per call, gets one response back
//! - Fallback: without a daemon the CLI opens the snapshot itself

mod client;
#[path = "daemon_unix.rs"]
pub mod daemon;
pub mod protocol;

pub use client::{ClientError, ClientResult, RankClient};

use std::path::PathBuf;

/// Socket path in the per-user runtime directory
pub fn get_socket_path() -> PathBuf {
    runtime_file("sock")
}

/// PID file path for the daemon
pub fn get_pid_path() -> PathBuf {
    runtime_file("pid")
}

fn runtime_file(extension: &str) -> PathBuf {
    // XDG_RUNTIME_DIR is tmpfs-backed and private to the user
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(format!("rankdex.{}", extension));
    }

    if let Some(home) = dirs::home_dir() {
        return home
            .join(".local")
            .join("run")
            .join(format!("rankdex.{}", extension));
    }

    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/rankdex-{}.{}", uid, extension))
}

/// Check if the daemon is running
pub fn is_daemon_running() -> bool {
    let Ok(pid_str) = std::fs::read_to_string(get_pid_path()) else {
        return false;
    };

    match pid_str.trim().parse::<i32>() {
        // kill(pid, 0) only checks that the process exists
        Ok(pid) => unsafe { libc::kill(pid, 0) == 0 },
        Err(_) => false,
    }
}
