//! Client for connecting to the ranking server daemon

use crate::query::{PlayerLookup, PrefixLookup};
use crate::server::get_socket_path;
use crate::server::protocol::{read_message, write_message, Request, Response, StatusResponse};
use std::io::{BufReader, BufWriter};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Read/write timeout
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response from server")]
    InvalidResponse,
}

/// Client for the ranking server
pub struct RankClient {
    reader: BufReader<UnixStream>,
    writer: BufWriter<UnixStream>,
}

impl RankClient {
    /// Try to connect to the running daemon.
    /// Returns None if it is not running so callers can answer directly.
    pub fn connect() -> Option<Self> {
        Self::connect_at(&get_socket_path())
    }

    pub fn connect_at(socket_path: &Path) -> Option<Self> {
        // Quick check if socket exists
        if !socket_path.exists() {
            return None;
        }

        let stream = UnixStream::connect(socket_path).ok()?;
        let _ = stream.set_read_timeout(Some(IO_TIMEOUT));
        let _ = stream.set_write_timeout(Some(IO_TIMEOUT));

        let reader = BufReader::new(stream.try_clone().ok()?);
        let writer = BufWriter::new(stream);

        Some(Self { reader, writer })
    }

    /// Connect only if the running daemon serves `snapshot_path`
    pub fn connect_serving(snapshot_path: &Path) -> Option<Self> {
        Self::connect_serving_at(&get_socket_path(), snapshot_path)
    }

    pub fn connect_serving_at(socket_path: &Path, snapshot_path: &Path) -> Option<Self> {
        let wanted = std::path::absolute(snapshot_path).ok()?;
        let mut client = Self::connect_at(socket_path)?;
        let status = client.status().ok()?;
        (Path::new(&status.source) == wanted).then_some(client)
    }

    fn call(&mut self, request: &Request) -> ClientResult<Response> {
        write_message(&mut self.writer, request)?;
        match read_message(&mut self.reader)? {
            Response::Error { message } => Err(ClientError::Server(message)),
            response => Ok(response),
        }
    }

    pub fn get_player(&mut self, name: &str) -> ClientResult<PlayerLookup> {
        let request = Request::GetPlayer {
            name: name.to_string(),
        };
        match self.call(&request)? {
            Response::Player { result } => Ok(result),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    pub fn query_prefix(&mut self, prefix: &str) -> ClientResult<PrefixLookup> {
        let request = Request::QueryPrefix {
            prefix: prefix.to_string(),
        };
        match self.call(&request)? {
            Response::Prefix { result } => Ok(result),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Get server status
    pub fn status(&mut self) -> ClientResult<StatusResponse> {
        match self.call(&Request::Status)? {
            Response::Status(status) => Ok(status),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Force the server to re-check its snapshot file
    pub fn reload(&mut self) -> ClientResult<(bool, String)> {
        match self.call(&Request::Reload)? {
            Response::Reloaded { success, message } => Ok((success, message)),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Request graceful shutdown
    pub fn shutdown(&mut self) -> ClientResult<()> {
        match self.call(&Request::Shutdown)? {
            Response::ShuttingDown => Ok(()),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Ping the server
    pub fn ping(&mut self) -> ClientResult<()> {
        match self.call(&Request::Ping)? {
            Response::Pong => Ok(()),
            _ => Err(ClientError::InvalidResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryEngine;
    use crate::server::daemon::RankServer;
    use crate::snapshot::loader::tests::snapshot_bytes;
    use crate::snapshot::{SnapshotLoader, SnapshotWriter};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_connect_missing_socket() {
        let dir = TempDir::new().unwrap();
        assert!(RankClient::connect_at(&dir.path().join("nope.sock")).is_none());
    }

    fn wait_for_client(socket: &Path) -> RankClient {
        for _ in 0..200 {
            if let Some(client) = RankClient::connect_at(socket) {
                return client;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("server never came up at {}", socket.display());
    }

    #[test]
    fn test_queries_through_server() {
        let dir = TempDir::new().unwrap();
        let snapshot_path = dir.path().join("ranks.bin");
        std::fs::write(&snapshot_path, snapshot_bytes(&[("ana", 50), ("bob", 20)])).unwrap();

        let loader = SnapshotLoader::new(
            crate::snapshot::FileSource::new(&snapshot_path),
            Duration::from_secs(60),
        );
        let socket = dir.path().join("rankdex.sock");
        let server = RankServer::with_socket(QueryEngine::new(Arc::new(loader)), socket.clone());

        let handle = {
            let server = Arc::clone(&server);
            thread::spawn(move || server.serve())
        };

        let mut client = wait_for_client(&socket);
        client.ping().unwrap();

        match client.get_player("ANA").unwrap() {
            PlayerLookup::Found(record) => assert_eq!(record.name, "ana"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(client.get_player("zed").unwrap(), PlayerLookup::NotFound);

        match client.query_prefix("Bob").unwrap() {
            PrefixLookup::Found(result) => {
                assert_eq!(result.player.map(|p| p.name), Some("bob".to_string()));
            }
            PrefixLookup::NoData => panic!("expected data"),
        }

        // Replace the file and force a reload past the throttle
        let mut writer = SnapshotWriter::new();
        writer.add_player("cy", [(1, 1); 6]);
        writer.write_atomic(&snapshot_path).unwrap();
        let later = std::time::SystemTime::now() + Duration::from_secs(5);
        std::fs::File::options()
            .write(true)
            .open(&snapshot_path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let (success, _) = client.reload().unwrap();
        assert!(success);
        assert_eq!(client.get_player("ana").unwrap(), PlayerLookup::NotFound);

        let status = client.status().unwrap();
        assert_eq!(status.players, Some(1));
        assert!(status.queries_served >= 4);

        client.shutdown().unwrap();
        drop(client);
        handle.join().unwrap().unwrap();
    }
}
