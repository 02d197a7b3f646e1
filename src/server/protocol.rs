//! Protocol messages for client-server communication
//!
//! Uses a simple length-prefixed JSON protocol:
//! - 4 bytes (little-endian u32): message length
//! - N bytes: JSON-encoded message

use crate::query::{PlayerLookup, PrefixLookup};
use crate::snapshot::{LoadPhase, LoaderStats};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Largest message either side will accept
const MAX_MESSAGE_LEN: usize = 100 * 1024 * 1024;

/// Request from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Exact player lookup
    GetPlayer { name: String },

    /// Prefix query with top ten by points
    QueryPrefix { prefix: String },

    /// Check server health and get stats
    Status,

    /// Re-check the snapshot file now, ignoring the refresh interval
    Reload,

    /// Graceful shutdown request
    Shutdown,

    /// Ping for connection testing
    Ping,
}

/// Response from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Player { result: PlayerLookup },

    Prefix { result: PrefixLookup },

    /// Server status
    Status(StatusResponse),

    /// Reload completed
    Reloaded { success: bool, message: String },

    /// Shutdown acknowledged
    ShuttingDown,

    /// Pong response
    Pong,

    /// Error response
    Error { message: String },
}

/// Server status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Total queries served
    pub queries_served: u64,
    /// Snapshot file the server reads
    pub source: String,
    pub phase: LoadPhase,
    /// Players in the published snapshot, if any
    pub players: Option<usize>,
    pub cached_prefixes: Option<usize>,
    /// Seconds since the published snapshot was loaded
    pub snapshot_age_secs: Option<u64>,
    pub loader: LoaderStats,
}

/// Write a message to a stream with length prefix
pub fn write_message<W: Write>(writer: &mut W, msg: &impl Serialize) -> std::io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })?;

    let len = json.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()?;

    Ok(())
}

/// Read a message from a stream with length prefix
pub fn read_message<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> std::io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    serde_json::from_slice(&buf).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })
}
