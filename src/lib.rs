//! # rankdex - in-memory player ranking index
//!
//! Serves exact and prefix lookups over a binary ranking snapshot that a
//! separate generator rewrites periodically. The snapshot is read once into
//! memory (or mapped) and queried in place; a background refresh swaps in a
//! new one when the file changes.
//!
//! ## Architecture
//!
//! - [`snapshot`] - Snapshot decoding, the sorted name index, the embedded
//!   prefix cache and the loader that keeps one snapshot published
//! - [`query`] - Exact player lookup and top-ten prefix queries
//! - [`server`] - Optional daemon that keeps a snapshot warm (unix only)
//! - [`output`] - Terminal formatting
//! - [`utils`] - Binary encoding helpers and configuration
//!
//! ## Quick Start
//!
//! ```ignore
//! use rankdex::query::{PlayerLookup, QueryEngine};
//! use rankdex::utils::app_data::AppConfig;
//!
//! let engine = QueryEngine::open(&AppConfig::load()?);
//!
//! if let PlayerLookup::Found(player) = engine.get_player("Alice") {
//!     println!("{} has {} points", player.name, player.points.points);
//! }
//! ```

pub mod error;
pub mod output;
pub mod query;
#[cfg(all(unix, feature = "daemon"))]
pub mod server;
pub mod snapshot;
pub mod utils;
