//! Utility functions shared across the crate.
//!
//! - [`app_data`] - Configuration file and application data directory
//! - [`encoding`] - Bounds-checked binary readers and varint encoding

pub mod app_data;
pub mod encoding;

pub use app_data::*;
pub use encoding::*;
