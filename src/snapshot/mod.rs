pub mod loader;
pub mod name_index;
pub mod prefix_cache;
pub mod reader;
pub mod source;
pub mod stats;
pub mod types;
pub mod writer;

pub use loader::{LoadPhase, LoaderStats, SnapshotLoader};
pub use name_index::NameIndex;
pub use prefix_cache::PrefixCache;
pub use reader::{Snapshot, SnapshotBytes};
pub use source::{FileSource, SnapshotSource};
pub use types::*;
pub use writer::SnapshotWriter;
