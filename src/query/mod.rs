pub mod engine;
pub mod top;

pub use engine::{find_player, search_prefix, PlayerLookup, PrefixLookup, PrefixResult, QueryEngine};
pub use top::TopList;
