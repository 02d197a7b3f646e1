#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rankdex::query::{find_player, search_prefix};
use rankdex::snapshot::Snapshot;
use std::time::SystemTime;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    snapshot: &'a [u8],
    name: &'a str,
}

fuzz_target!(|input: Input| {
    // Corrupt snapshots must come back as errors, never panics
    let Ok(snapshot) = Snapshot::parse(input.snapshot.to_vec(), SystemTime::UNIX_EPOCH) else {
        return;
    };

    let _ = find_player(&snapshot, input.name);
    let _ = search_prefix(&snapshot, input.name);
    let _ = rankdex::snapshot::stats::verify(&snapshot);
});
