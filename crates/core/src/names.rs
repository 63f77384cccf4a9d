//! Human-readable identifiers for item lists (`amber-falcon-042`).

use rand::seq::SliceRandom;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calm", "clever", "crisp", "dusty", "eager", "fuzzy", "gentle",
    "golden", "hazy", "humble", "jolly", "keen", "lively", "lucky", "mellow", "misty", "nimble",
    "proud", "quiet", "rapid", "rustic", "silent", "sly", "sunny", "swift", "tidy", "vivid",
    "witty", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "beacon", "canyon", "cedar", "comet", "coral", "falcon", "fern", "glacier",
    "harbor", "heron", "island", "lantern", "maple", "meadow", "nebula", "otter", "pebble",
    "pine", "quartz", "raven", "reef", "river", "sparrow", "summit", "thistle", "tundra",
    "valley", "willow", "wren",
];

/// Generate an `adjective-noun-NNN` identifier.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("plain");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("list");
    let suffix: u16 = rng.gen_range(0..1000);
    format!("{adjective}-{noun}-{suffix:03}")
}
