//! Deterministic synthetic identities and alias seed phrases.
//!
//! A seed phrase (adjective-noun word pair) maps to exactly one synthetic
//! person: same seed, same person. The word pools favor distinct
//! pronunciation and unambiguous spelling, and carry no PII associations.
//! One seed per real-world service; never reuse.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

const ADJECTIVES: &[&str] = &[
    "amber", "arctic", "aspen", "birch", "blaze", "bolt", "cedar", "chalk", "cinder",
    "cobalt", "copper", "coral", "crimson", "dawn", "delta", "dusk", "echo", "ember",
    "fern", "flint", "forge", "frost", "glint", "grove", "hazel", "heather", "hollow",
    "indigo", "inlet", "ivory", "jade", "jasper", "kestrel", "larch", "laurel", "linen",
    "lunar", "maple", "marsh", "mist", "navy", "nimbus", "ochre", "opal", "orbit", "otter",
    "petal", "pine", "prism", "quartz", "raven", "ridge", "river", "rowan", "runic",
    "sable", "sage", "salt", "sand", "scout", "shale", "slate", "smoke", "solar", "sparrow",
    "spruce", "starling", "storm", "summit", "swift", "tallow", "teal", "thistle", "timber",
    "trace", "tundra", "vale", "vault", "veldt", "wick", "willow", "wren", "zephyr", "zenith",
];

const NOUNS: &[&str] = &[
    "anvil", "arch", "basin", "beacon", "bridge", "brook", "cable", "cairn", "canal",
    "canopy", "cast", "chord", "circuit", "cistern", "cleft", "crest", "current", "depth",
    "dial", "drift", "dune", "echo", "edge", "ember", "falls", "field", "flare", "frame",
    "gate", "glade", "gorge", "grid", "gully", "haven", "hearth", "helm", "hollow", "kelp",
    "knot", "latch", "ledge", "lens", "lever", "light", "line", "link", "loch", "lock",
    "loop", "lore", "mark", "mast", "meld", "mesh", "mill", "moor", "node", "notch",
    "orbit", "pass", "patch", "peak", "pier", "pillar", "pitch", "plain", "plank", "pool",
    "port", "post", "press", "range", "rapid", "reach", "reef", "relay", "ridge", "rift",
    "rivet", "root", "route", "rune", "seal", "shaft", "shore", "sill", "sluice", "span",
    "spoke", "stack", "stake", "stave", "stern", "strand", "strut", "surge", "sweep",
    "tide", "tine", "torch", "track", "trail", "vault", "vein", "weir", "well", "wharf",
];

const FIRST_NAMES: &[&str] = &[
    "Avery", "Blake", "Cameron", "Casey", "Dana", "Drew", "Elliot", "Emerson", "Finley",
    "Harper", "Hayden", "Jordan", "Kendall", "Logan", "Marlow", "Morgan", "Parker",
    "Quinn", "Reese", "Riley", "Rowan", "Sawyer", "Skyler", "Tatum", "Taylor",
];

const LAST_NAMES: &[&str] = &[
    "Ashford", "Barrett", "Calloway", "Dalton", "Ellsworth", "Fairbank", "Granger",
    "Hartley", "Ingram", "Kenworth", "Lockhart", "Merritt", "Norwood", "Pemberton",
    "Quimby", "Radcliffe", "Stanton", "Thornbury", "Underhill", "Vance", "Whitfield",
];

const TIMEZONES: &[&str] = &[
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "America/Phoenix",
];

const STREET_NAMES: &[&str] = &[
    "Oak", "Cedar", "Maple", "Elm", "Birch", "Willow", "Chestnut", "Juniper", "Alder",
];

/// Synthetic person, deterministic per seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub username: String,
    pub password: String,
    /// ISO date, age 25-45.
    pub dob: String,
    pub phone: String,
    pub address: String,
    pub timezone: String,
}

/// Stable 64-bit hash of a seed phrase. `DefaultHasher` is not stable
/// across Rust releases, so a fixed FNV-1a keeps seeds portable.
fn seed_hash(seed: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in seed.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Generate the synthetic person for a seed phrase. No seed draws one
/// from OS entropy (non-reproducible by design).
pub fn generate(seed: Option<&str>) -> Identity {
    let mut rng: StdRng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed_hash(seed)),
        None => StdRng::seed_from_u64(rand::thread_rng().next_u64()),
    };

    let first_name = FIRST_NAMES
        .choose(&mut rng)
        .copied()
        .unwrap_or("Avery")
        .to_string();
    let last_name = LAST_NAMES
        .choose(&mut rng)
        .copied()
        .unwrap_or("Barrett")
        .to_string();
    let full_name = format!("{first_name} {last_name}");

    let username = format!(
        "{}.{}{}",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        rng.gen_range(10..100)
    );

    // 20 chars over a mixed alphabet; deterministic like the rest.
    const PASSWORD_ALPHABET: &[u8] =
        b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#%^&*";
    let password: String = (0..20)
        .map(|_| {
            let idx = rng.gen_range(0..PASSWORD_ALPHABET.len());
            PASSWORD_ALPHABET[idx] as char
        })
        .collect();

    let year = rng.gen_range(1981..2001);
    let month = rng.gen_range(1..13);
    let day = rng.gen_range(1..29);
    let dob = format!("{year:04}-{month:02}-{day:02}");

    let phone = format!(
        "+1{}{:03}{:04}",
        rng.gen_range(201..990),
        rng.gen_range(200..1000),
        rng.gen_range(0..10000)
    );

    let address = format!(
        "{} {} {}, Unit {}",
        rng.gen_range(100..9999),
        STREET_NAMES.choose(&mut rng).copied().unwrap_or("Oak"),
        if rng.gen_bool(0.5) { "St" } else { "Ave" },
        rng.gen_range(1..40)
    );

    let timezone = TIMEZONES
        .choose(&mut rng)
        .copied()
        .unwrap_or("America/Chicago")
        .to_string();

    Identity {
        first_name,
        last_name,
        full_name,
        username,
        password,
        dob,
        phone,
        address,
        timezone,
    }
}

/// One adjective-noun seed phrase from OS entropy.
pub fn seed_phrase() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("maple");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("circuit");
    format!("{adjective}-{noun}")
}

/// `count` unique seed phrases.
pub fn seed_phrases(count: usize) -> Vec<String> {
    let mut phrases = BTreeSet::new();
    // Pool is ~8000 pairs; caller counts are small.
    let cap = count.min(ADJECTIVES.len() * NOUNS.len());
    while phrases.len() < cap {
        phrases.insert(seed_phrase());
    }
    phrases.into_iter().collect()
}

/// Short label suffix derived from a seed, used in alias email examples.
pub fn seed_suffix(seed: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    seed.hash(&mut hasher);
    format!("{:03x}", hasher.finish() & 0xfff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_identity() {
        let a = generate(Some("maple-circuit"));
        let b = generate(Some("maple-circuit"));
        assert_eq!(a.full_name, b.full_name);
        assert_eq!(a.dob, b.dob);
        assert_eq!(a.phone, b.phone);
        assert_eq!(a.password, b.password);
        assert_eq!(a.timezone, b.timezone);
    }

    #[test]
    fn different_seeds_differ() {
        let names: BTreeSet<String> = ["maple-circuit", "frost-anvil", "cobalt-weir", "wren-latch"]
            .iter()
            .map(|seed| {
                let id = generate(Some(seed));
                format!("{} {} {}", id.full_name, id.dob, id.phone)
            })
            .collect();
        assert!(names.len() >= 3, "distinct seeds should rarely collide");
    }

    #[test]
    fn identity_fields_are_plausible() {
        let id = generate(Some("sable-chord"));
        assert!(id.full_name.contains(' '));
        assert_eq!(id.password.len(), 20);
        assert!(id.phone.starts_with("+1"));
        assert_eq!(id.dob.len(), 10);
        assert!(TIMEZONES.contains(&id.timezone.as_str()));
        assert!(id.username.contains('.'));
    }

    #[test]
    fn seed_phrases_are_unique_and_word_pairs() {
        let phrases = seed_phrases(25);
        assert_eq!(phrases.len(), 25);
        let unique: BTreeSet<_> = phrases.iter().collect();
        assert_eq!(unique.len(), 25);
        for phrase in &phrases {
            let (adjective, noun) = phrase.split_once('-').unwrap();
            assert!(ADJECTIVES.contains(&adjective));
            assert!(NOUNS.contains(&noun));
        }
    }
}
