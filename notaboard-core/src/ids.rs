/// Id generation for projects and cards.
///
/// Ids look like `<prefix>_<segment>` where the segment is 8 base-36
/// characters. There is no collision detection; ids only need to be unique
/// within one local workspace.
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

const SEGMENT_LEN: usize = 8;
const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new id with the given prefix, e.g. `c_k3x9a0qz`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, random_segment())
}

/// Atomic counter plus nanosecond timestamp, hashed via SHA-256 for a
/// uniform distribution, then written out in base 36.
fn random_segment() -> String {
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(seq.to_le_bytes());
    hasher.update(ts.to_le_bytes());
    let hash = hasher.finalize();

    let mut value = u64::from_le_bytes([
        hash[0], hash[1], hash[2], hash[3], hash[4], hash[5], hash[6], hash[7],
    ]);
    let mut segment = Vec::with_capacity(SEGMENT_LEN);
    for _ in 0..SEGMENT_LEN {
        segment.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    // Only ASCII from ALPHABET was pushed.
    String::from_utf8_lossy(&segment).into_owned()
}
