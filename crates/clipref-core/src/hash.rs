//! Content hashing and id generation.
//!
//! Neither function is cryptographic. Hashes only deduplicate highlights and
//! ids only key in-memory maps and persisted records of a single user.

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;

const ID_SUFFIX_LEN: usize = 9;

/// Generates an id of the form `{epoch_ms_base36}-{random}`.
pub fn generate_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    format!("{}-{}", to_base36(millis), suffix)
}

/// Computes a fast, deterministic hash of `content`.
///
/// Uses the classic `h * 31 + c` rolling hash with 32-bit wrapping, rendered
/// as base36 of the absolute value. Collisions are tolerated by callers.
pub fn content_hash(content: &str) -> String {
    let hash = content.chars().fold(0i32, |hash, c| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as i32)
    });
    to_base36(u64::from(hash.unsigned_abs()))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
