use sha2::{Digest, Sha256};

/// SHA-256 of the raw message text, as 64 lowercase hex characters.
///
/// This is the deduplication key for stored requests: the same message
/// reposted verbatim (in the same or another chat) hashes identically.
/// No normalization is applied, so edited reposts are stored separately.
pub fn compute_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
