//! Content fingerprinting and token estimation

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use tiktoken_rs::CoreBPE;

static BPE: Lazy<CoreBPE> =
    Lazy::new(|| tiktoken_rs::cl100k_base().expect("cl100k_base vocabulary is embedded"));

/// SHA-256 fingerprint of chunk content, lowercase hex. Dedup key within a tenant.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// BPE token count of a text segment.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    BPE.encode_ordinary(text).len()
}
