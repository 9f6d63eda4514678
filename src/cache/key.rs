//! Cache key derivation.
//!
//! A key is the hex SHA-256 of the job parameters that determine the
//! output image. Delivery details (webhook URL, request id) are left out so
//! the same image settings always share one entry.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::ImageJob;

/// Length of a rendered key: 32 digest bytes as lowercase hex.
pub const CACHE_KEY_LEN: usize = 64;

/// Content-addressed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the cache key for a validated job.
///
/// Fields go through a `BTreeMap`, so the canonical JSON has sorted keys no
/// matter how the job was built.
pub fn derive_key(job: &ImageJob) -> CacheKey {
    // -0.0 and 0.0 are the same threshold
    let threshold = if job.threshold == 0.0 { 0.0 } else { job.threshold };

    let mut parts: BTreeMap<&str, Value> = BTreeMap::new();
    parts.insert("background_type", Value::from(job.background_type.as_str()));
    parts.insert("format", Value::from(job.format.as_str()));
    parts.insert("image_url", Value::from(job.image_url.as_str()));
    parts.insert("reverse", Value::from(job.reverse));
    parts.insert("threshold", Value::from(threshold));

    let canonical = Value::Object(
        parts
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
    .to_string();

    let digest = Sha256::digest(canonical.as_bytes());
    CacheKey(hex::encode(digest))
}
