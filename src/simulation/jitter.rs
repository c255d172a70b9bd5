//! Deterministic, hash-derived jitter.
//!
//! The perturbation for a key is derived from the SHA-256 digest of the
//! key's decimal string, so the same key yields the same value in every
//! process and on every run. Re-running a pipeline date therefore upserts
//! identical rows.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Decimal places jitter values are rounded to unless configured otherwise
pub const DEFAULT_PRECISION: u32 = 2;

/// Jitter magnitude attached to a simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    /// Half-width of the jitter interval, in the simulator's output unit
    pub range: f64,
    /// Decimal places the jitter is rounded to
    pub precision: u32,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl JitterConfig {
    pub fn new(range: f64) -> Self {
        Self {
            range,
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0.0)
    }

    pub fn is_enabled(&self) -> bool {
        self.range != 0.0
    }

    pub fn apply(&self, key: f64) -> f64 {
        jitter_with_precision(key, self.range, self.precision)
    }
}

/// Reproducible value in `[-range, range]` rounded to two decimals
pub fn jitter(key: f64, range: f64) -> f64 {
    jitter_with_precision(key, range, DEFAULT_PRECISION)
}

pub fn jitter_with_precision(key: f64, range: f64, precision: u32) -> f64 {
    let range = range.abs();
    if range == 0.0 || !range.is_finite() {
        return 0.0;
    }

    let digest = Sha256::digest(canonical_key(key).as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let unit = u64::from_be_bytes(head) as f64 / u64::MAX as f64;

    let raw = (unit * 2.0 - 1.0) * range;
    let scale = 10f64.powi(precision as i32);
    ((raw * scale).round() / scale).clamp(-range, range)
}

// 0.0 and -0.0 must hash alike
fn canonical_key(key: f64) -> String {
    if key == 0.0 {
        "0".to_string()
    } else {
        key.to_string()
    }
}
