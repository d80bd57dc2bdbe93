use crate::error::SpecliftError;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of random bytes in a generated id (hex-encoded to twice as many chars).
const ID_BYTES: usize = 4;

// ---------------------------------------------------------------------------
// ChainId
// ---------------------------------------------------------------------------

/// Opaque token identifying one analysis run. Generated once per chain and
/// carried through every stage document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Generate a fresh 8-character hex id.
    ///
    /// Uses the OS random source; when that is unavailable, hashes the
    /// current time and process id instead, so this never fails.
    pub fn generate() -> Self {
        let mut buf = [0u8; ID_BYTES];
        if let Err(e) = rand::rngs::OsRng.try_fill_bytes(&mut buf) {
            tracing::warn!(error = %e, "OS random source unavailable, using time-based chain id");
            buf = fallback_bytes();
        }
        ChainId(to_hex(&buf))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn fallback_bytes() -> [u8; ID_BYTES] {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; ID_BYTES];
    out.copy_from_slice(&digest[..ID_BYTES]);
    out
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

static CHAIN_ID_RE: OnceLock<Regex> = OnceLock::new();

fn chain_id_re() -> &'static Regex {
    CHAIN_ID_RE.get_or_init(|| Regex::new(r"^[0-9a-z][0-9a-z\-]*$").unwrap())
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ChainId {
    type Err = SpecliftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > 64 || !chain_id_re().is_match(s) {
            return Err(SpecliftError::InvalidChainId(s.to_string()));
        }
        Ok(ChainId(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
