//! Document identifiers.
//!
//! Identifiers are 12 bytes rendered as 24 lowercase hex characters:
//! 4 bytes of big-endian Unix seconds, 5 process-random bytes and a 3-byte
//! wrapping counter. They sort roughly by creation time.

use core::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::DomainError;

const ID_LEN: usize = 12;

/// Identifier of a stored document (event or registration).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId([u8; ID_LEN]);

struct ProcessSeed {
    unique: [u8; 5],
    counter: AtomicU32,
}

fn process_seed() -> &'static ProcessSeed {
    static SEED: OnceLock<ProcessSeed> = OnceLock::new();
    SEED.get_or_init(|| {
        let random = Uuid::new_v4();
        let bytes = random.as_bytes();
        let mut unique = [0u8; 5];
        unique.copy_from_slice(&bytes[..5]);
        let start = u32::from_be_bytes([0, bytes[5], bytes[6], bytes[7]]);
        ProcessSeed {
            unique,
            counter: AtomicU32::new(start),
        }
    })
}

impl DocumentId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        let seed = process_seed();
        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let count = seed.counter.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; ID_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&seed.unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Whether `s` has the shape of an identifier (24 hex characters).
    pub fn is_valid(s: &str) -> bool {
        s.len() == ID_LEN * 2 && s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for DocumentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(s) {
            return Err(DomainError::invalid_id(format!(
                "expected 24 hex characters, got {s:?}"
            )));
        }

        let mut bytes = [0u8; ID_LEN];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            // Both bytes are ASCII hex digits (checked above).
            let pair = core::str::from_utf8(chunk).map_err(|e| DomainError::invalid_id(e.to_string()))?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|e| DomainError::invalid_id(e.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
