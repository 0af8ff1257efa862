//! Tamper-evident tags for `(trait, dataset)` pairs.
//!
//! The display layer sends tags back when it asks for sample data; a tag
//! that does not verify means the pair was edited client-side.

use std::fmt;

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{GnSearchError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Hex characters of the digest kept in a tag.
const DIGEST_CHARS: usize = 20;

#[derive(Clone)]
pub struct DataHmac {
    mac: HmacSha1,
}

impl DataHmac {
    pub fn new(secret: &[u8]) -> Result<Self> {
        let mac = HmacSha1::new_from_slice(secret)
            .map_err(|e| GnSearchError::ConfigError(format!("invalid HMAC secret: {e}")))?;
        Ok(Self { mac })
    }

    /// First 20 hex characters of HMAC-SHA1 over `message`.
    pub fn digest(&self, message: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        let mut digest = hex::encode(mac.finalize().into_bytes());
        digest.truncate(DIGEST_CHARS);
        digest
    }

    /// `"{name}:{dataset}:{digest}"`
    pub fn tag(&self, name: &str, dataset: &str) -> String {
        let message = format!("{name}:{dataset}");
        let digest = self.digest(&message);
        format!("{message}:{digest}")
    }

    /// Checks a tag in constant time and returns its `(name, dataset)` pair.
    pub fn verify<'a>(&self, tagged: &'a str) -> Option<(&'a str, &'a str)> {
        let (message, digest) = tagged.rsplit_once(':')?;
        if digest.len() != DIGEST_CHARS {
            return None;
        }
        let expected = hex::decode(digest).ok()?;
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        mac.verify_truncated_left(&expected).ok()?;
        message.split_once(':')
    }
}

impl fmt::Debug for DataHmac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataHmac").finish_non_exhaustive()
    }
}
