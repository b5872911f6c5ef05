//! Hash-based commitments to share values.
//!
//! A commitment is `hex(SHA-256(decimal(value) || blinding))`. This binds the
//! value for auditing but is not homomorphic: commitments from different voters
//! cannot be combined, which is why the tally aggregates raw shares. A Pedersen
//! commitment would remove that restriction.

use crate::*;
use digest::Digest;
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;
use std::fmt;

/// A hex encoded SHA-256 commitment digest
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Commitment(pub String);

impl Commitment {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Commitment {
    fn from(s: String) -> Self {
        Commitment(s)
    }
}

impl From<&str> for Commitment {
    fn from(s: &str) -> Self {
        Commitment(s.to_owned())
    }
}

/// Commit to a value with a blinding factor
pub fn commit(value: u64, blinding: &str) -> Commitment {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hasher.update(blinding.as_bytes());
    Commitment(hex::encode(hasher.finalize()))
}

/// Recompute the commitment and compare against the given digest
pub fn verify_commitment(value: u64, blinding: &str, commitment: &Commitment) -> bool {
    let expected = commit(value, blinding);
    constant_time_eq(expected.as_str().as_bytes(), commitment.as_str().as_bytes())
}

/// Draw a fresh random blinding factor (16 bytes, hex encoded)
pub fn generate_blinding<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
