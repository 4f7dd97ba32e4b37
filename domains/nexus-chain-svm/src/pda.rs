// Program-derived address search

use sha2::{Digest, Sha256};
use std::fmt;

use nexus_error::{ChainError, ChainResult};

/// Marker appended to every PDA preimage, per the SVM runtime
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// 32-byte SVM public key, displayed in base58
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from base58
    pub fn parse(s: &str) -> ChainResult<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ChainError::InvalidAddress(format!("{s}: {e}")))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ChainError::InvalidAddress(format!("{s}: expected 32 bytes")))?;
        Ok(Self(arr))
    }

    /// Whether the bytes decompress to a valid ed25519 point.
    /// PDAs must be off-curve so no private key can ever exist for them.
    pub fn is_on_curve(&self) -> bool {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0).is_ok()
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(&self.0).into_string())
    }
}

/// Find the program-derived address for a set of seeds.
///
/// Mirrors the runtime search: starting from bump 255, hash
/// `seeds || [bump] || program_id || marker` and return the first candidate
/// that is NOT a valid curve point, together with its bump.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> ChainResult<(Pubkey, u8)> {
    for seed in seeds {
        if seed.len() > 32 {
            return Err(ChainError::InvalidAddress(format!(
                "PDA seed too long: {} bytes",
                seed.len()
            )));
        }
    }

    for bump in (0u8..=255).rev() {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update([bump]);
        hasher.update(program_id.as_bytes());
        hasher.update(PDA_MARKER);
        let candidate = Pubkey(hasher.finalize().into());
        if !candidate.is_on_curve() {
            return Ok((candidate, bump));
        }
    }

    Err(ChainError::InvalidAddress(
        "no off-curve program address for seeds".to_string(),
    ))
}
