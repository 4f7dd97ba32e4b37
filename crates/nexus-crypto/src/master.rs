// Versioned master secret for keyed derivation

use nexus_error::{CryptoError, CryptoResult};

/// Rotatable master secret.
///
/// The version is recorded in every wallet record's `owner_key_ref`, so a
/// rotation never orphans existing records: derivation for an old record
/// uses the master key version named by its ref.
#[derive(Clone)]
pub struct MasterKey {
    version: u32,
    secret: Vec<u8>,
}

impl MasterKey {
    /// Minimum secret length in bytes
    pub const MIN_SECRET_LEN: usize = 32;

    pub fn new(version: u32, secret: Vec<u8>) -> CryptoResult<Self> {
        if secret.len() < Self::MIN_SECRET_LEN {
            return Err(CryptoError::InvalidMasterKey(format!(
                "secret must be at least {} bytes, got {}",
                Self::MIN_SECRET_LEN,
                secret.len()
            )));
        }
        Ok(Self { version, secret })
    }

    /// Parse a hex-encoded secret, as carried in configuration
    pub fn from_hex(version: u32, hex_secret: &str) -> CryptoResult<Self> {
        let secret = hex::decode(hex_secret.trim_start_matches("0x"))
            .map_err(|e| CryptoError::InvalidMasterKey(format!("not valid hex: {}", e)))?;
        Self::new(version, secret)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Reference string recorded on derived records, e.g. `hmac:v1`
    pub fn key_ref(&self) -> String {
        format!("hmac:v{}", self.version)
    }
}

impl std::fmt::Debug for MasterKey {
    // never print the secret
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("version", &self.version)
            .field("secret", &"<redacted>")
            .finish()
    }
}
