// Derived owner keys

use ed25519_dalek::Signer as _;

use nexus_types::{ChainFamily, OwnerPublicKey};

/// Family-specific signing material held inside an owner key
pub(crate) enum SigningMaterial {
    /// secp256k1, used by the EVM family
    Secp256k1(k256::ecdsa::SigningKey),
    /// ed25519, used by the SVM family
    Ed25519(ed25519_dalek::SigningKey),
}

/// Owner keypair for a smart wallet on one chain family.
///
/// The public half is persisted on the wallet record; the private half lives
/// only in this process and is re-derivable from the master key. `Debug`
/// never prints key material.
pub struct OwnerKey {
    family: ChainFamily,
    public_key: OwnerPublicKey,
    key_ref: String,
    signing: SigningMaterial,
}

impl OwnerKey {
    pub(crate) fn new(
        family: ChainFamily,
        public_key: OwnerPublicKey,
        key_ref: String,
        signing: SigningMaterial,
    ) -> Self {
        Self {
            family,
            public_key,
            key_ref,
            signing,
        }
    }

    pub fn family(&self) -> ChainFamily {
        self.family
    }

    /// Public key bytes in the family's native encoding:
    /// 33-byte compressed SEC1 for EVM, 32-byte ed25519 for SVM
    pub fn public_key(&self) -> &OwnerPublicKey {
        &self.public_key
    }

    /// Reference to the deriving master key, e.g. `hmac:v1`
    pub fn key_ref(&self) -> &str {
        &self.key_ref
    }

    /// Sign a message with the owner key.
    ///
    /// Returns a 64-byte compact signature for both families (fixed-size
    /// r||s for secp256k1, standard ed25519 signature).
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.signing {
            SigningMaterial::Secp256k1(sk) => {
                let signature: k256::ecdsa::Signature = sk.sign(message);
                signature.to_bytes().to_vec()
            }
            SigningMaterial::Ed25519(sk) => sk.sign(message).to_bytes().to_vec(),
        }
    }
}

impl std::fmt::Debug for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerKey")
            .field("family", &self.family)
            .field("public_key", &self.public_key.to_string())
            .field("key_ref", &self.key_ref)
            .finish()
    }
}
