// Deterministic owner-key and salt derivation

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use nexus_error::{CryptoError, CryptoResult};
use nexus_types::{ChainFamily, Identity, IdentityKey, OwnerPublicKey, Salt, SocialType};

use crate::master::MasterKey;
use crate::owner::{OwnerKey, SigningMaterial};

type HmacSha256 = Hmac<Sha256>;

// Domain-separation labels. One label per purpose and family so no two
// derivations can ever collide.
const LABEL_OWNER_EVM: &[u8] = b"nexus/v1/owner-key/evm";
const LABEL_OWNER_SVM: &[u8] = b"nexus/v1/owner-key/svm";
const LABEL_DEPLOY_SALT: &[u8] = b"nexus/v1/deploy-salt";
const LABEL_COMMITMENT: &[u8] = b"nexus/v1/identity-commitment";

/// Deterministic, keyed derivation of owner keys and deployment salts.
///
/// Same inputs always yield the same outputs, across restarts and
/// processes. All derivations are HMAC-SHA256 under the master secret;
/// only [`KeyDeriver::identity_commitment`] is a pure hash of public fields.
pub struct KeyDeriver {
    master: MasterKey,
}

impl KeyDeriver {
    pub fn new(master: MasterKey) -> Self {
        Self { master }
    }

    pub fn master_version(&self) -> u32 {
        self.master.version()
    }

    /// Derive the owner keypair for an identity on a chain family.
    ///
    /// EVM owners are secp256k1; the candidate scalar is re-derived with an
    /// incremented counter in the rare case it falls outside the field.
    /// SVM owners are ed25519, where every 32-byte seed is valid.
    pub fn derive_owner_key(
        &self,
        identity_key: &IdentityKey,
        family: ChainFamily,
    ) -> CryptoResult<OwnerKey> {
        validate_identity_key(identity_key)?;

        let (public_key, signing) = match family {
            ChainFamily::Evm => {
                let mut counter: u32 = 0;
                loop {
                    let seed = self.prf(LABEL_OWNER_EVM, identity_key.as_bytes(), counter);
                    if let Ok(sk) = k256::ecdsa::SigningKey::from_bytes(&seed.into()) {
                        let public = sk.verifying_key().to_encoded_point(true).as_bytes().to_vec();
                        break (OwnerPublicKey(public), SigningMaterial::Secp256k1(sk));
                    }
                    counter = counter.checked_add(1).ok_or_else(|| {
                        CryptoError::KeyDerivation("secp256k1 counter exhausted".to_string())
                    })?;
                }
            }
            ChainFamily::Svm => {
                let seed = self.prf(LABEL_OWNER_SVM, identity_key.as_bytes(), 0);
                let sk = ed25519_dalek::SigningKey::from_bytes(&seed);
                let public = sk.verifying_key().to_bytes().to_vec();
                (OwnerPublicKey(public), SigningMaterial::Ed25519(sk))
            }
        };

        Ok(OwnerKey::new(
            family,
            public_key,
            self.master.key_ref(),
            signing,
        ))
    }

    /// Derive the deterministic deployment salt for an identity.
    ///
    /// The salt has its own domain label, so it never coincides with any
    /// owner-key seed. One salt serves both families (CREATE2 salt on EVM,
    /// PDA seed on SVM).
    pub fn derive_salt(&self, identity_key: &IdentityKey) -> CryptoResult<Salt> {
        validate_identity_key(identity_key)?;
        Ok(Salt(self.prf(LABEL_DEPLOY_SALT, identity_key.as_bytes(), 0)))
    }

    /// Public identity commitment: a pure hash of the canonical identity
    /// key. Safe to publish; carries no signing capability.
    pub fn identity_commitment(identity: &Identity) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(LABEL_COMMITMENT);
        hasher.update([0u8]);
        hasher.update(identity.identity_key().as_bytes());
        hasher.finalize().into()
    }

    fn prf(&self, label: &[u8], input: &[u8], counter: u32) -> [u8; 32] {
        // new_from_slice only fails on zero-length keys, which MasterKey
        // construction already rules out
        let mut mac = HmacSha256::new_from_slice(self.master.secret())
            .expect("master key length validated on construction");
        mac.update(label);
        mac.update(&[0u8]);
        mac.update(input);
        mac.update(&counter.to_be_bytes());
        mac.finalize().into_bytes().into()
    }
}

/// Validate a canonical identity key: `{social_type}:{social_id}` with a
/// recognized type and non-empty id.
fn validate_identity_key(identity_key: &IdentityKey) -> CryptoResult<()> {
    let raw = identity_key.as_str();
    let (prefix, id) = raw
        .split_once(':')
        .ok_or_else(|| CryptoError::invalid_identity(format!("malformed identity key: {raw}")))?;
    prefix
        .parse::<SocialType>()
        .map_err(|_| CryptoError::invalid_identity(format!("unrecognized social type: {prefix}")))?;
    if id.is_empty() {
        return Err(CryptoError::invalid_identity("empty social id"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deriver() -> KeyDeriver {
        KeyDeriver::new(MasterKey::new(1, vec![42u8; 32]).unwrap())
    }

    fn key(s: &str) -> IdentityKey {
        IdentityKey::new(s)
    }

    #[test]
    fn derivation_is_pure() {
        let d = deriver();
        let k = key("email:alice@example.com");
        for family in [ChainFamily::Evm, ChainFamily::Svm] {
            let a = d.derive_owner_key(&k, family).unwrap();
            let b = d.derive_owner_key(&k, family).unwrap();
            assert_eq!(a.public_key(), b.public_key());
        }
        assert_eq!(d.derive_salt(&k).unwrap(), d.derive_salt(&k).unwrap());
    }

    #[test]
    fn families_are_domain_separated() {
        let d = deriver();
        let k = key("email:alice@example.com");
        let evm = d.derive_owner_key(&k, ChainFamily::Evm).unwrap();
        let svm = d.derive_owner_key(&k, ChainFamily::Svm).unwrap();
        assert_ne!(evm.public_key(), svm.public_key());
        // encodings differ too: compressed SEC1 vs raw ed25519
        assert_eq!(evm.public_key().as_bytes().len(), 33);
        assert_eq!(svm.public_key().as_bytes().len(), 32);
    }

    #[test]
    fn different_identities_get_different_keys() {
        let d = deriver();
        let alice = d
            .derive_owner_key(&key("email:alice@example.com"), ChainFamily::Evm)
            .unwrap();
        let bob = d
            .derive_owner_key(&key("email:bob@example.com"), ChainFamily::Evm)
            .unwrap();
        assert_ne!(alice.public_key(), bob.public_key());
    }

    #[test]
    fn master_key_matters() {
        let a = KeyDeriver::new(MasterKey::new(1, vec![1u8; 32]).unwrap());
        let b = KeyDeriver::new(MasterKey::new(1, vec![2u8; 32]).unwrap());
        let k = key("email:alice@example.com");
        assert_ne!(
            a.derive_owner_key(&k, ChainFamily::Evm).unwrap().public_key(),
            b.derive_owner_key(&k, ChainFamily::Evm).unwrap().public_key()
        );
    }

    #[test]
    fn salt_is_not_an_owner_seed() {
        let d = deriver();
        let k = key("email:alice@example.com");
        let salt = d.derive_salt(&k).unwrap();
        let svm = d.derive_owner_key(&k, ChainFamily::Svm).unwrap();
        // the SVM public key is derived from the owner seed; identical
        // seed and salt would be a domain-separation failure
        assert_ne!(&salt.0[..], svm.public_key().as_bytes());
    }

    #[test]
    fn invalid_identities_are_rejected() {
        let d = deriver();
        assert!(d
            .derive_owner_key(&key("email:"), ChainFamily::Evm)
            .is_err());
        assert!(d
            .derive_owner_key(&key("carrier-pigeon:alice"), ChainFamily::Evm)
            .is_err());
        assert!(d.derive_owner_key(&key("no-colon"), ChainFamily::Evm).is_err());
        assert!(d.derive_salt(&key("email:")).is_err());
    }

    #[test]
    fn key_ref_records_master_version() {
        let d = KeyDeriver::new(MasterKey::new(3, vec![9u8; 32]).unwrap());
        let k = d
            .derive_owner_key(&key("email:alice@example.com"), ChainFamily::Svm)
            .unwrap();
        assert_eq!(k.key_ref(), "hmac:v3");
    }

    #[test]
    fn commitment_is_pure_and_public() {
        let id = Identity::new("alice@example.com", SocialType::Email);
        assert_eq!(
            KeyDeriver::identity_commitment(&id),
            KeyDeriver::identity_commitment(&id)
        );
        let other = Identity::new("bob@example.com", SocialType::Email);
        assert_ne!(
            KeyDeriver::identity_commitment(&id),
            KeyDeriver::identity_commitment(&other)
        );
    }

    #[test]
    fn signatures_verify_roundtrip() {
        use ed25519_dalek::Verifier as _;

        let d = deriver();
        let k = key("email:alice@example.com");
        let owner = d.derive_owner_key(&k, ChainFamily::Svm).unwrap();
        let sig_bytes = owner.sign(b"user operation");
        let sig = ed25519_dalek::Signature::from_slice(&sig_bytes).unwrap();
        let vk = ed25519_dalek::VerifyingKey::from_bytes(
            owner.public_key().as_bytes().try_into().unwrap(),
        )
        .unwrap();
        assert!(vk.verify(b"user operation", &sig).is_ok());
    }
}
