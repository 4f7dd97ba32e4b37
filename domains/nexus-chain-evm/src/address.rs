// EVM address arithmetic: keccak, CREATE2, EIP-55

use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use nexus_error::{ChainError, ChainResult};
use nexus_types::{Address, OwnerPublicKey, Salt};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Parse a 20-byte 0x-hex address
pub fn parse_address(s: &str) -> ChainResult<[u8; 20]> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped)
        .map_err(|e| ChainError::InvalidAddress(format!("{s}: {e}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ChainError::InvalidAddress(format!("{s}: expected 20 bytes")))
}

/// Parse a 32-byte 0x-hex word (init code hash)
pub fn parse_word(s: &str) -> ChainResult<[u8; 32]> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes =
        hex::decode(stripped).map_err(|e| ChainError::InvalidAddress(format!("{s}: {e}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ChainError::InvalidAddress(format!("{s}: expected 32 bytes")))
}

/// EIP-55 mixed-case checksum encoding
pub fn to_checksum(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let digest = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (digest[i / 2] >> (4 * (1 - i % 2))) & 0xf;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Address of the externally-owned owner account, from its compressed
/// secp256k1 public key: keccak of the uncompressed point, last 20 bytes.
pub fn owner_address(owner: &OwnerPublicKey) -> ChainResult<[u8; 20]> {
    let point = k256::PublicKey::from_sec1_bytes(owner.as_bytes())
        .map_err(|e| ChainError::InvalidAddress(format!("owner key not secp256k1: {e}")))?;
    let uncompressed = point.to_encoded_point(false);
    // skip the 0x04 tag byte
    let digest = keccak256(&uncompressed.as_bytes()[1..]);
    Ok(digest[12..32].try_into().expect("keccak output is 32 bytes"))
}

/// CREATE2 wallet address prediction.
///
/// The deployment salt is bound to the owner so two identities can never
/// collide under one factory: `effective_salt = keccak(salt || owner)`.
/// `predicted = keccak(0xff || factory || effective_salt || init_code_hash)[12..]`
pub fn create2_address(
    factory: &[u8; 20],
    init_code_hash: &[u8; 32],
    owner: &OwnerPublicKey,
    salt: &Salt,
) -> ChainResult<Address> {
    let owner_addr = owner_address(owner)?;

    let mut salt_input = Vec::with_capacity(52);
    salt_input.extend_from_slice(salt.as_bytes());
    salt_input.extend_from_slice(&owner_addr);
    let effective_salt = keccak256(&salt_input);

    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(factory);
    preimage.extend_from_slice(&effective_salt);
    preimage.extend_from_slice(init_code_hash);
    let digest = keccak256(&preimage);

    let addr: [u8; 20] = digest[12..32].try_into().expect("keccak output is 32 bytes");
    Ok(Address::new(to_checksum(&addr)))
}

/// ABI-encoded calldata for `deployWallet(address owner, bytes32 salt)`
pub fn deploy_calldata(owner: &OwnerPublicKey, salt: &Salt) -> ChainResult<Vec<u8>> {
    let selector = &keccak256(b"deployWallet(address,bytes32)")[..4];
    let owner_addr = owner_address(owner)?;

    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(selector);
    // address argument, left-padded to a 32-byte word
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&owner_addr);
    data.extend_from_slice(salt.as_bytes());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_types::ChainFamily;

    fn owner() -> OwnerPublicKey {
        let deriver = nexus_crypto::KeyDeriver::new(
            nexus_crypto::MasterKey::new(1, vec![5u8; 32]).unwrap(),
        );
        deriver
            .derive_owner_key(
                &nexus_types::IdentityKey::new("email:alice@example.com"),
                ChainFamily::Evm,
            )
            .unwrap()
            .public_key()
            .clone()
    }

    #[test]
    fn keccak_empty_vector() {
        // well-known keccak256("") digest
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn checksum_known_vector() {
        // EIP-55 reference vector
        let addr = parse_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            to_checksum(&addr),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn create2_is_pure() {
        let factory = parse_address("0x00000000000000000000000000000000000000f1").unwrap();
        let init = [1u8; 32];
        let salt = Salt([2u8; 32]);
        let owner = owner();
        let a = create2_address(&factory, &init, &owner, &salt).unwrap();
        let b = create2_address(&factory, &init, &owner, &salt).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 42);
        assert!(a.as_str().starts_with("0x"));
    }

    #[test]
    fn create2_depends_on_salt_and_owner() {
        let factory = parse_address("0x00000000000000000000000000000000000000f1").unwrap();
        let init = [1u8; 32];
        let owner = owner();
        let a = create2_address(&factory, &init, &owner, &Salt([2u8; 32])).unwrap();
        let b = create2_address(&factory, &init, &owner, &Salt([3u8; 32])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn calldata_layout() {
        let owner = owner();
        let salt = Salt([7u8; 32]);
        let data = deploy_calldata(&owner, &salt).unwrap();
        assert_eq!(data.len(), 4 + 32 + 32);
        // bytes32 salt occupies the last word verbatim
        assert_eq!(&data[36..], salt.as_bytes());
        // address word is left-padded with zeros
        assert_eq!(&data[4..16], &[0u8; 12]);
    }
}
