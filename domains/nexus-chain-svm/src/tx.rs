// Legacy-format SVM transaction construction

use ed25519_dalek::Signer as _;
use sha2::{Digest, Sha256};

use nexus_error::{ChainError, ChainResult};

use crate::pda::Pubkey;

/// System program id (all zeros)
pub const SYSTEM_PROGRAM: Pubkey = Pubkey([0u8; 32]);

/// Compact-u16 length prefix used throughout the wire format
pub fn shortvec_len(len: usize, out: &mut Vec<u8>) {
    let mut rem = len as u16;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Anchor-style 8-byte instruction discriminator
pub fn discriminator(name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("global:{name}").as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Instruction data for `initialize_wallet(owner, salt)`
pub fn initialize_wallet_data(owner: &[u8; 32], salt: &[u8; 32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + 64);
    data.extend_from_slice(&discriminator("initialize_wallet"));
    data.extend_from_slice(owner);
    data.extend_from_slice(salt);
    data
}

/// Build and sign a single-instruction legacy transaction that initializes
/// a wallet account.
///
/// Account layout: fee payer (writable signer), wallet PDA (writable),
/// wallet program, system program. Returns the base64 wire transaction and
/// the base58 signature used as the transaction reference.
pub fn build_initialize_wallet_tx(
    fee_payer: &ed25519_dalek::SigningKey,
    program_id: &Pubkey,
    wallet_pda: &Pubkey,
    recent_blockhash: &Pubkey,
    data: Vec<u8>,
) -> ChainResult<(String, String)> {
    let payer_pub = Pubkey(fee_payer.verifying_key().to_bytes());
    let accounts = [payer_pub, *wallet_pda, *program_id, SYSTEM_PROGRAM];

    // message header: 1 required signature, 0 readonly signed,
    // 2 readonly unsigned (program + system program)
    let mut message = vec![1u8, 0u8, 2u8];
    shortvec_len(accounts.len(), &mut message);
    for account in &accounts {
        message.extend_from_slice(account.as_bytes());
    }
    message.extend_from_slice(recent_blockhash.as_bytes());

    // one instruction: program index 2, accounts [payer, pda, system]
    shortvec_len(1, &mut message);
    message.push(2u8);
    let indexes: [u8; 3] = [0, 1, 3];
    shortvec_len(indexes.len(), &mut message);
    message.extend_from_slice(&indexes);
    shortvec_len(data.len(), &mut message);
    message.extend_from_slice(&data);

    let signature = fee_payer.sign(&message);

    let mut wire = Vec::with_capacity(1 + 64 + message.len());
    shortvec_len(1, &mut wire);
    wire.extend_from_slice(&signature.to_bytes());
    wire.extend_from_slice(&message);

    use base64::Engine as _;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&wire);
    let tx_ref = bs58::encode(signature.to_bytes()).into_string();
    if tx_ref.is_empty() {
        return Err(ChainError::protocol("empty transaction signature"));
    }
    Ok((encoded, tx_ref))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortvec_known_encodings() {
        let mut out = Vec::new();
        shortvec_len(0, &mut out);
        assert_eq!(out, [0x00]);

        out.clear();
        shortvec_len(127, &mut out);
        assert_eq!(out, [0x7f]);

        out.clear();
        shortvec_len(128, &mut out);
        assert_eq!(out, [0x80, 0x01]);

        out.clear();
        shortvec_len(16384, &mut out);
        assert_eq!(out, [0x80, 0x80, 0x01]);
    }

    #[test]
    fn discriminator_is_stable() {
        assert_eq!(
            discriminator("initialize_wallet"),
            discriminator("initialize_wallet")
        );
        assert_ne!(discriminator("initialize_wallet"), discriminator("deploy"));
    }

    #[test]
    fn built_tx_is_signed_by_fee_payer() {
        use ed25519_dalek::{Signature, Verifier as _};

        let payer = ed25519_dalek::SigningKey::from_bytes(&[4u8; 32]);
        let program = Pubkey([3u8; 32]);
        let pda = Pubkey([9u8; 32]);
        let blockhash = Pubkey([8u8; 32]);
        let data = initialize_wallet_data(&[1u8; 32], &[2u8; 32]);

        let (wire_b64, tx_ref) =
            build_initialize_wallet_tx(&payer, &program, &pda, &blockhash, data).unwrap();

        use base64::Engine as _;
        let wire = base64::engine::general_purpose::STANDARD
            .decode(wire_b64)
            .unwrap();
        // one signature, then the message
        assert_eq!(wire[0], 1);
        let sig = Signature::from_slice(&wire[1..65]).unwrap();
        let message = &wire[65..];
        payer.verifying_key().verify(message, &sig).unwrap();
        assert_eq!(bs58::encode(sig.to_bytes()).into_string(), tx_ref);
    }

    #[test]
    fn instruction_data_layout() {
        let data = initialize_wallet_data(&[1u8; 32], &[2u8; 32]);
        assert_eq!(data.len(), 72);
        assert_eq!(&data[8..40], &[1u8; 32]);
        assert_eq!(&data[40..72], &[2u8; 32]);
    }
}
