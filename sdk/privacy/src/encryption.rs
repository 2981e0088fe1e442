//! Note Encryption
//!
//! Encrypts a note's spending data for its recipient using ECDH +
//! ChaCha20-Poly1305.
//!
//! ```text
//! Flow:
//! 1. Sender generates ephemeral keypair (epk, esk)
//! 2. Shared secret = ECDH(esk, recipient_pk)
//! 3. Encryption key = HKDF(shared_secret, "velum-note-v1")
//! 4. Ciphertext = ChaCha20-Poly1305(key, nonce, plaintext)
//! 5. Output = (epk, nonce, ciphertext, tag)
//! ```

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::commitment::Commitment;
use crate::hash::FieldHash;
use crate::note::ConfidentialNote;

/// An encrypted note (published alongside its commitment)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedNote {
    /// Ephemeral public key for ECDH
    #[serde(with = "hex::serde")]
    pub ephemeral_pk: [u8; 32],
    /// Nonce for ChaCha20-Poly1305
    #[serde(with = "hex::serde")]
    pub nonce: [u8; 12],
    /// Encrypted note data with authentication tag
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
}

/// Note plaintext format for encryption
#[derive(Debug, Clone)]
struct NotePlaintext {
    value: u64,
    secret: [u8; 32],
    salt: [u8; 32],
    /// Optional memo (up to 512 bytes)
    memo: Vec<u8>,
}

impl EncryptedNote {
    /// Fixed overhead: epk + nonce + tag
    pub const OVERHEAD: usize = 32 + 12 + 16;

    /// Get the ephemeral public key
    pub fn ephemeral_public_key(&self) -> &[u8; 32] {
        &self.ephemeral_pk
    }
}

/// Encrypt a note for a recipient
///
/// The plaintext carries everything the recipient needs to spend: value,
/// secret, and salt.
///
/// # Arguments
/// * `note` - The note to encrypt
/// * `recipient_pk` - Recipient's X25519 public key
/// * `memo` - Optional memo (max 512 bytes)
pub fn encrypt_note(
    note: &ConfidentialNote,
    recipient_pk: &[u8; 32],
    memo: Option<&[u8]>,
) -> EncryptedNote {
    let mut rng = rand::thread_rng();
    let ephemeral_secret = EphemeralSecret::random_from_rng(&mut rng);
    let ephemeral_pk = PublicKey::from(&ephemeral_secret);

    // ECDH shared secret
    let recipient_key = PublicKey::from(*recipient_pk);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient_key);

    let encryption_key = derive_note_key(shared_secret.as_bytes(), ephemeral_pk.as_bytes());

    let plaintext = NotePlaintext {
        value: note.value.0,
        secret: note.secret,
        salt: note.salt,
        memo: memo
            .map(|m| m[..m.len().min(512)].to_vec())
            .unwrap_or_default(),
    };

    let plaintext_bytes = serialize_plaintext(&plaintext);

    let mut nonce_bytes = [0u8; 12];
    use rand::RngCore;
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&encryption_key).expect("valid key length");

    let ciphertext = cipher
        .encrypt(nonce, plaintext_bytes.as_slice())
        .expect("encryption should not fail");

    EncryptedNote {
        ephemeral_pk: *ephemeral_pk.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    }
}

/// Decrypt a note using the recipient's secret key
///
/// Returns the reconstructed note and the memo, or None if the key is wrong
/// or the payload is malformed.
pub fn decrypt_note(
    encrypted: &EncryptedNote,
    recipient_sk: &[u8; 32],
) -> Option<(ConfidentialNote, Vec<u8>)> {
    let secret = StaticSecret::from(*recipient_sk);
    let ephemeral_pk = PublicKey::from(encrypted.ephemeral_pk);
    let shared_secret = secret.diffie_hellman(&ephemeral_pk);

    let decryption_key = derive_note_key(shared_secret.as_bytes(), &encrypted.ephemeral_pk);

    let cipher = ChaCha20Poly1305::new_from_slice(&decryption_key).ok()?;
    let nonce = Nonce::from_slice(&encrypted.nonce);

    let plaintext_bytes = cipher
        .decrypt(nonce, encrypted.ciphertext.as_slice())
        .ok()?;

    let plaintext = deserialize_plaintext(&plaintext_bytes)?;

    let note =
        ConfidentialNote::from_parts(plaintext.value, plaintext.secret, plaintext.salt).ok()?;

    Some((note, plaintext.memo))
}

/// Try to decrypt a note (scan mode - for wallet scanning)
///
/// Returns the note only if decryption succeeds and the recomputed
/// commitment matches the one published on the ledger.
pub fn try_decrypt_note(
    encrypted: &EncryptedNote,
    recipient_sk: &[u8; 32],
    expected_commitment: &Commitment,
    hasher: &dyn FieldHash,
) -> Option<(ConfidentialNote, Vec<u8>)> {
    let (note, memo) = decrypt_note(encrypted, recipient_sk)?;

    if note.commitment(hasher) == *expected_commitment {
        Some((note, memo))
    } else {
        None
    }
}

/// Derive encryption key from shared secret
fn derive_note_key(shared_secret: &[u8], ephemeral_pk: &[u8]) -> [u8; 32] {
    // HKDF using blake3
    let mut hasher = blake3::Hasher::new_derive_key("velum-note-v1");
    hasher.update(shared_secret);
    hasher.update(ephemeral_pk);
    *hasher.finalize().as_bytes()
}

/// Serialize plaintext for encryption
fn serialize_plaintext(pt: &NotePlaintext) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + 32 + 32 + 2 + pt.memo.len());

    // Value (8 bytes, little-endian)
    bytes.extend_from_slice(&pt.value.to_le_bytes());

    // Secret (32 bytes) + salt (32 bytes)
    bytes.extend_from_slice(&pt.secret);
    bytes.extend_from_slice(&pt.salt);

    // Memo length (2 bytes) + memo
    let memo_len = pt.memo.len() as u16;
    bytes.extend_from_slice(&memo_len.to_le_bytes());
    bytes.extend_from_slice(&pt.memo);

    bytes
}

/// Deserialize plaintext after decryption
fn deserialize_plaintext(bytes: &[u8]) -> Option<NotePlaintext> {
    if bytes.len() < 74 {
        return None; // 8 + 32 + 32 + 2 minimum
    }

    let value = u64::from_le_bytes(bytes[0..8].try_into().ok()?);
    let secret: [u8; 32] = bytes[8..40].try_into().ok()?;
    let salt: [u8; 32] = bytes[40..72].try_into().ok()?;
    let memo_len = u16::from_le_bytes(bytes[72..74].try_into().ok()?) as usize;

    if bytes.len() < 74 + memo_len {
        return None;
    }

    let memo = bytes[74..74 + memo_len].to_vec();

    Some(NotePlaintext {
        value,
        secret,
        salt,
        memo,
    })
}
