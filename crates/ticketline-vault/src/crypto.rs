// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.
//!
//! Blob layout: `nonce (12) || tag (16) || ciphertext`.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use ticketline_core::TicketlineError;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Bytes a blob carries in addition to its plaintext.
pub const BLOB_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// A 256-bit media key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MediaKey([u8; 32]);

impl MediaKey {
    /// Derive the key as the SHA-256 digest of a passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn less_safe(&self) -> Result<LessSafeKey, TicketlineError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.0)
            .map_err(|_| TicketlineError::Vault("failed to create AES-256-GCM key".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl std::fmt::Debug for MediaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MediaKey([REDACTED])")
    }
}

/// Encrypt `plaintext` into a self-contained blob.
pub fn seal(key: &MediaKey, plaintext: &[u8]) -> Result<Vec<u8>, TicketlineError> {
    let less_safe = key.less_safe()?;

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| TicketlineError::Vault("failed to generate random nonce".to_string()))?;

    let mut ciphertext = plaintext.to_vec();
    let tag = less_safe
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut ciphertext,
        )
        .map_err(|_| TicketlineError::Vault("AES-256-GCM encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(BLOB_OVERHEAD + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(tag.as_ref());
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`seal`].
///
/// Fails if the blob is truncated, the key is wrong, or any byte was altered.
pub fn open(key: &MediaKey, blob: &[u8]) -> Result<Vec<u8>, TicketlineError> {
    if blob.len() < BLOB_OVERHEAD {
        return Err(TicketlineError::Vault(format!(
            "blob too short: {} bytes, need at least {BLOB_OVERHEAD}",
            blob.len()
        )));
    }
    let less_safe = key.less_safe()?;

    let (nonce_bytes, rest) = blob.split_at(NONCE_LEN);
    let (tag_bytes, ciphertext) = rest.split_at(TAG_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| TicketlineError::Vault("malformed nonce".to_string()))?;

    let mut in_out = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(tag_bytes);
    let plaintext_len = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            TicketlineError::Vault(
                "AES-256-GCM decryption failed -- wrong key or corrupted data".to_string(),
            )
        })?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}
