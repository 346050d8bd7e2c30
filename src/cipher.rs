// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Authenticated encryption of individual slots.

use crate::{Address, OramError};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use rand::{CryptoRng, RngCore};

/// The length in bytes of a [`RecordCipher`] key.
pub const KEY_SIZE: usize = 32;
/// The length in bytes of the random nonce prepended to every ciphertext.
pub const NONCE_SIZE: usize = 12;
/// The length in bytes of the authentication tag appended to every ciphertext.
pub const TAG_SIZE: usize = 16;
/// The number of bytes a ciphertext is longer than its plaintext.
pub const CIPHERTEXT_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// AES-256-GCM under a single key held for the lifetime of an ORAM.
///
/// Every call to [`RecordCipher::seal`] draws a fresh nonce, so sealing the same plaintext twice
/// yields unrelated ciphertexts. The slot address is bound as associated data: a ciphertext copied
/// into a different slot will not open.
pub struct RecordCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for RecordCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCipher").finish_non_exhaustive()
    }
}

impl RecordCipher {
    /// Returns a cipher under a key freshly drawn from `rng`.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut key);
        Self::from_key(&key)
    }

    /// Returns a cipher under `key`.
    pub fn from_key(key: &[u8; KEY_SIZE]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypts `plaintext` for storage at `slot`. The output is exactly
    /// `plaintext.len() + CIPHERTEXT_OVERHEAD` bytes long.
    pub fn seal<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        slot: Address,
        rng: &mut R,
    ) -> Result<Vec<u8>, OramError> {
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce);

        let aad = slot.to_le_bytes();
        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| OramError::EncryptionError)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + sealed.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&sealed);
        Ok(result)
    }

    /// Decrypts a ciphertext read from `slot`.
    ///
    /// # Errors
    ///
    /// Returns an `AuthenticationError` if the ciphertext was modified, was produced under a different key,
    /// or was produced for a different slot.
    pub fn open(&self, ciphertext: &[u8], slot: Address) -> Result<Vec<u8>, OramError> {
        if ciphertext.len() < CIPHERTEXT_OVERHEAD {
            return Err(OramError::AuthenticationError);
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);

        let aad = slot.to_le_bytes();
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: &aad,
                },
            )
            .map_err(|_| OramError::AuthenticationError)
    }
}
