// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Fixed-size block records and their encrypted slot encoding.
//!
//! A record is serialized to exactly `RECORD_HEADER_SIZE + payload_size` bytes,
//! little endian:
//!
//! | bytes    | field                                  |
//! |----------|----------------------------------------|
//! | 0..4     | id as `i32`, `-1` for an empty record  |
//! | 4..8     | previous leaf                          |
//! | 8..12    | destination leaf                       |
//! | 12..16   | payload length                         |
//! | 16..     | payload, then random padding           |
//!
//! Everything after the id of an empty record is random. Real and empty records therefore
//! have the same length, and after sealing they cannot be told apart.

use crate::{
    cipher::{RecordCipher, CIPHERTEXT_OVERHEAD},
    Address, LeafIndex, OramError, PayloadSize,
};
use rand::{CryptoRng, RngCore};

/// The id written into empty records.
pub const DUMMY_ID: i32 = -1;
/// The number of plaintext bytes preceding the payload.
pub const RECORD_HEADER_SIZE: usize = 16;

/// Position metadata carried by an occupied record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordTags {
    /// The leaf whose path the block was fetched from on its last access.
    pub previous_leaf: LeafIndex,
    /// The leaf the block is being evicted toward.
    pub destination_leaf: LeafIndex,
}

/// The plaintext content of one slot.
#[derive(Clone, PartialEq, Eq)]
pub enum Record {
    /// A dummy record.
    Empty,
    /// A real block.
    Occupied {
        /// The logical address of the block.
        id: Address,
        /// Position metadata.
        tags: RecordTags,
        /// The block contents, at most `payload_size` bytes.
        payload: Vec<u8>,
    },
}

impl Record {
    /// Returns true if `self` is a dummy record.
    pub fn is_empty(&self) -> bool {
        matches!(self, Record::Empty)
    }

    /// Returns the id of an occupied record.
    pub fn id(&self) -> Option<Address> {
        match self {
            Record::Empty => None,
            Record::Occupied { id, .. } => Some(*id),
        }
    }

    /// Returns the destination leaf of an occupied record.
    pub fn destination_leaf(&self) -> Option<LeafIndex> {
        match self {
            Record::Empty => None,
            Record::Occupied { tags, .. } => Some(tags.destination_leaf),
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Record::Empty => write!(f, "Record::Empty"),
            Record::Occupied { id, tags, payload } => f
                .debug_struct("Record")
                .field("id", id)
                .field("tags", tags)
                .field("payload_length", &payload.len())
                .finish(),
        }
    }
}

/// Serializes records to fixed-size plaintexts and seals them for a slot.
#[derive(Debug)]
pub struct RecordCodec {
    payload_size: PayloadSize,
    cipher: RecordCipher,
}

impl RecordCodec {
    /// Returns a codec for payloads of up to `payload_size` bytes, sealing under `cipher`.
    pub fn new(payload_size: PayloadSize, cipher: RecordCipher) -> Self {
        Self {
            payload_size,
            cipher,
        }
    }

    /// The fixed payload size.
    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    /// The length P of every encoded plaintext.
    pub fn plaintext_size(&self) -> usize {
        RECORD_HEADER_SIZE + self.payload_size
    }

    /// The length B of every sealed slot.
    pub fn ciphertext_size(&self) -> usize {
        self.plaintext_size() + CIPHERTEXT_OVERHEAD
    }

    /// Encodes `record` as exactly `plaintext_size()` bytes, padding with bytes from `rng`.
    pub fn encode<R: RngCore + CryptoRng>(
        &self,
        record: &Record,
        rng: &mut R,
    ) -> Result<Vec<u8>, OramError> {
        let mut plaintext = vec![0u8; self.plaintext_size()];
        rng.fill_bytes(&mut plaintext);

        match record {
            Record::Empty => {
                plaintext[0..4].copy_from_slice(&DUMMY_ID.to_le_bytes());
            }
            Record::Occupied { id, tags, payload } => {
                if payload.len() > self.payload_size {
                    return Err(OramError::PayloadTooLargeError {
                        length: payload.len(),
                        maximum: self.payload_size,
                    });
                }
                let id = i32::try_from(*id)?;
                let length = u32::try_from(payload.len())?;
                plaintext[0..4].copy_from_slice(&id.to_le_bytes());
                plaintext[4..8].copy_from_slice(&tags.previous_leaf.to_le_bytes());
                plaintext[8..12].copy_from_slice(&tags.destination_leaf.to_le_bytes());
                plaintext[12..16].copy_from_slice(&length.to_le_bytes());
                plaintext[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + payload.len()]
                    .copy_from_slice(payload);
            }
        }
        Ok(plaintext)
    }

    /// Decodes a plaintext produced by [`RecordCodec::encode`].
    pub fn decode(&self, plaintext: &[u8]) -> Result<Record, OramError> {
        if plaintext.len() != self.plaintext_size() {
            return Err(OramError::CorruptRecordError);
        }

        let id = i32::from_le_bytes(read_word(plaintext, 0));
        if id == DUMMY_ID {
            return Ok(Record::Empty);
        }
        let id = Address::try_from(id).map_err(|_| OramError::CorruptRecordError)?;

        let length = usize::try_from(u32::from_le_bytes(read_word(plaintext, 12)))?;
        if length > self.payload_size {
            return Err(OramError::CorruptRecordError);
        }

        Ok(Record::Occupied {
            id,
            tags: RecordTags {
                previous_leaf: u32::from_le_bytes(read_word(plaintext, 4)),
                destination_leaf: u32::from_le_bytes(read_word(plaintext, 8)),
            },
            payload: plaintext[RECORD_HEADER_SIZE..RECORD_HEADER_SIZE + length].to_vec(),
        })
    }

    /// Encodes and encrypts `record` for storage at `slot`.
    pub fn seal_record<R: RngCore + CryptoRng>(
        &self,
        record: &Record,
        slot: Address,
        rng: &mut R,
    ) -> Result<Vec<u8>, OramError> {
        let plaintext = self.encode(record, rng)?;
        self.cipher.seal(&plaintext, slot, rng)
    }

    /// Decrypts and decodes the contents of `slot`.
    pub fn open_record(&self, ciphertext: &[u8], slot: Address) -> Result<Record, OramError> {
        if ciphertext.len() != self.ciphertext_size() {
            return Err(OramError::AuthenticationError);
        }
        let plaintext = self.cipher.open(ciphertext, slot)?;
        self.decode(&plaintext)
    }
}

fn read_word(bytes: &[u8], offset: usize) -> [u8; 4] {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    word
}
