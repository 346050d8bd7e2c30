// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A recursive binary-tree Oblivious RAM.
//!
//! The client in this crate reads and writes fixed-size logical blocks held by an untrusted
//! slot store (a [`database::Database`]) so that the sequence of slots it touches is
//! independent of which block was requested, whether the request was a read or a write,
//! and what the block contains.
//!
//! Blocks live in a complete binary tree of buckets. Every access fetches the target off the
//! path to its current leaf, reinserts it at the root bound for a fresh random leaf, and then
//! pushes blocks one level down the tree ([`binary_oram`]). The map from blocks to leaves is
//! itself stored obliviously, in a smaller instance of the same scheme ([`position_map`]).
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use tree_oram::{binary_oram::RecursiveBinaryOram, database::SimpleDatabase, Oram};
//!
//! let rng = StdRng::seed_from_u64(0);
//! let mut oram = RecursiveBinaryOram::<SimpleDatabase, StdRng>::new(16, rng)?;
//! oram.put(3, b"hello")?;
//! assert_eq!(oram.get(3)?, b"hello");
//! # Ok::<(), tree_oram::OramError>(())
//! ```

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

use std::num::{ParseIntError, TryFromIntError};
use thiserror::Error;

pub mod binary_oram;
pub mod cipher;
pub mod database;
pub mod linear_time_oram;
pub mod position_map;
pub mod record;
pub mod tree;

#[cfg(test)]
mod test_utils;

/// The numeric type used to specify the size of an ORAM in blocks, and to index into the ORAM.
pub type Address = u64;
/// The numeric type used to specify the number of slots in a bucket.
pub type BucketSize = usize;
/// The numeric type used to specify the size of a block payload in bytes.
pub type PayloadSize = usize;
/// The numeric type used to name a leaf of the tree.
pub type LeafIndex = u32;

pub use binary_oram::{OramParameters, RecursiveBinaryOram};

/// The logical operation carried out by [`Oram::access`].
#[derive(Clone, PartialEq, Eq)]
pub enum AccessOp {
    /// Return the stored payload unchanged.
    Read,
    /// Replace the stored payload.
    Write(Vec<u8>),
}

impl std::fmt::Debug for AccessOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessOp::Read => write!(f, "Read"),
            AccessOp::Write(_) => write!(f, "Write"),
        }
    }
}

/// An Oblivious RAM mapping addresses `0 <= address < block_capacity` to byte payloads.
pub trait Oram {
    /// Returns the number of blocks stored by the ORAM.
    fn block_capacity(&self) -> Result<Address, OramError>;

    /// Performs an oblivious access to `address`, returning the payload stored there before the access.
    fn access(&mut self, address: Address, operation: AccessOp) -> Result<Vec<u8>, OramError>;

    /// Obliviously reads the payload stored at `address`.
    fn get(&mut self, address: Address) -> Result<Vec<u8>, OramError> {
        self.access(address, AccessOp::Read)
    }

    /// Obliviously replaces the payload stored at `address` with `value`.
    fn put(&mut self, address: Address, value: &[u8]) -> Result<(), OramError> {
        self.access(address, AccessOp::Write(value.to_vec()))?;
        Ok(())
    }

    /// Like [`Oram::get`], with the address given in decimal.
    fn get_by_key(&mut self, key: &str) -> Result<Vec<u8>, OramError> {
        let address = parse_key(key)?;
        self.get(address)
    }

    /// Like [`Oram::put`], with the address given in decimal.
    fn put_by_key(&mut self, key: &str, value: &[u8]) -> Result<(), OramError> {
        let address = parse_key(key)?;
        self.put(address, value)
    }
}

fn parse_key(key: &str) -> Result<Address, OramError> {
    key.trim()
        .parse::<Address>()
        .map_err(|source| OramError::InvalidKeyError {
            key: key.to_owned(),
            source,
        })
}

/// Errors produced by ORAM operations.
#[derive(Error, Debug)]
pub enum OramError {
    /// A root or eviction insertion found no empty slot in the target bucket.
    #[error("no empty slot in bucket {bucket} at level {level}")]
    CapacityOverflowError {
        /// Level of the full bucket.
        level: u32,
        /// Index of the full bucket within its level.
        bucket: u64,
    },
    /// A ciphertext read from the backend failed authentication.
    #[error("ciphertext failed authentication")]
    AuthenticationError,
    /// The requested address is not smaller than the ORAM capacity.
    #[error("address {address} is out of bounds for capacity {capacity}")]
    InvalidIdError {
        /// The requested address.
        address: Address,
        /// The capacity of the ORAM.
        capacity: Address,
    },
    /// A string key could not be parsed as a decimal address.
    #[error("key {key:?} is not a decimal block id")]
    InvalidKeyError {
        /// The offending key.
        key: String,
        /// The parse failure.
        #[source]
        source: ParseIntError,
    },
    /// The requested block was not found on the path recorded for it.
    #[error("block {0} was not found on its path")]
    NotFoundError(Address),
    /// A payload is longer than the fixed payload size of the ORAM.
    #[error("payload of {length} bytes exceeds the fixed payload size {maximum}")]
    PayloadTooLargeError {
        /// Length of the rejected payload.
        length: usize,
        /// The fixed payload size.
        maximum: PayloadSize,
    },
    /// The backend could not complete a slot read or write.
    #[error("backend unavailable: {0}")]
    BackendUnavailableError(String),
    /// An authenticated plaintext did not decode as a record.
    #[error("authenticated plaintext is not a well-formed record")]
    CorruptRecordError,
    /// The cipher refused to seal a record.
    #[error("record encryption failed")]
    EncryptionError,
    /// An earlier access on this instance failed part-way through.
    #[error("an earlier access was interrupted; the ORAM state may be inconsistent")]
    InconsistentStateError,
    /// The ORAM was constructed with unusable parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfigurationError(String),
    /// Errors arising from conversions between integer types.
    #[error("arithmetic error encountered")]
    IntegerConversionError(#[from] TryFromIntError),
    /// The random source failed to produce a seed.
    #[error("random source failure")]
    RandomnessError(#[from] rand::Error),
}
