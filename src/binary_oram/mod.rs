// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A recursive binary-tree ORAM.

use crate::{
    cipher::RecordCipher,
    database::Database,
    position_map::PositionMap,
    record::{Record, RecordCodec, RecordTags},
    tree::{TreeGeometry, TreeHeight},
    AccessOp, Address, BucketSize, LeafIndex, Oram, OramError, PayloadSize,
};
use rand::{CryptoRng, RngCore, SeedableRng};

mod eviction;
mod path;

/// The default bucket-size multiplier: buckets hold `alpha * ceil(log2 n)` slots.
pub const DEFAULT_ALPHA: usize = 3;
/// The default number of random evictions per level per access, below level 1.
pub const DEFAULT_GAMMA: usize = 2;
/// The default number of positions packed into one position map record.
pub const DEFAULT_POSITIONS_PER_GROUP: usize = 16;
/// The default fixed payload size in bytes.
pub const DEFAULT_PAYLOAD_SIZE: PayloadSize = 64;
/// The default number of position groups below which the position map is a linear-time ORAM.
pub const DEFAULT_RECURSION_CUTOFF: Address = 1 << 8;

/// Tunable parameters of a [`RecursiveBinaryOram`].
///
/// `alpha` and `gamma` together set the probability that an insertion finds its bucket full,
/// which is reported as a `CapacityOverflowError`. Larger values make overflow less likely and
/// every access more expensive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OramParameters {
    /// Bucket-size multiplier.
    pub alpha: usize,
    /// Random evictions per level per access, on every level from 2 down to the one above the leaves.
    pub gamma: usize,
    /// Number of positions packed into one position map record. Must be at least 2.
    pub positions_per_group: usize,
    /// The fixed payload size in bytes. Shorter payloads are padded.
    pub payload_size: PayloadSize,
    /// Position maps of at most this many groups are stored in a linear-time ORAM.
    pub recursion_cutoff: Address,
}

impl Default for OramParameters {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            gamma: DEFAULT_GAMMA,
            positions_per_group: DEFAULT_POSITIONS_PER_GROUP,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            recursion_cutoff: DEFAULT_RECURSION_CUTOFF,
        }
    }
}

impl OramParameters {
    fn validate(&self, block_capacity: Address) -> Result<(), OramError> {
        let invalid = |reason: &str| Err(OramError::InvalidConfigurationError(reason.into()));

        if block_capacity < 2 {
            return invalid("block capacity must be at least 2");
        }
        if block_capacity > Address::try_from(i32::MAX)? {
            return invalid("block ids must fit in an i32");
        }
        if self.alpha == 0 {
            return invalid("alpha must be at least 1");
        }
        if self.gamma == 0 {
            return invalid("gamma must be at least 1");
        }
        if self.positions_per_group < 2 {
            return invalid("positions per group must be at least 2");
        }
        if self.payload_size == 0 || u32::try_from(self.payload_size).is_err() {
            return invalid("payload size must be between 1 and u32::MAX");
        }
        if self.recursion_cutoff == 0 {
            return invalid("recursion cutoff must be at least 1");
        }
        Ok(())
    }
}

/// A binary-tree ORAM over a slot store, with a recursive position map.
///
/// ## Layout
///
/// For capacity `n` the tree has height `H = ceil(log2 n) + 1`, `2^(H-1)` leaves, and buckets of
/// `Z = alpha * ceil(log2 n)` slots; every slot is one ciphertext in `physical_memory`. Block `i`
/// starts in the first slot of leaf `i`.
///
/// ## Access
///
/// An access to block `i` draws a fresh leaf, swaps it into the position map for the old one,
/// reads and rewrites every slot on the path to the old leaf (lifting `i` out when it is met),
/// inserts `i` into the first empty slot of the root, and then evicts: one block from each bucket
/// on levels 0 and 1, and from `gamma` random buckets on every lower non-leaf level, is pushed
/// into the child on the way to its destination leaf.
///
/// The slots touched depend only on the random leaves and buckets drawn, never on the block,
/// the operation or the payload. Each touched slot is re-encrypted under a fresh nonce.
///
/// ## Failure
///
/// An access that fails after it has started writing leaves the tree in an unknown state;
/// the instance then refuses further accesses with `InconsistentStateError`.
#[derive(Debug)]
pub struct RecursiveBinaryOram<DB, R> {
    /// The underlying untrusted memory that the ORAM is obliviously accessing on behalf of its client.
    /// Public for benchmarking and testing.
    pub physical_memory: DB,
    geometry: TreeGeometry,
    codec: RecordCodec,
    position_map: PositionMap<DB, R>,
    parameters: OramParameters,
    block_capacity: Address,
    rng: R,
    inconsistent: bool,
}

impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> RecursiveBinaryOram<DB, R> {
    /// Returns a new ORAM of `block_capacity` empty blocks with default parameters.
    pub fn new(block_capacity: Address, rng: R) -> Result<Self, OramError> {
        Self::new_with_parameters(block_capacity, rng, OramParameters::default())
    }

    /// Returns a new ORAM of `block_capacity` empty blocks, encrypting under a key drawn from `rng`.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfigurationError` if `block_capacity` is below 2 or above `i32::MAX`,
    /// or if any of `parameters` is out of range (see [`OramParameters`]).
    pub fn new_with_parameters(
        block_capacity: Address,
        mut rng: R,
        parameters: OramParameters,
    ) -> Result<Self, OramError> {
        let cipher = RecordCipher::generate(&mut rng);
        Self::new_with_cipher(block_capacity, rng, parameters, cipher)
    }

    /// Returns a new ORAM of `block_capacity` empty blocks, encrypting under `cipher`.
    ///
    /// Writes every slot of the tree once, so construction costs `O(n log n)` backend writes.
    pub fn new_with_cipher(
        block_capacity: Address,
        mut rng: R,
        parameters: OramParameters,
        cipher: RecordCipher,
    ) -> Result<Self, OramError> {
        parameters.validate(block_capacity)?;
        let geometry = TreeGeometry::new(block_capacity, parameters.alpha)?;
        let codec = RecordCodec::new(parameters.payload_size, cipher);

        log::info!(
            "RecursiveBinaryOram::new(capacity = {}, height = {}, bucket size = {}, payload = {})",
            block_capacity,
            geometry.height(),
            geometry.bucket_size(),
            parameters.payload_size,
        );

        let mut physical_memory = DB::new(geometry.slot_count()?)?;

        for level in 0..geometry.height() {
            for bucket in 0..geometry.buckets_at_level(level) {
                for offset in 0..geometry.bucket_size() {
                    let record = match (level == geometry.leaf_level(), bucket, offset) {
                        (true, leaf, 0) if leaf < block_capacity => Record::Occupied {
                            id: leaf,
                            tags: RecordTags {
                                previous_leaf: LeafIndex::try_from(leaf)?,
                                destination_leaf: LeafIndex::try_from(leaf)?,
                            },
                            payload: Vec::new(),
                        },
                        _ => Record::Empty,
                    };
                    let slot = geometry.slot_id(level, bucket, offset)?;
                    let sealed = codec.seal_record(&record, slot, &mut rng)?;
                    physical_memory.write_db(slot, sealed)?;
                }
            }
        }

        let mut position_map = PositionMap::new(block_capacity, &parameters, R::from_rng(&mut rng)?)?;
        position_map.initialize(|address| address as LeafIndex)?;

        log::debug!(
            "RecursiveBinaryOram::new -- position map recursion height {}",
            position_map.recursion_height()
        );

        Ok(Self {
            physical_memory,
            geometry,
            codec,
            position_map,
            parameters,
            block_capacity,
            rng,
            inconsistent: false,
        })
    }

    /// The shape of the bucket tree.
    pub fn geometry(&self) -> &TreeGeometry {
        &self.geometry
    }

    /// The parameters this ORAM was built with.
    pub fn parameters(&self) -> &OramParameters {
        &self.parameters
    }

    /// The length in bytes of every ciphertext stored in `physical_memory`.
    pub fn ciphertext_size(&self) -> usize {
        self.codec.ciphertext_size()
    }

    /// The number of binary-tree ORAMs nested inside this one's position map.
    pub fn recursion_height(&self) -> usize {
        self.position_map.recursion_height()
    }

    /// The number of slots of `physical_memory` read (and as many written) by every access.
    ///
    /// This is a function of the height, the bucket size and `gamma` only.
    pub fn physical_accesses_per_access(&self) -> Result<u64, OramError> {
        let bucket_size = u64::try_from(self.geometry.bucket_size())?;
        let height = u64::from(self.geometry.height());
        let fetch_and_insert = bucket_size * (height + 1);
        let evictions = self.evictions_per_access()?;
        Ok(fetch_and_insert + 3 * bucket_size * evictions)
    }

    /// Returns the leaf currently assigned to `address`.
    ///
    /// For diagnostics only. The lookup is itself oblivious, but it does not rotate the position,
    /// so it must not stand in for an access.
    pub fn peek_position(&mut self, address: Address) -> Result<LeafIndex, OramError> {
        self.position_map.peek(address)
    }

    /// Returns true if an earlier access failed part-way and the instance refuses further accesses.
    pub fn is_inconsistent(&self) -> bool {
        self.inconsistent
    }

    fn access_unchecked(
        &mut self,
        address: Address,
        operation: AccessOp,
    ) -> Result<Vec<u8>, OramError> {
        let new_leaf = self.geometry.random_leaf(&mut self.rng)?;
        let old_leaf = self.position_map.get_and_set(address, new_leaf)?;

        let carried = self.fetch_along_path(address, old_leaf)?;
        let previous_payload = match carried {
            Some(Record::Occupied { payload, .. }) => payload,
            _ => return Err(OramError::NotFoundError(address)),
        };

        let (result, payload) = match operation {
            AccessOp::Read => (previous_payload.clone(), previous_payload),
            AccessOp::Write(value) => (previous_payload, value),
        };
        let rebuilt = Record::Occupied {
            id: address,
            tags: RecordTags {
                previous_leaf: old_leaf,
                destination_leaf: new_leaf,
            },
            payload,
        };
        self.insert_into_bucket(0, 0, Some(rebuilt))?;

        self.evict()?;

        Ok(result)
    }

    fn read_slot(&mut self, slot: Address) -> Result<Record, OramError> {
        let ciphertext = self.physical_memory.read_db(slot)?;
        self.codec.open_record(&ciphertext, slot)
    }

    fn write_slot(&mut self, slot: Address, record: &Record) -> Result<(), OramError> {
        let sealed = self.codec.seal_record(record, slot, &mut self.rng)?;
        self.physical_memory.write_db(slot, sealed)
    }

    /// Reads, decrypts, transforms, re-encrypts and writes back every slot of a bucket, in order.
    fn rewrite_bucket<F: FnMut(Record) -> Record>(
        &mut self,
        level: TreeHeight,
        bucket: u64,
        mut visit: F,
    ) -> Result<(), OramError> {
        let bucket_size: BucketSize = self.geometry.bucket_size();
        for offset in 0..bucket_size {
            let slot = self.geometry.slot_id(level, bucket, offset)?;
            let record = self.read_slot(slot)?;
            let record = visit(record);
            self.write_slot(slot, &record)?;
        }
        Ok(())
    }
}

impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> Oram for RecursiveBinaryOram<DB, R> {
    fn access(&mut self, address: Address, operation: AccessOp) -> Result<Vec<u8>, OramError> {
        if self.inconsistent {
            return Err(OramError::InconsistentStateError);
        }

        // These checks are not constant-time, but only leak whether the request is well-formed.
        if address >= self.block_capacity {
            return Err(OramError::InvalidIdError {
                address,
                capacity: self.block_capacity,
            });
        }
        if let AccessOp::Write(value) = &operation {
            if value.len() > self.parameters.payload_size {
                return Err(OramError::PayloadTooLargeError {
                    length: value.len(),
                    maximum: self.parameters.payload_size,
                });
            }
        }

        log::debug!("RecursiveBinaryOram::access({}, {:?})", address, operation);

        let result = self.access_unchecked(address, operation);
        if let Err(error) = &result {
            log::warn!(
                "RecursiveBinaryOram access failed part-way ({}); refusing further accesses",
                error
            );
            self.inconsistent = true;
        }
        result
    }

    fn block_capacity(&self) -> Result<Address, OramError> {
        Ok(self.block_capacity)
    }
}

#[cfg(test)]
impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> RecursiveBinaryOram<DB, R> {
    /// Decrypts the whole tree, returning the occupied records with their `(level, bucket)`.
    pub(crate) fn tree_contents(
        &mut self,
    ) -> Result<Vec<(TreeHeight, u64, Record)>, OramError> {
        let mut result = Vec::new();
        for level in 0..self.geometry.height() {
            for bucket in 0..self.geometry.buckets_at_level(level) {
                for offset in 0..self.geometry.bucket_size() {
                    let slot = self.geometry.slot_id(level, bucket, offset)?;
                    let ciphertext = self.physical_memory.read_db(slot)?;
                    assert_eq!(ciphertext.len(), self.ciphertext_size());
                    let record = self.codec.open_record(&ciphertext, slot)?;
                    if !record.is_empty() {
                        result.push((level, bucket, record));
                    }
                }
            }
        }
        Ok(result)
    }

    /// Asserts that every block is stored exactly once, on the path to the leaf the
    /// position map assigns it, with a matching destination tag.
    pub(crate) fn check_invariants(&mut self) -> Result<(), OramError> {
        let contents = self.tree_contents()?;
        let mut seen = vec![false; usize::try_from(self.block_capacity)?];

        for (level, bucket, record) in contents {
            let id = record.id().unwrap();
            let destination = record.destination_leaf().unwrap();
            let index = usize::try_from(id)?;
            assert!(!seen[index], "block {id} is stored twice");
            seen[index] = true;

            assert_eq!(self.peek_position(id)?, destination, "block {id}");
            let shift = self.geometry.leaf_level() - level;
            assert_eq!(u64::from(destination) >> shift, bucket, "block {id}");
        }

        assert!(seen.iter().all(|s| *s), "a block is missing from the tree");
        Ok(())
    }
}
