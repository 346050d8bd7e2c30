// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Layout of the bucket tree over a flat slot store.
//!
//! Buckets are numbered in heap order: the root is bucket 0 and the children of bucket `i`
//! are `2i + 1` and `2i + 2`. Within a level, buckets are also named by their offset from the
//! leftmost bucket of that level, so `(level, bucket)` is bucket number `2^level - 1 + bucket`.
//! Slot `offset` of that bucket lives at slot id `bucket_number * Z + offset`.

use crate::{Address, BucketSize, LeafIndex, OramError};
use rand::{CryptoRng, Rng, RngCore};

/// Heap-order index of a bucket.
pub type TreeIndex = u64;
/// The numeric type used for tree heights and levels.
pub type TreeHeight = u32;

/// Trees taller than this would have leaves that do not fit in a [`LeafIndex`].
pub const MAXIMUM_TREE_HEIGHT: TreeHeight = LeafIndex::BITS;

/// Dimensions of the bucket tree for one ORAM instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeGeometry {
    height: TreeHeight,
    bucket_size: BucketSize,
}

impl TreeGeometry {
    /// Returns the geometry for `block_capacity` blocks: height `ceil(log2 n) + 1`,
    /// and `alpha * ceil(log2 n)` slots per bucket.
    pub fn new(block_capacity: Address, alpha: usize) -> Result<Self, OramError> {
        if block_capacity < 2 {
            return Err(OramError::InvalidConfigurationError(format!(
                "block capacity {} is below the minimum of 2",
                block_capacity
            )));
        }
        let depth = ceil_log2(block_capacity);
        let height = depth + 1;
        if height > MAXIMUM_TREE_HEIGHT {
            return Err(OramError::InvalidConfigurationError(format!(
                "block capacity {} needs a tree of height {}",
                block_capacity, height
            )));
        }

        let bucket_size = alpha
            .checked_mul(usize::try_from(depth)?)
            .ok_or_else(|| OramError::InvalidConfigurationError("bucket size overflows".into()))?;
        if bucket_size == 0 {
            return Err(OramError::InvalidConfigurationError(
                "buckets must hold at least one slot".into(),
            ));
        }

        Ok(Self {
            height,
            bucket_size,
        })
    }

    /// The number of levels H, counting both the root and the leaves.
    pub fn height(&self) -> TreeHeight {
        self.height
    }

    /// The level holding the leaves, `H - 1`.
    pub fn leaf_level(&self) -> TreeHeight {
        self.height - 1
    }

    /// The number of slots Z per bucket.
    pub fn bucket_size(&self) -> BucketSize {
        self.bucket_size
    }

    /// The number of buckets at `level`.
    pub fn buckets_at_level(&self, level: TreeHeight) -> u64 {
        1u64 << level
    }

    /// The number of leaves, `2^(H - 1)`.
    pub fn leaf_count(&self) -> u64 {
        self.buckets_at_level(self.leaf_level())
    }

    /// The total number of buckets in the tree.
    pub fn bucket_count(&self) -> u64 {
        (1u64 << self.height) - 1
    }

    /// The total number of slots in the tree.
    pub fn slot_count(&self) -> Result<Address, OramError> {
        Ok(self.bucket_count() * Address::try_from(self.bucket_size)?)
    }

    /// The heap-order index of bucket `bucket` of `level`.
    pub fn bucket_index(&self, level: TreeHeight, bucket: u64) -> TreeIndex {
        debug_assert!(level < self.height);
        debug_assert!(bucket < self.buckets_at_level(level));
        (1u64 << level) - 1 + bucket
    }

    /// The slot id of slot `offset` of bucket `bucket` of `level`.
    pub fn slot_id(
        &self,
        level: TreeHeight,
        bucket: u64,
        offset: BucketSize,
    ) -> Result<Address, OramError> {
        debug_assert!(offset < self.bucket_size);
        let bucket_size = Address::try_from(self.bucket_size)?;
        Ok(self.bucket_index(level, bucket) * bucket_size + Address::try_from(offset)?)
    }

    /// The level of the bucket containing slot `slot`.
    pub fn level_of_slot(&self, slot: Address) -> Result<TreeHeight, OramError> {
        let bucket_index = slot / Address::try_from(self.bucket_size)?;
        Ok((bucket_index + 1).ilog2())
    }

    /// The buckets on the path from `leaf` up to the root, inclusive, as `(level, bucket)` pairs.
    pub fn path_to_root(&self, leaf: LeafIndex) -> impl Iterator<Item = (TreeHeight, u64)> {
        let leaf = u64::from(leaf);
        let leaf_level = self.leaf_level();
        (0..=leaf_level)
            .rev()
            .map(move |level| (level, leaf >> (leaf_level - level)))
    }

    /// The bit of a destination leaf that selects the child of a bucket at `level`
    /// lying on the path to that leaf. Only meaningful above the leaf level.
    pub fn branch_mask(&self, level: TreeHeight) -> LeafIndex {
        debug_assert!(level < self.leaf_level());
        1 << (self.leaf_level() - level - 1)
    }

    /// A leaf drawn uniformly at random.
    pub fn random_leaf<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<LeafIndex, OramError> {
        Ok(LeafIndex::try_from(rng.gen_range(0..self.leaf_count()))?)
    }
}

/// Returns `ceil(log2(n))` for `n >= 1`.
pub(crate) fn ceil_log2(n: u64) -> u32 {
    debug_assert!(n >= 1);
    if n == 1 {
        0
    } else {
        (n - 1).ilog2() + 1
    }
}
