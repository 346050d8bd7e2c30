// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Eviction: pushing blocks from the root toward their leaves.

use super::RecursiveBinaryOram;
use crate::{database::Database, record::Record, tree::TreeHeight, OramError};
use rand::{CryptoRng, Rng, RngCore, SeedableRng};

/// Levels at or above this one have every bucket evicted on every access.
const FULLY_EVICTED_LEVELS: TreeHeight = 2;

impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> RecursiveBinaryOram<DB, R> {
    /// Runs the per-access eviction schedule: every bucket on levels 0 and 1, then `gamma`
    /// uniformly random buckets on each further level above the leaves.
    pub(super) fn evict(&mut self) -> Result<(), OramError> {
        for level in 0..self.geometry.leaf_level() {
            if level < FULLY_EVICTED_LEVELS {
                for bucket in 0..self.geometry.buckets_at_level(level) {
                    self.evict_bucket(level, bucket)?;
                }
            } else {
                for _ in 0..self.parameters.gamma {
                    let bucket = self
                        .rng
                        .gen_range(0..self.geometry.buckets_at_level(level));
                    self.evict_bucket(level, bucket)?;
                }
            }
        }
        Ok(())
    }

    /// The number of buckets `evict` processes per access.
    pub(super) fn evictions_per_access(&self) -> Result<u64, OramError> {
        let mut evictions = 0;
        for level in 0..self.geometry.leaf_level() {
            evictions += if level < FULLY_EVICTED_LEVELS {
                self.geometry.buckets_at_level(level)
            } else {
                u64::try_from(self.parameters.gamma)?
            };
        }
        Ok(evictions)
    }

    /// Lifts the first real record out of a bucket and inserts it into the child on the path to
    /// its destination leaf. Both children are rewritten in full whether or not a record moved.
    fn evict_bucket(&mut self, level: TreeHeight, bucket: u64) -> Result<(), OramError> {
        let mut carried: Option<Record> = None;
        self.rewrite_bucket(level, bucket, |record| {
            if carried.is_none() && !record.is_empty() {
                carried = Some(record);
                Record::Empty
            } else {
                record
            }
        })?;

        let goes_right = match carried.as_ref().and_then(Record::destination_leaf) {
            Some(destination) => destination & self.geometry.branch_mask(level) != 0,
            None => true,
        };

        let left_child = 2 * bucket;
        for child in [left_child, left_child + 1] {
            let is_target = (child == left_child) != goes_right;
            let incoming = if is_target { carried.take() } else { None };
            self.insert_into_bucket(level + 1, child, incoming)?;
        }
        Ok(())
    }
}
