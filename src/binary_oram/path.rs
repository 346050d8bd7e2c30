// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Path fetch and bucket insertion.

use super::RecursiveBinaryOram;
use crate::{
    database::Database, record::Record, tree::TreeHeight, Address, LeafIndex, OramError,
};
use rand::{CryptoRng, RngCore, SeedableRng};

impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> RecursiveBinaryOram<DB, R> {
    /// Walks the path from `leaf` up to the root, rewriting every slot, and lifts out the
    /// first record with id `address` met on the way. Its slot is rewritten as an empty record.
    pub(super) fn fetch_along_path(
        &mut self,
        address: Address,
        leaf: LeafIndex,
    ) -> Result<Option<Record>, OramError> {
        let mut carried: Option<Record> = None;

        let path: Vec<_> = self.geometry.path_to_root(leaf).collect();
        for (level, bucket) in path {
            self.rewrite_bucket(level, bucket, |record| {
                if carried.is_none() && record.id() == Some(address) {
                    carried = Some(record);
                    Record::Empty
                } else {
                    record
                }
            })?;
        }

        if carried.is_none() {
            log::warn!("block {} missing from the path to leaf {}", address, leaf);
        }
        Ok(carried)
    }

    /// Rewrites every slot of a bucket, placing `incoming` (if any) in the first empty slot.
    ///
    /// # Errors
    ///
    /// Returns a `CapacityOverflowError` if `incoming` is a record and the bucket has no empty slot.
    /// The whole bucket has been rewritten by then, and `incoming` is lost.
    pub(super) fn insert_into_bucket(
        &mut self,
        level: TreeHeight,
        bucket: u64,
        incoming: Option<Record>,
    ) -> Result<(), OramError> {
        let mut pending = incoming;

        self.rewrite_bucket(level, bucket, |record| match (record.is_empty(), pending.take()) {
            (true, Some(placed)) => placed,
            (_, unplaced) => {
                pending = unplaced;
                record
            }
        })?;

        if pending.is_some() {
            log::warn!("bucket {} at level {} overflowed", bucket, level);
            return Err(OramError::CapacityOverflowError { level, bucket });
        }
        Ok(())
    }
}
