// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A recursive position map data structure.
//!
//! Positions are packed `positions_per_group` to a record, each as a little-endian `u32`, and the
//! packed groups are stored in a smaller ORAM: a [`LinearTimeOram`] once few enough groups remain,
//! and otherwise another [`RecursiveBinaryOram`], which keeps its own position map the same way.

use crate::{
    binary_oram::{OramParameters, RecursiveBinaryOram},
    database::Database,
    linear_time_oram::LinearTimeOram,
    Address, LeafIndex, Oram, OramError,
};
use log::debug;
use rand::{CryptoRng, RngCore, SeedableRng};
use std::mem::size_of;
use subtle::{ConditionallySelectable, ConstantTimeEq};

/// Storage for the packed position groups.
#[derive(Debug)]
pub enum PositionStorage<DB, R> {
    /// A simple, linear-time ORAM.
    Base(LinearTimeOram<DB, R>),
    /// A binary-tree ORAM whose own position map is also a `PositionMap`.
    Recursive(Box<RecursiveBinaryOram<DB, R>>),
}

/// A map from block addresses to leaves, stored obliviously.
#[derive(Debug)]
pub struct PositionMap<DB, R> {
    storage: PositionStorage<DB, R>,
    number_of_positions: Address,
    positions_per_group: usize,
}

impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> PositionMap<DB, R> {
    /// Returns a position map for `number_of_positions` addresses, every position initially 0.
    ///
    /// The number of groups is `ceil(number_of_positions / positions_per_group)`. If that is at most
    /// `parameters.recursion_cutoff`, or would not shrink the problem, the groups are stored in a
    /// `LinearTimeOram`.
    pub fn new(
        number_of_positions: Address,
        parameters: &OramParameters,
        rng: R,
    ) -> Result<Self, OramError> {
        let positions_per_group = parameters.positions_per_group;
        let group_size = Address::try_from(positions_per_group)?;
        let number_of_groups = number_of_positions.div_ceil(group_size);
        let payload_size = positions_per_group * size_of::<LeafIndex>();

        debug!(
            "PositionMap::new(positions = {}, groups = {})",
            number_of_positions, number_of_groups
        );

        let storage = if number_of_groups <= parameters.recursion_cutoff
            || number_of_groups >= number_of_positions
        {
            PositionStorage::Base(LinearTimeOram::new(number_of_groups, payload_size, rng)?)
        } else {
            let group_parameters = OramParameters {
                payload_size,
                ..parameters.clone()
            };
            PositionStorage::Recursive(Box::new(RecursiveBinaryOram::new_with_parameters(
                number_of_groups,
                rng,
                group_parameters,
            )?))
        };

        Ok(Self {
            storage,
            number_of_positions,
            positions_per_group,
        })
    }
}

impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> PositionMap<DB, R> {
    /// The number of ORAM levels below this position map.
    pub fn recursion_height(&self) -> usize {
        match &self.storage {
            PositionStorage::Base(_) => 0,
            PositionStorage::Recursive(inner) => 1 + inner.recursion_height(),
        }
    }

    /// The number of addresses this map holds positions for.
    pub fn number_of_positions(&self) -> Address {
        self.number_of_positions
    }

    /// Writes the initial position of every address, one group at a time.
    pub fn initialize<F: Fn(Address) -> LeafIndex>(&mut self, position: F) -> Result<(), OramError> {
        let group_size = Address::try_from(self.positions_per_group)?;
        let number_of_groups = self.number_of_positions.div_ceil(group_size);

        for group in 0..number_of_groups {
            let positions: Vec<LeafIndex> = (0..group_size)
                .map(|offset| group * group_size + offset)
                .map(|address| {
                    if address < self.number_of_positions {
                        position(address)
                    } else {
                        0
                    }
                })
                .collect();
            self.storage().put(group, &pack(&positions))?;
        }
        Ok(())
    }

    /// Sets the position of `address` to `new_position` and returns its previous position.
    ///
    /// This is one oblivious read and one oblivious write of the group holding `address`.
    pub fn get_and_set(
        &mut self,
        address: Address,
        new_position: LeafIndex,
    ) -> Result<LeafIndex, OramError> {
        let (group, offset) = self.locate(address)?;

        let mut positions = unpack(&self.storage().get(group)?, self.positions_per_group);
        let mut old_position = LeafIndex::default();
        for (i, position) in positions.iter_mut().enumerate() {
            let offset_matches = i.ct_eq(&offset);
            old_position.conditional_assign(position, offset_matches);
            position.conditional_assign(&new_position, offset_matches);
        }
        self.storage().put(group, &pack(&positions))?;

        Ok(old_position)
    }

    /// Reads the position of `address` without changing it.
    ///
    /// For diagnostics only: an ORAM access must always rotate the position of its target,
    /// so this is never used on the access path.
    pub fn peek(&mut self, address: Address) -> Result<LeafIndex, OramError> {
        let (group, offset) = self.locate(address)?;

        let positions = unpack(&self.storage().get(group)?, self.positions_per_group);
        let mut result = LeafIndex::default();
        for (i, position) in positions.iter().enumerate() {
            result.conditional_assign(position, i.ct_eq(&offset));
        }
        Ok(result)
    }

    fn locate(&self, address: Address) -> Result<(Address, usize), OramError> {
        if address >= self.number_of_positions {
            return Err(OramError::InvalidIdError {
                address,
                capacity: self.number_of_positions,
            });
        }
        let group_size = Address::try_from(self.positions_per_group)?;
        Ok((address / group_size, usize::try_from(address % group_size)?))
    }

    fn storage(&mut self) -> &mut dyn Oram {
        match &mut self.storage {
            PositionStorage::Base(linear_oram) => linear_oram,
            PositionStorage::Recursive(block_oram) => block_oram.as_mut(),
        }
    }
}

#[cfg(test)]
impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> PositionMap<DB, R> {
    /// The binary-tree ORAM holding the position groups, if this map recurses.
    pub(crate) fn nested_oram(&mut self) -> Option<&mut RecursiveBinaryOram<DB, R>> {
        match &mut self.storage {
            PositionStorage::Base(_) => None,
            PositionStorage::Recursive(inner) => Some(inner.as_mut()),
        }
    }
}

fn pack(positions: &[LeafIndex]) -> Vec<u8> {
    positions.iter().flat_map(|p| p.to_le_bytes()).collect()
}

// A group that has never been written unpacks to all zeroes.
fn unpack(bytes: &[u8], positions_per_group: usize) -> Vec<LeafIndex> {
    let mut positions = vec![LeafIndex::default(); positions_per_group];
    for (position, chunk) in positions
        .iter_mut()
        .zip(bytes.chunks_exact(size_of::<LeafIndex>()))
    {
        let mut word = [0u8; size_of::<LeafIndex>()];
        word.copy_from_slice(chunk);
        *position = LeafIndex::from_le_bytes(word);
    }
    positions
}
