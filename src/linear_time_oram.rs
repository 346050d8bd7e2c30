// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A simple linear-time implementation of Oblivious RAM.

use crate::{
    cipher::RecordCipher,
    database::Database,
    record::{Record, RecordCodec, RecordTags},
    AccessOp, Address, Oram, OramError, PayloadSize,
};
use rand::{CryptoRng, RngCore};
use subtle::{ConstantTimeEq, ConstantTimeLess};

/// A simple ORAM that, for each access, ensures obliviousness by making a complete pass over the database,
/// reading, decrypting, re-encrypting and writing back each slot.
///
/// Slot `i` always holds the record for address `i`. Used as the base case of position map recursion.
#[derive(Debug)]
pub struct LinearTimeOram<DB, R> {
    /// The memory of the ORAM (public for benchmarking).
    pub physical_memory: DB,
    codec: RecordCodec,
    block_capacity: Address,
    rng: R,
}

impl<DB: Database, R: RngCore + CryptoRng> LinearTimeOram<DB, R> {
    /// Returns a new `LinearTimeOram` of `block_capacity` empty payloads of at most `payload_size` bytes.
    pub fn new(
        block_capacity: Address,
        payload_size: PayloadSize,
        mut rng: R,
    ) -> Result<Self, OramError> {
        log::debug!(
            "LinearTimeOram::new(capacity = {}, payload = {})",
            block_capacity,
            payload_size
        );

        let codec = RecordCodec::new(payload_size, RecordCipher::generate(&mut rng));
        let mut physical_memory = DB::new(block_capacity)?;

        for address in 0..block_capacity {
            let record = Record::Occupied {
                id: address,
                tags: RecordTags::default(),
                payload: Vec::new(),
            };
            let sealed = codec.seal_record(&record, address, &mut rng)?;
            physical_memory.write_db(address, sealed)?;
        }

        Ok(Self {
            physical_memory,
            codec,
            block_capacity,
            rng,
        })
    }
}

impl<DB: Database, R: RngCore + CryptoRng> Oram for LinearTimeOram<DB, R> {
    fn access(&mut self, index: Address, operation: AccessOp) -> Result<Vec<u8>, OramError> {
        let index_in_bounds: bool = index.ct_lt(&self.block_capacity).into();

        // This operation is not constant-time, but only leaks whether the ORAM index is well-formed or not.
        if !index_in_bounds {
            return Err(OramError::InvalidIdError {
                address: index,
                capacity: self.block_capacity,
            });
        }
        if let AccessOp::Write(value) = &operation {
            if value.len() > self.codec.payload_size() {
                return Err(OramError::PayloadTooLargeError {
                    length: value.len(),
                    maximum: self.codec.payload_size(),
                });
            }
        }

        let mut result = None;

        for slot in 0..self.block_capacity {
            let ciphertext = self.physical_memory.read_db(slot)?;
            let mut record = self.codec.open_record(&ciphertext, slot)?;

            let is_requested_index: bool = slot.ct_eq(&index).into();
            if is_requested_index {
                if let Record::Occupied { payload, .. } = &mut record {
                    result = Some(match &operation {
                        AccessOp::Read => payload.clone(),
                        AccessOp::Write(value) => std::mem::replace(payload, value.clone()),
                    });
                }
            }

            let recrypted = self.codec.seal_record(&record, slot, &mut self.rng)?;
            self.physical_memory.write_db(slot, recrypted)?;
        }

        result.ok_or(OramError::NotFoundError(index))
    }

    fn block_capacity(&self) -> Result<Address, OramError> {
        Ok(self.block_capacity)
    }
}
