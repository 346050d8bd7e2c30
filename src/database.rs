// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Slot stores backing an ORAM.

use crate::{Address, OramError};

/// The untrusted slot store an ORAM client is talking to.
///
/// A `Database` is a flat array of opaque ciphertexts addressed by slot number. It is not
/// expected to batch, encrypt, or provide transactions; everything it sees is already sealed.
pub trait Database
where
    Self: Sized,
{
    /// Returns a new `Database` of `number_of_addresses` empty slots.
    fn new(number_of_addresses: Address) -> Result<Self, OramError>;
    /// Returns the number of slots in `self`.
    fn capacity(&self) -> Result<Address, OramError>;
    /// Reads the ciphertext stored at `index`.
    fn read_db(&mut self, index: Address) -> Result<Vec<u8>, OramError>;
    /// Overwrites the ciphertext stored at `index`.
    fn write_db(&mut self, index: Address, value: Vec<u8>) -> Result<(), OramError>;
}

/// A simple Database that stores its slots in a `Vec`.
#[derive(Debug)]
pub struct SimpleDatabase(Vec<Vec<u8>>);

impl SimpleDatabase {
    fn slot(&self, index: Address) -> Result<usize, OramError> {
        let capacity = self.capacity()?;
        if index >= capacity {
            return Err(OramError::InvalidIdError {
                address: index,
                capacity,
            });
        }
        Ok(index.try_into()?)
    }
}

impl Database for SimpleDatabase {
    fn new(number_of_addresses: Address) -> Result<Self, OramError> {
        Ok(Self(vec![Vec::new(); number_of_addresses.try_into()?]))
    }

    fn capacity(&self) -> Result<Address, OramError> {
        Ok(self.0.len().try_into()?)
    }

    fn read_db(&mut self, index: Address) -> Result<Vec<u8>, OramError> {
        let index = self.slot(index)?;
        Ok(self.0[index].clone())
    }

    fn write_db(&mut self, index: Address, value: Vec<u8>) -> Result<(), OramError> {
        let index = self.slot(index)?;
        self.0[index] = value;
        Ok(())
    }
}

/// Whether a physical access was a read or a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicalOp {
    /// A slot read.
    Read,
    /// A slot write.
    Write,
}

/// A Database that counts reads and writes, and records the order in which slots were touched.
#[derive(Debug)]
pub struct CountAccessesDatabase {
    data: SimpleDatabase,
    /// `reads[i]` tracks the total number of reads made to index `i`.
    pub reads: Vec<u64>,
    /// `writes[i]` tracks the total number of writes made to index `i`.
    pub writes: Vec<u64>,
    /// Every physical access since the last call to [`CountAccessesDatabase::reset_counts`], in order.
    pub log: Vec<(PhysicalOp, Address)>,
}

impl CountAccessesDatabase {
    /// Returns the total number of reads to the database.
    pub fn get_read_count(&self) -> u64 {
        self.reads.iter().sum()
    }

    /// Returns the total number of writes to the database.
    pub fn get_write_count(&self) -> u64 {
        self.writes.iter().sum()
    }

    /// Zeroes all counters and clears the access log.
    pub fn reset_counts(&mut self) {
        self.reads.iter_mut().for_each(|r| *r = 0);
        self.writes.iter_mut().for_each(|w| *w = 0);
        self.log.clear();
    }
}

impl Database for CountAccessesDatabase {
    fn new(number_of_addresses: Address) -> Result<Self, OramError> {
        Ok(Self {
            data: Database::new(number_of_addresses)?,
            reads: vec![0u64; number_of_addresses.try_into()?],
            writes: vec![0u64; number_of_addresses.try_into()?],
            log: Vec::new(),
        })
    }

    fn read_db(&mut self, index: Address) -> Result<Vec<u8>, OramError> {
        log::debug!("Physical read -- {}", index);

        let result = self.data.read_db(index)?;
        self.reads[usize::try_from(index)?] += 1;
        self.log.push((PhysicalOp::Read, index));
        Ok(result)
    }

    fn write_db(&mut self, index: Address, value: Vec<u8>) -> Result<(), OramError> {
        log::debug!("Physical write -- {}", index);

        self.data.write_db(index, value)?;
        self.writes[usize::try_from(index)?] += 1;
        self.log.push((PhysicalOp::Write, index));
        Ok(())
    }

    fn capacity(&self) -> Result<Address, OramError> {
        self.data.capacity()
    }
}
