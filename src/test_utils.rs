// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Common test utilities for the ORAM implementations in this crate.

use crate::{
    binary_oram::RecursiveBinaryOram,
    database::{CountAccessesDatabase, Database, SimpleDatabase},
    linear_time_oram::LinearTimeOram,
    Address, Oram, PayloadSize,
};
use duplicate::duplicate_item;
use rand::{rngs::StdRng, CryptoRng, Rng, RngCore, SeedableRng};
use simplelog::{Config, WriteLogger};
use std::fmt::Debug;
use std::sync::Once;

static INIT: Once = Once::new();

// For use in manual testing and inspection.
pub(crate) fn init_logger() {
    INIT.call_once(|| {
        WriteLogger::init(log::LevelFilter::Info, Config::default(), std::io::stdout()).unwrap()
    })
}

pub(crate) trait Testable {
    fn test_hook(&mut self) {}
}

#[duplicate_item(
    database_type;
    [SimpleDatabase];
    [CountAccessesDatabase];
)]
impl Testable for LinearTimeOram<database_type, StdRng> {}

impl<DB: Database, R: RngCore + CryptoRng + SeedableRng> Testable for RecursiveBinaryOram<DB, R> {
    fn test_hook(&mut self) {
        self.check_invariants().unwrap();
    }
}

/// A payload of random length and content, at most `payload_size` bytes.
pub(crate) fn random_payload<R: Rng>(rng: &mut R, payload_size: PayloadSize) -> Vec<u8> {
    let length = rng.gen_range(0..=payload_size);
    let mut payload = vec![0u8; length];
    rng.fill(&mut payload[..]);
    payload
}

/// Tests the correctness of an `Oram` on a workload of random reads and writes.
pub(crate) fn test_correctness_random_workload<T: Oram + Testable>(
    oram: &mut T,
    payload_size: PayloadSize,
    num_operations: u32,
) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(1);

    let capacity = oram.block_capacity().unwrap();
    let mut mirror_array = vec![Vec::new(); usize::try_from(capacity).unwrap()];

    for _ in 0..num_operations {
        let random_index = rng.gen_range(0..capacity);
        let random_value = random_payload(&mut rng, payload_size);

        let read_versus_write = rng.gen::<bool>();

        if read_versus_write {
            assert_eq!(
                oram.get(random_index).unwrap(),
                mirror_array[random_index as usize]
            );
        } else {
            oram.put(random_index, &random_value).unwrap();
            mirror_array[random_index as usize] = random_value;
        }
    }

    for index in 0..capacity {
        assert_eq!(
            oram.get(index).unwrap(),
            mirror_array[index as usize],
            "{index}"
        )
    }

    oram.test_hook();
}

/// Tests the correctness of an `Oram` on repeated passes of sequential accesses 0, 1, ..., `capacity`.
pub(crate) fn test_correctness_linear_workload<T: Oram + Testable + Debug>(
    oram: &mut T,
    payload_size: PayloadSize,
    num_operations: u32,
) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(2);

    let capacity = oram.block_capacity().unwrap();
    let mut mirror_array = vec![Vec::new(); usize::try_from(capacity).unwrap()];

    let num_passes = Address::from(num_operations) / capacity;

    for _ in 0..num_passes {
        for index in 0..capacity {
            let random_value = random_payload(&mut rng, payload_size);

            let read_versus_write: bool = rng.gen::<bool>();

            if read_versus_write {
                assert_eq!(oram.get(index).unwrap(), mirror_array[index as usize]);
            } else {
                oram.put(index, &random_value).unwrap();
                mirror_array[index as usize] = random_value;
            }
        }
    }

    for index in 0..capacity {
        assert_eq!(
            oram.get(index).unwrap(),
            mirror_array[index as usize],
            "{index}"
        )
    }

    oram.test_hook();
}

macro_rules! create_correctness_test {
    ($function_name:ident, $prefix:ident, $constructor:ident, $block_capacity:expr, $payload_size:expr, $iterations_to_test:expr) => {
        paste::paste! {
            #[test]
            fn [<$function_name _ $prefix _ $block_capacity _ $payload_size _ $iterations_to_test>]() {
                let mut oram = $constructor($block_capacity, $payload_size);
                $crate::test_utils::$function_name(&mut oram, $payload_size, $iterations_to_test);
            }
        }
    };
}

macro_rules! create_correctness_tests_for_workload {
    ($function_name:ident, $prefix:ident, $constructor:ident) => {
        $crate::test_utils::create_correctness_test!($function_name, $prefix, $constructor, 2, 4, 10);
        $crate::test_utils::create_correctness_test!($function_name, $prefix, $constructor, 3, 8, 50);
        $crate::test_utils::create_correctness_test!($function_name, $prefix, $constructor, 8, 8, 100);
        $crate::test_utils::create_correctness_test!($function_name, $prefix, $constructor, 16, 4, 100);
        $crate::test_utils::create_correctness_test!($function_name, $prefix, $constructor, 32, 16, 100);
        // 64 blocks of up to 8 bytes, 200 operations.
        $crate::test_utils::create_correctness_test!($function_name, $prefix, $constructor, 64, 8, 200);
    };
}

macro_rules! create_correctness_tests_for_oram_constructor {
    ($prefix:ident, $constructor:ident) => {
        $crate::test_utils::create_correctness_tests_for_workload!(
            test_correctness_linear_workload,
            $prefix,
            $constructor
        );
        $crate::test_utils::create_correctness_tests_for_workload!(
            test_correctness_random_workload,
            $prefix,
            $constructor
        );
    };
}

pub(crate) use create_correctness_test;
pub(crate) use create_correctness_tests_for_oram_constructor;
pub(crate) use create_correctness_tests_for_workload;
