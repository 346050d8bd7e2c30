// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains benchmarks for the `tree-oram` crate.

extern crate criterion;
use core::fmt;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fmt::Display;
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tree_oram::database::CountAccessesDatabase;
use tree_oram::linear_time_oram::LinearTimeOram;
use tree_oram::{Address, Oram, OramError, OramParameters, PayloadSize, RecursiveBinaryOram};

const CAPACITIES_TO_BENCHMARK: [Address; 3] = [1 << 8, 1 << 10, 1 << 12];
const PAYLOAD_SIZE: PayloadSize = 64;
const NUM_RANDOM_OPERATIONS_TO_RUN: usize = 64;

trait Instrumented: Oram + Sized {
    fn new_instrumented(capacity: Address, rng: StdRng) -> Result<Self, OramError>;
    fn get_read_count(&self) -> u64;
    fn get_write_count(&self) -> u64;
    fn short_name() -> String;
}

type BenchmarkLinearTimeOram = LinearTimeOram<CountAccessesDatabase, StdRng>;
type BenchmarkRecursiveBinaryOram = RecursiveBinaryOram<CountAccessesDatabase, StdRng>;

impl Instrumented for BenchmarkRecursiveBinaryOram {
    fn new_instrumented(capacity: Address, rng: StdRng) -> Result<Self, OramError> {
        let parameters = OramParameters {
            payload_size: PAYLOAD_SIZE,
            ..OramParameters::default()
        };
        Self::new_with_parameters(capacity, rng, parameters)
    }

    fn get_read_count(&self) -> u64 {
        self.physical_memory.get_read_count()
    }

    fn get_write_count(&self) -> u64 {
        self.physical_memory.get_write_count()
    }

    fn short_name() -> String {
        "RecursiveBinaryOram".into()
    }
}

impl Instrumented for BenchmarkLinearTimeOram {
    fn new_instrumented(capacity: Address, rng: StdRng) -> Result<Self, OramError> {
        Self::new(capacity, PAYLOAD_SIZE, rng)
    }

    fn get_read_count(&self) -> u64 {
        self.physical_memory.get_read_count()
    }

    fn get_write_count(&self) -> u64 {
        self.physical_memory.get_write_count()
    }

    fn short_name() -> String {
        "LinearTimeOram".into()
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().warm_up_time(Duration::from_millis(100)).measurement_time(Duration::from_millis(100)).sample_size(10);
    targets =
    benchmark_read::<BenchmarkLinearTimeOram>,
    benchmark_read::<BenchmarkRecursiveBinaryOram>,
    benchmark_write::<BenchmarkRecursiveBinaryOram>,
    benchmark_initialization::<BenchmarkLinearTimeOram>,
    benchmark_initialization::<BenchmarkRecursiveBinaryOram>,
    benchmark_random_operations::<BenchmarkRecursiveBinaryOram>,
    print_read_header::<BenchmarkLinearTimeOram>,
    count_accesses_on_read::<BenchmarkLinearTimeOram>,
    print_read_header::<BenchmarkRecursiveBinaryOram>,
    count_accesses_on_read::<BenchmarkRecursiveBinaryOram>,
    print_write_header::<BenchmarkRecursiveBinaryOram>,
    count_accesses_on_write::<BenchmarkRecursiveBinaryOram>,
    print_random_operations_header::<BenchmarkRecursiveBinaryOram>,
    count_accesses_on_random_workload::<BenchmarkRecursiveBinaryOram>,
);
criterion_main!(benches);

fn count_accesses_on_operation<T: Instrumented, F: Fn(&mut T, &mut StdRng, Address)>(
    operation: F,
) {
    let mut rng = StdRng::seed_from_u64(0);
    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut oram = T::new_instrumented(capacity, StdRng::from_rng(&mut rng).unwrap()).unwrap();

        let read_count_before = oram.get_read_count();
        let write_count_before = oram.get_write_count();

        operation(&mut oram, &mut rng, capacity);

        let read_count_after = oram.get_read_count();
        let write_count_after = oram.get_write_count();

        let reads_due_to_operation = read_count_after - read_count_before;
        let writes_due_to_operation = write_count_after - write_count_before;

        print_table_row(
            capacity,
            PAYLOAD_SIZE,
            reads_due_to_operation,
            writes_due_to_operation,
        );
    }
}

fn count_accesses_on_read<T: Instrumented>(_: &mut Criterion) {
    count_accesses_on_operation(|oram: &mut T, _rng, _capacity| {
        oram.get(0).unwrap();
    });
}

fn count_accesses_on_write<T: Instrumented>(_: &mut Criterion) {
    count_accesses_on_operation(|oram: &mut T, _rng, _capacity| {
        oram.put(0, &[0u8; PAYLOAD_SIZE]).unwrap();
    });
}

fn count_accesses_on_random_workload<T: Instrumented>(_: &mut Criterion) {
    count_accesses_on_operation(|oram: &mut T, rng, capacity| {
        let workload = RandomWorkload::new(rng, capacity, NUM_RANDOM_OPERATIONS_TO_RUN);
        run_many_random_accesses(oram, black_box(&workload));
    });
}

fn benchmark_initialization<T: Instrumented>(c: &mut Criterion) {
    let mut group = c.benchmark_group(T::short_name() + "::initialization");
    let mut rng = StdRng::seed_from_u64(0);
    for capacity in CAPACITIES_TO_BENCHMARK.iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(ReadWriteParameters {
                capacity: *capacity,
                payload_size: PAYLOAD_SIZE,
            }),
            capacity,
            |b, capacity| {
                b.iter(|| T::new_instrumented(*capacity, StdRng::from_rng(&mut rng).unwrap()))
            },
        );
    }
}

fn benchmark_read<T: Instrumented>(c: &mut Criterion) {
    let mut group = c.benchmark_group(T::short_name() + "::read");
    let mut rng = StdRng::seed_from_u64(0);
    for capacity in CAPACITIES_TO_BENCHMARK.iter() {
        let mut oram = T::new_instrumented(*capacity, StdRng::from_rng(&mut rng).unwrap()).unwrap();
        group.bench_function(
            BenchmarkId::from_parameter(ReadWriteParameters {
                capacity: *capacity,
                payload_size: PAYLOAD_SIZE,
            }),
            |b| b.iter(|| oram.get(0)),
        );
    }
}

fn benchmark_write<T: Instrumented>(c: &mut Criterion) {
    let mut group = c.benchmark_group(T::short_name() + "::write");
    let mut rng = StdRng::seed_from_u64(0);
    let value = [0xA5u8; PAYLOAD_SIZE];
    for capacity in CAPACITIES_TO_BENCHMARK.iter() {
        let mut oram = T::new_instrumented(*capacity, StdRng::from_rng(&mut rng).unwrap()).unwrap();
        group.bench_function(
            BenchmarkId::from_parameter(ReadWriteParameters {
                capacity: *capacity,
                payload_size: PAYLOAD_SIZE,
            }),
            |b| b.iter(|| oram.put(0, &value)),
        );
    }
}

fn benchmark_random_operations<T: Instrumented>(c: &mut Criterion) {
    let mut group = c.benchmark_group(T::short_name() + "::random_operations");
    let mut rng = StdRng::seed_from_u64(0);

    for capacity in CAPACITIES_TO_BENCHMARK {
        let mut oram = T::new_instrumented(capacity, StdRng::from_rng(&mut rng).unwrap()).unwrap();

        let parameters = &RandomOperationsParameters {
            capacity,
            payload_size: PAYLOAD_SIZE,
            number_of_operations_to_run: NUM_RANDOM_OPERATIONS_TO_RUN,
        };
        let workload = RandomWorkload::new(&mut rng, capacity, NUM_RANDOM_OPERATIONS_TO_RUN);

        group.bench_with_input(
            BenchmarkId::from_parameter(parameters),
            parameters,
            |b, _| b.iter(|| run_many_random_accesses(&mut oram, black_box(&workload))),
        );
    }
    group.finish();
}

struct RandomWorkload {
    indices: Vec<Address>,
    is_read: Vec<bool>,
    values: Vec<Vec<u8>>,
}

impl RandomWorkload {
    fn new(rng: &mut StdRng, capacity: Address, number_of_operations_to_run: usize) -> Self {
        let indices = (0..number_of_operations_to_run)
            .map(|_| rng.gen_range(0..capacity))
            .collect();
        let mut is_read = vec![false; number_of_operations_to_run];
        rng.fill(&mut is_read[..]);
        let values = (0..number_of_operations_to_run)
            .map(|_| {
                let mut value = vec![0u8; PAYLOAD_SIZE];
                rng.fill(&mut value[..]);
                value
            })
            .collect();
        Self {
            indices,
            is_read,
            values,
        }
    }
}

fn run_many_random_accesses<T: Oram>(oram: &mut T, workload: &RandomWorkload) {
    for ((index, is_read), value) in workload
        .indices
        .iter()
        .zip(&workload.is_read)
        .zip(&workload.values)
    {
        if *is_read {
            oram.get(*index).unwrap();
        } else {
            oram.put(*index, value).unwrap();
        }
    }
}

#[derive(Clone, Copy)]
struct ReadWriteParameters {
    capacity: Address,
    payload_size: PayloadSize,
}

impl fmt::Display for ReadWriteParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(Capacity: {} Payload size: {})",
            self.capacity, self.payload_size,
        )
    }
}

#[derive(Clone, Copy)]
struct RandomOperationsParameters {
    capacity: Address,
    payload_size: PayloadSize,
    number_of_operations_to_run: usize,
}

impl fmt::Display for RandomOperationsParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(Capacity: {} Payload size: {}, Ops: {})",
            self.capacity, self.payload_size, self.number_of_operations_to_run,
        )
    }
}

fn print_table_row<A: Display, B: Display, C: Display, D: Display>(s1: A, s2: B, s3: C, s4: D) {
    println!("{0: <15} | {1: <15} | {2: <15} | {3: <15}", s1, s2, s3, s4)
}

fn print_read_header<T: Instrumented>(_: &mut Criterion) {
    println!();
    println!("Physical reads and writes incurred by 1 {}::get:", T::short_name());
    print_table_header();
}

fn print_write_header<T: Instrumented>(_: &mut Criterion) {
    println!();
    println!("Physical reads and writes incurred by 1 {}::put:", T::short_name());
    print_table_header();
}

fn print_random_operations_header<T: Instrumented>(_: &mut Criterion) {
    println!();
    println!(
        "Physical reads and writes incurred by {} random {} operations:",
        NUM_RANDOM_OPERATIONS_TO_RUN,
        T::short_name()
    );
    print_table_header();
}

fn print_table_header() {
    println!("(Counts cover the top-level store only; nested position map stores are not included.)");
    print_table_row(
        "ORAM Capacity",
        "Payload size",
        "Physical Reads",
        "Physical Writes",
    );
}
