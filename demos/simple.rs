// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A very simple demonstration of the use of ORAM.

extern crate tree_oram;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tree_oram::database::SimpleDatabase;
use tree_oram::{Oram, OramError, RecursiveBinaryOram};

fn main() -> Result<(), OramError> {
    let rng = StdRng::from_entropy();
    let mut oram = RecursiveBinaryOram::<SimpleDatabase, StdRng>::new(64, rng)?;
    oram.put(0, b"hello")?;
    println!("{}", String::from_utf8_lossy(&oram.get(0)?));
    Ok(())
}
