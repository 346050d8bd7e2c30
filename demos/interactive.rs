// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A simple interactive demonstration of ORAM, keyed by decimal block ids.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustyline::history::FileHistory;
use rustyline::Editor;
use tree_oram::database::SimpleDatabase;
use tree_oram::{Oram, OramError, RecursiveBinaryOram};

fn parse_number(
    prompt: &str,
    rl: &mut Editor<(), FileHistory>,
) -> Result<u64, Box<dyn std::error::Error>> {
    Ok(loop {
        println!("{}", prompt);
        println!();
        let readline: String = rl.readline("> ")?;
        match readline.trim().parse::<u64>() {
            Ok(number) => break number,
            Err(_) => {
                println!("Expected a number. Try again.");
                continue;
            }
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut rl = Editor::<(), _>::new()?;

    let capacity = parse_number("How many blocks would you like to store?", &mut rl)?;

    let mut oram =
        RecursiveBinaryOram::<SimpleDatabase, StdRng>::new(capacity, StdRng::from_entropy())?;
    let payload_size = oram.parameters().payload_size;

    loop {
        let action = loop {
            println!("Enter an option (R or W):");
            println!("R) Read");
            println!("W) Write");
            let action: String = rl.readline("> ")?;
            let action = action.trim().to_uppercase();
            if action != "R" && action != "W" {
                println!("Try again.");
                continue;
            }
            break action;
        };

        let key = rl.readline("Block id> ")?;

        let result = if action == "R" {
            oram.get_by_key(&key).map(|value| {
                println!(
                    "Value at {} is {:?}.",
                    key.trim(),
                    String::from_utf8_lossy(&value)
                );
            })
        } else {
            println!("Value to write (at most {} bytes)?", payload_size);
            let value = rl.readline("> ")?;
            oram.put_by_key(&key, value.as_bytes()).map(|()| {
                println!("Wrote {:?} to block {}.", value, key.trim());
            })
        };

        match result {
            Ok(()) => {}
            Err(
                error @ (OramError::InvalidKeyError { .. }
                | OramError::InvalidIdError { .. }
                | OramError::PayloadTooLargeError { .. }),
            ) => println!("{}. Try again.", error),
            Err(error) => return Err(error.into()),
        }
    }
}
