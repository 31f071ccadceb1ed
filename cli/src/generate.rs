/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{GlobalArgs, MatrixFormat};
use anyhow::{Result, ensure};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gen",
    about = "Generate a random symmetric adjacency matrix with integer weights.",
    long_about = None
)]
pub struct CliArgs {
    /// Where to store the matrix.
    pub output: PathBuf,

    #[arg(short, long, default_value_t = 8)]
    /// The number of nodes.
    pub nodes: usize,

    #[arg(short, long, default_value_t = 0)]
    /// The seed of the pseudorandom number generator.
    pub seed: u64,

    #[arg(long, default_value_t = 1)]
    /// The smallest weight (inclusive).
    pub low: u32,

    #[arg(long, default_value_t = 10)]
    /// The largest weight (exclusive).
    pub high: u32,

    #[arg(long, value_enum, default_value_t = MatrixFormat::Ascii)]
    /// The output format.
    pub fmt: MatrixFormat,
}

pub fn main(_global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        args.low < args.high,
        "The weight range [{} . . {}) is empty",
        args.low,
        args.high
    );
    log::info!(
        "Generating a {} × {} matrix with weights in [{} . . {}) (seed {})",
        args.nodes,
        args.nodes,
        args.low,
        args.high,
        args.seed
    );
    let matrix = mcl::random::symmetric(args.nodes, args.low, args.high, args.seed);
    args.fmt.store(&args.output, &matrix, None)
}
