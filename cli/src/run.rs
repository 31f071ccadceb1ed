/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{GlobalArgs, MatrixFormat, NumThreadsArg, get_thread_pool};
use anyhow::{Result, bail, ensure};
use clap::{Args, Parser};
use dsi_progress_logger::{ProgressLog, progress_logger};
use mcl::device::{Device, Dim2, LaunchConfig};
use mcl::driver::{Mcl, Sequential, preds};
use mcl::stages::{Expansion, ZeroColumns};
use mcl::tolerance::Tolerance;
use predicates::prelude::*;
use std::path::PathBuf;

/// The engine running the iterations.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliEngine {
    /// Run every stage on the calling thread.
    Seq,
    /// Run every stage as kernels on an emulated device.
    #[default]
    Par,
}

/// The expansion mode.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliExpansion {
    /// Raise every entry to the expansion exponent.
    #[default]
    Elementwise,
    /// Raise the matrix to the expansion exponent (a positive integer).
    MatrixPower,
}

impl From<CliExpansion> for Expansion {
    fn from(e: CliExpansion) -> Self {
        match e {
            CliExpansion::Elementwise => Expansion::Elementwise,
            CliExpansion::MatrixPower => Expansion::MatrixPower,
        }
    }
}

/// The handling of columns summing to zero.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliZeroColumns {
    /// Fail as soon as a column sums to zero.
    #[default]
    Reject,
    /// Let the resulting NaN values propagate.
    Propagate,
}

impl From<CliZeroColumns> for ZeroColumns {
    fn from(z: CliZeroColumns) -> Self {
        match z {
            CliZeroColumns::Reject => ZeroColumns::Reject,
            CliZeroColumns::Propagate => ZeroColumns::Propagate,
        }
    }
}

/// Shared CLI arguments for the launch geometry of the parallel engine.
#[derive(Args, Debug)]
pub struct LaunchArgs {
    #[arg(long, default_value_t = LaunchConfig::DEFAULT_BLOCK_2D.x)]
    /// Rows of a block in two-dimensional launches.
    pub block_x: usize,

    #[arg(long, default_value_t = LaunchConfig::DEFAULT_BLOCK_2D.y)]
    /// Columns of a block in two-dimensional launches.
    pub block_y: usize,

    #[arg(long, default_value_t = LaunchConfig::DEFAULT_BLOCK_1D)]
    /// Size of a block in one-dimensional launches.
    pub block_1d: usize,

    #[arg(long, requires = "grid_y")]
    /// Blocks along rows in two-dimensional launches (advanced option;
    /// derived from the matrix size if missing).
    pub grid_x: Option<usize>,

    #[arg(long, requires = "grid_x")]
    /// Blocks along columns in two-dimensional launches (advanced option;
    /// derived from the matrix size if missing).
    pub grid_y: Option<usize>,

    #[arg(long)]
    /// Blocks in one-dimensional launches (advanced option; derived from the
    /// matrix size if missing).
    pub grid_1d: Option<usize>,
}

impl LaunchArgs {
    pub fn to_launch_config(&self) -> Result<LaunchConfig> {
        ensure!(
            self.block_x > 0 && self.block_y > 0 && self.block_1d > 0,
            "Block dimensions must be positive"
        );
        let grid_2d = match (self.grid_x, self.grid_y) {
            (Some(x), Some(y)) => Some(Dim2::new(x, y)),
            (None, None) => None,
            _ => bail!("--grid-x and --grid-y must be given together"),
        };
        Ok(LaunchConfig::default()
            .block_2d((self.block_x, self.block_y))
            .block_1d(self.block_1d)
            .grid_2d(grid_2d)
            .grid_1d(self.grid_1d))
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "run",
    about = "Run Markov Clustering on an adjacency matrix.",
    long_about = None
)]
pub struct CliArgs {
    /// Where to store the resulting matrix.
    pub output: PathBuf,

    #[arg(short, long)]
    /// The adjacency matrix; if missing, a random symmetric matrix is
    /// generated.
    pub input: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = MatrixFormat::Ascii)]
    /// The format of the adjacency matrix.
    pub input_fmt: MatrixFormat,

    #[arg(short, long, default_value_t = 8, conflicts_with = "input")]
    /// The number of nodes of the random matrix.
    pub nodes: usize,

    #[arg(short, long, default_value_t = 0, conflicts_with = "input")]
    /// The seed of the random matrix.
    pub seed: u64,

    #[arg(long, default_value_t = Mcl::DEFAULT_LOOP_VALUE)]
    /// The value added to every diagonal entry.
    pub loop_value: f64,

    #[arg(short, long, default_value_t = mcl::stages::Params::DEFAULT_EXPANSION)]
    /// The expansion exponent.
    pub expansion: f64,

    #[arg(long, value_enum, default_value_t = CliExpansion::Elementwise)]
    /// The expansion mode.
    pub expansion_mode: CliExpansion,

    #[arg(short = 'r', long, default_value_t = mcl::stages::Params::DEFAULT_INFLATION)]
    /// The inflation exponent.
    pub inflation: f64,

    #[arg(long, default_value_t = Tolerance::DEFAULT_ATOL)]
    /// The absolute tolerance of the convergence test.
    pub atol: f64,

    #[arg(long, default_value_t = Tolerance::DEFAULT_RTOL)]
    /// The relative tolerance of the convergence test.
    pub rtol: f64,

    #[arg(long, default_value_t = Mcl::DEFAULT_MAX_ITER)]
    /// Maximum number of iterations.
    pub max_iter: usize,

    #[arg(long)]
    /// Stop when the maximum residual is at most this value, rather than
    /// when all entries are close.
    pub max_residual: Option<f64>,

    #[arg(long)]
    /// Minimum number of iterations.
    pub min_iter: Option<usize>,

    #[arg(long, value_enum, default_value_t = CliZeroColumns::Reject)]
    /// How to handle columns summing to zero.
    pub zero_columns: CliZeroColumns,

    #[arg(long, value_enum, default_value_t = CliEngine::Par)]
    /// The engine.
    pub engine: CliEngine,

    #[arg(long, value_enum, default_value_t = MatrixFormat::Ascii)]
    /// The output format.
    pub fmt: MatrixFormat,

    #[arg(long)]
    /// Decimal digits for the output.
    pub precision: Option<usize>,

    #[arg(long)]
    /// Where to store the residual matrix of the last iteration.
    pub residual: Option<PathBuf>,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,

    #[clap(flatten)]
    pub launch: LaunchArgs,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        args.loop_value.is_finite() && args.loop_value >= 0.0,
        "The loop value must be finite and nonnegative, got {}",
        args.loop_value
    );
    ensure!(
        args.expansion.is_finite() && args.expansion > 0.0,
        "The expansion exponent must be positive, got {}",
        args.expansion
    );
    if let CliExpansion::MatrixPower = args.expansion_mode {
        ensure!(
            args.expansion.fract() == 0.0,
            "Matrix-power expansion needs an integer exponent, got {}",
            args.expansion
        );
    }
    ensure!(
        args.inflation.is_finite() && args.inflation > 0.0,
        "The inflation exponent must be positive, got {}",
        args.inflation
    );
    let tolerance = Tolerance::try_from((args.atol, args.rtol))?;
    let launch_config = args.launch.to_launch_config()?;

    let mut pl = progress_logger![];
    pl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let adjacency = match &args.input {
        Some(path) => {
            log::info!("Loading the adjacency matrix from {}", path.display());
            args.input_fmt.load(path)?
        }
        None => {
            log::info!(
                "Generating a random {} × {} adjacency matrix (seed {})",
                args.nodes,
                args.nodes,
                args.seed
            );
            mcl::random::symmetric(args.nodes, 1, 10, args.seed)
        }
    };

    // Build stopping predicate
    let mut predicate = match args.max_residual {
        Some(threshold) => preds::MaxResidual::try_from(threshold)?.boxed(),
        None => preds::AllClose.boxed(),
    };
    if let Some(min_iter) = args.min_iter {
        predicate = predicate.and(preds::MinIter::from(min_iter)).boxed();
    }

    // Configure MCL
    let mut mcl = Mcl::new(adjacency)?;
    mcl.loop_value(args.loop_value)
        .expansion(args.expansion)
        .expansion_mode(args.expansion_mode.into())
        .inflation(args.inflation)
        .tolerance(tolerance)
        .max_iter(args.max_iter)
        .zero_columns(args.zero_columns.into());

    // Run
    let status = match args.engine {
        CliEngine::Seq => mcl.run_with_logging(&Sequential, predicate, &mut pl)?,
        CliEngine::Par => {
            let mut device =
                Device::with_thread_pool(get_thread_pool(args.num_threads.num_threads));
            device.launch_config(launch_config);
            log::info!("Launch geometry: {:?}", device.config());
            mcl.run_with_logging(&device, predicate, &mut pl)?
        }
    };

    match mcl.closeness() {
        Some(closeness) => log::info!(
            "{} after {} iteration(s), max residual = {}",
            status,
            mcl.iterations(),
            closeness.max_residual()
        ),
        None => log::info!("{} after {} iteration(s)", status, mcl.iterations()),
    }

    // Store results
    args.fmt.store(&args.output, mcl.matrix(), args.precision)?;
    if let Some(path) = &args.residual {
        match mcl.closeness() {
            Some(closeness) => args.fmt.store(path, closeness.residual(), args.precision)?,
            None => log::warn!("No iteration was performed: no residual to store"),
        }
    }

    Ok(())
}
