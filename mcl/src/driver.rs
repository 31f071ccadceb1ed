/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The MCL iteration driver.
//!
//! The driver takes an adjacency matrix, adds
//! [self-loops](crate::stages::add_self_loops) to it and
//! [normalizes](crate::stages::normalize_columns) it. Then, it iterates
//!
//! > *previous* ← *current*
//! >
//! > *current* ← inflate(expand(*previous*))
//!
//! comparing at each step *current* against *previous* with the
//! [tolerance comparator](crate::tolerance::allclose), until a convergence
//! [predicate](Predicate) holds or a maximum number of iterations is reached.
//! The two outcomes are distinguished by the returned [`Status`].
//!
//! Iterations are performed by an [`Engine`]: either the
//! [`Sequential`] one or a [`Device`](crate::device::Device).
//!
//! # Convergence
//!
//! The [`run`](Mcl::run) method accepts a composable [`Predicate`] that is
//! evaluated after each iteration. The predicate receives the current
//! iteration number, the verdict of the comparator and the maximum residual.
//! The iteration budget set by [`max_iter`](Mcl::max_iter) is always
//! enforced, so the driver terminates whatever the predicate.

pub mod preds {
    //! Convergence predicates.
    //!
    //! The [driver](super::Mcl) stops as soon as its predicate evaluates to
    //! true. You can combine the predicates using the `and` and `or` methods
    //! provided by the [`Predicate`] trait.
    //!
    //! # Examples
    //! ```
    //! # fn main() -> Result<(), Box<dyn std::error::Error>> {
    //! use predicates::prelude::*;
    //! use mcl::driver::preds::{AllClose, MinIter};
    //!
    //! let predicate = AllClose.and(MinIter::from(3)).boxed();
    //! #     Ok(())
    //! # }
    //! ```

    use anyhow::ensure;
    use predicates::{Predicate, reflection::PredicateReflection};
    use std::fmt::Display;

    #[doc(hidden)]
    /// This structure is passed to convergence predicates to provide the
    /// information that is needed to evaluate them.
    #[derive(Debug)]
    pub struct PredParams {
        pub iteration: usize,
        pub is_close: bool,
        pub max_residual: f64,
    }

    /// Holds when the comparator reports that all elements are close.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AllClose;

    impl Display for AllClose {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("(all close)")
        }
    }

    impl PredicateReflection for AllClose {}

    impl Predicate<PredParams> for AllClose {
        fn eval(&self, pred_params: &PredParams) -> bool {
            pred_params.is_close
        }
    }

    /// Holds when the maximum residual is at most a given threshold.
    ///
    /// A threshold of zero is equivalent to [`AllClose`]; a negative
    /// threshold requires a margin with respect to the tolerances.
    #[derive(Debug, Clone)]
    pub struct MaxResidual {
        threshold: f64,
    }

    impl MaxResidual {
        pub const DEFAULT_THRESHOLD: f64 = 0.0;
    }

    impl TryFrom<Option<f64>> for MaxResidual {
        type Error = anyhow::Error;
        fn try_from(threshold: Option<f64>) -> anyhow::Result<Self> {
            Ok(match threshold {
                Some(threshold) => {
                    ensure!(!threshold.is_nan());
                    ensure!(threshold.is_finite(), "The threshold must be finite");
                    MaxResidual { threshold }
                }
                None => Self::default(),
            })
        }
    }

    impl TryFrom<f64> for MaxResidual {
        type Error = anyhow::Error;
        fn try_from(threshold: f64) -> anyhow::Result<Self> {
            Some(threshold).try_into()
        }
    }

    impl Default for MaxResidual {
        fn default() -> Self {
            MaxResidual {
                threshold: Self::DEFAULT_THRESHOLD,
            }
        }
    }

    impl Display for MaxResidual {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_fmt(format_args!("(max residual: {})", self.threshold))
        }
    }

    impl PredicateReflection for MaxResidual {}

    impl Predicate<PredParams> for MaxResidual {
        fn eval(&self, pred_params: &PredParams) -> bool {
            // NaN never converges
            pred_params.max_residual <= self.threshold
        }
    }

    /// Holds after at least the provided number of iterations.
    ///
    /// Useful in conjunction with other predicates.
    #[derive(Debug, Clone)]
    pub struct MinIter {
        min_iter: usize,
    }

    impl From<usize> for MinIter {
        fn from(min_iter: usize) -> Self {
            MinIter { min_iter }
        }
    }

    impl Display for MinIter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_fmt(format_args!("(min iter: {})", self.min_iter))
        }
    }

    impl PredicateReflection for MinIter {}

    impl Predicate<PredParams> for MinIter {
        fn eval(&self, pred_params: &PredParams) -> bool {
            pred_params.iteration >= self.min_iter
        }
    }
}

use crate::device::Device;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::stages::{self, Expansion, Params, ZeroColumns};
use crate::tolerance::{self, Closeness, Tolerance};
use dsi_progress_logger::{ProgressLog, no_logging};
use predicates::Predicate;

/// Performs driver iterations.
pub trait Engine {
    /// Computes the matrix following `previous` and compares it against
    /// `previous`.
    fn step(
        &self,
        previous: &Matrix,
        params: &Params,
        tolerance: Tolerance,
    ) -> Result<(Matrix, Closeness)>;
}

/// The sequential engine, based on the functions in
/// [`stages`](crate::stages).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Engine for Sequential {
    fn step(
        &self,
        previous: &Matrix,
        params: &Params,
        tolerance: Tolerance,
    ) -> Result<(Matrix, Closeness)> {
        previous.ensure_square()?;
        stages::ensure_expansion(params.expansion, params.expansion_mode)?;
        let current = stages::iterate(previous, params)?;
        let closeness = tolerance::allclose(&current, previous, tolerance)?;
        Ok((current, closeness))
    }
}

/// The terminal state of a driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The convergence predicate holds and the comparator reports that the
    /// last two matrices are close.
    Converged,
    /// The convergence predicate holds, but the comparator does not report
    /// the last two matrices as close (e.g., with [`MinIter`](preds::MinIter)
    /// alone, or with a positive [`MaxResidual`](preds::MaxResidual)
    /// threshold).
    Stopped,
    /// The maximum number of iterations was reached before the predicate
    /// held.
    BudgetExhausted,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Converged => f.write_str("converged"),
            Status::Stopped => f.write_str("stopped"),
            Status::BudgetExhausted => f.write_str("budget exhausted"),
        }
    }
}

/// Runs the MCL transformation.
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run) or [`par_run`](Self::par_run). After completion the
/// resulting matrix is available via the [`matrix`](Self::matrix) method.
/// Every run starts anew from the adjacency matrix passed to the
/// [constructor](Self::new).
///
/// # Examples
///
/// ```
/// use mcl::driver::{Mcl, Status, preds};
/// use mcl::matrix::Matrix;
///
/// // Two triangles joined by a single edge
/// let mut adj = Matrix::zeros(6, 6);
/// for (i, j) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (2, 3)] {
///     adj[(i, j)] = 1.0;
///     adj[(j, i)] = 1.0;
/// }
///
/// let mut mcl = Mcl::new(adj)?;
/// mcl.max_iter(200);
/// let status = mcl.run(preds::AllClose)?;
///
/// assert_eq!(status, Status::Converged);
/// assert!(mcl.matrix().is_column_stochastic(1E-9));
/// # Ok::<(), mcl::error::MclError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Mcl {
    adjacency: Matrix,
    loop_value: f64,
    params: Params,
    tolerance: Tolerance,
    max_iter: usize,

    matrix: Matrix,
    closeness: Option<Closeness>,
    iteration: usize,
    status: Option<Status>,
}

impl Mcl {
    pub const DEFAULT_LOOP_VALUE: f64 = 1.0;
    pub const DEFAULT_MAX_ITER: usize = 100;

    /// Creates a new MCL computation on the given adjacency matrix.
    ///
    /// Fails if the matrix is not square, or if it contains negative or
    /// non-finite entries.
    pub fn new(adjacency: Matrix) -> Result<Self> {
        adjacency.ensure_square()?;
        adjacency.ensure_nonnegative()?;
        Ok(Self {
            matrix: adjacency.clone(),
            adjacency,
            loop_value: Self::DEFAULT_LOOP_VALUE,
            params: Params::default(),
            tolerance: Tolerance::default(),
            max_iter: Self::DEFAULT_MAX_ITER,
            closeness: None,
            iteration: 0,
            status: None,
        })
    }

    /// Sets the value added to the diagonal before the first normalization.
    ///
    /// # Panics
    ///
    /// If `loop_value` is negative or not finite.
    pub fn loop_value(&mut self, loop_value: f64) -> &mut Self {
        assert!(
            loop_value.is_finite() && loop_value >= 0.0,
            "The loop value must be finite and nonnegative, got {loop_value}"
        );
        self.loop_value = loop_value;
        self
    }

    /// Sets the expansion exponent.
    ///
    /// In [`MatrixPower`](Expansion::MatrixPower) mode the exponent must be
    /// a positive integer, or runs fail with
    /// [`InvalidExpansion`](crate::error::MclError::InvalidExpansion).
    ///
    /// # Panics
    ///
    /// If `expansion` is not positive and finite.
    pub fn expansion(&mut self, expansion: f64) -> &mut Self {
        assert!(
            expansion.is_finite() && expansion > 0.0,
            "The expansion exponent must be positive, got {expansion}"
        );
        self.params.expansion = expansion;
        self
    }

    /// Sets the [expansion mode](Expansion).
    pub fn expansion_mode(&mut self, mode: Expansion) -> &mut Self {
        self.params.expansion_mode = mode;
        self
    }

    /// Sets the inflation exponent.
    ///
    /// # Panics
    ///
    /// If `inflation` is not positive and finite.
    pub fn inflation(&mut self, inflation: f64) -> &mut Self {
        assert!(
            inflation.is_finite() && inflation > 0.0,
            "The inflation exponent must be positive, got {inflation}"
        );
        self.params.inflation = inflation;
        self
    }

    /// Sets the tolerances of the comparator.
    pub fn tolerance(&mut self, tolerance: Tolerance) -> &mut Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of iterations.
    pub fn max_iter(&mut self, max_iter: usize) -> &mut Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the handling of columns summing to zero.
    pub fn zero_columns(&mut self, zero_columns: ZeroColumns) -> &mut Self {
        self.params.zero_columns = zero_columns;
        self
    }

    /// Returns the parameters of an iteration.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the current matrix.
    ///
    /// Before the first run, this is the adjacency matrix. After a
    /// successful run, it is the matrix at the terminal state. A failed run
    /// leaves it unchanged.
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> Matrix {
        self.matrix
    }

    /// Returns the result of the last comparison, if any iteration was
    /// performed.
    pub fn closeness(&self) -> Option<&Closeness> {
        self.closeness.as_ref()
    }

    /// Returns the number of iterations performed by the last run.
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Returns the status of the last run, or `None` if no run completed.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Runs sequentially until the given predicate holds or the iteration
    /// budget is exhausted.
    pub fn run(&mut self, predicate: impl Predicate<preds::PredParams>) -> Result<Status> {
        self.run_with_logging(&Sequential, predicate, no_logging![])
    }

    /// Runs on a device until the given predicate holds or the iteration
    /// budget is exhausted.
    pub fn par_run(
        &mut self,
        device: &Device,
        predicate: impl Predicate<preds::PredParams>,
    ) -> Result<Status> {
        self.run_with_logging(device, predicate, no_logging![])
    }

    /// Runs on the given engine until the given predicate holds or the
    /// iteration budget is exhausted, logging progress.
    ///
    /// `pl` is used for iteration counting; its options will be preserved,
    /// making thus possible to customize the logs. Pass
    /// [`no_logging![]`](dsi_progress_logger::no_logging) to log nothing.
    pub fn run_with_logging(
        &mut self,
        engine: &impl Engine,
        predicate: impl Predicate<preds::PredParams>,
        pl: &mut impl ProgressLog,
    ) -> Result<Status> {
        let n = self.adjacency.rows();
        log::info!("Nodes: {}", n);
        log::info!("Loop value: {}", self.loop_value);
        log::info!(
            "Expansion: {} ({})",
            self.params.expansion,
            self.params.expansion_mode
        );
        log::info!("Inflation: {}", self.params.inflation);
        log::info!("Zero columns: {}", self.params.zero_columns);
        log::info!("Tolerance: {}", self.tolerance);
        log::info!("Convergence criterion: {}", predicate);
        log::info!("Maximum iterations: {}", self.max_iter);

        self.iteration = 0;
        self.closeness = None;
        self.status = None;

        stages::ensure_expansion(self.params.expansion, self.params.expansion_mode)?;

        let mut current = self.adjacency.clone();
        stages::add_self_loops(&mut current, self.loop_value)?;
        let mut current = stages::normalize_columns(&current, self.params.zero_columns)?;

        if n == 0 {
            self.matrix = current;
            self.status = Some(Status::Converged);
            return Ok(Status::Converged);
        }

        pl.item_name("iteration");
        pl.expected_updates(Some(self.max_iter));
        pl.start("Iterating...");

        let status = loop {
            if self.iteration >= self.max_iter {
                break Status::BudgetExhausted;
            }

            let previous = current;
            let (next, closeness) = engine.step(&previous, &self.params, self.tolerance)?;
            current = next;
            self.iteration += 1;

            let params = preds::PredParams {
                iteration: self.iteration,
                is_close: closeness.is_close(),
                max_residual: closeness.max_residual(),
            };
            log::debug!(
                "Iteration {}: max residual = {}",
                self.iteration,
                params.max_residual
            );
            self.closeness = Some(closeness);
            pl.update_and_display();

            if predicate.eval(&params) {
                break if params.is_close {
                    Status::Converged
                } else {
                    Status::Stopped
                };
            }
        };

        pl.done();

        if !current.is_finite() {
            log::warn!("The result contains non-finite values");
        }
        log::info!(
            "Completed after {} iteration(s): {}",
            self.iteration,
            status
        );

        self.matrix = current;
        self.status = Some(status);
        Ok(status)
    }
}
