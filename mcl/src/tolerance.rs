/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Elementwise closeness of matrices.
//!
//! Two matrices *A* and *B* are close if for every element
//!
//! > |*aᵢⱼ* − *bᵢⱼ*| − (atol + rtol · |*bᵢⱼ*|) ≤ 0.
//!
//! The left-hand side is the _residual_. Note that the test is not symmetric:
//! *B* is the reference used for the relative term. The driver always uses
//! the previous matrix as reference.

use crate::error::Result;
use crate::matrix::Matrix;
use anyhow::ensure;

/// Absolute and relative tolerances.
///
/// Both engines use the same tolerances, so a sequential run and a parallel
/// run stop at the same iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    atol: f64,
    rtol: f64,
}

impl Tolerance {
    pub const DEFAULT_ATOL: f64 = 1E-8;
    pub const DEFAULT_RTOL: f64 = 1E-5;

    #[inline(always)]
    pub fn atol(&self) -> f64 {
        self.atol
    }

    #[inline(always)]
    pub fn rtol(&self) -> f64 {
        self.rtol
    }

    /// Returns the residual of a single pair of entries, `reference` being
    /// the entry used for the relative term.
    #[inline(always)]
    pub fn residual(&self, value: f64, reference: f64) -> f64 {
        (value - reference).abs() - (self.atol + self.rtol * reference.abs())
    }
}

impl TryFrom<(f64, f64)> for Tolerance {
    type Error = anyhow::Error;
    /// Builds a tolerance from a pair (atol, rtol).
    fn try_from((atol, rtol): (f64, f64)) -> anyhow::Result<Self> {
        ensure!(
            atol.is_finite() && atol >= 0.0,
            "The absolute tolerance must be finite and nonnegative, got {atol}"
        );
        ensure!(
            rtol.is_finite() && rtol >= 0.0,
            "The relative tolerance must be finite and nonnegative, got {rtol}"
        );
        Ok(Tolerance { atol, rtol })
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            atol: Self::DEFAULT_ATOL,
            rtol: Self::DEFAULT_RTOL,
        }
    }
}

impl std::fmt::Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("(atol: {}, rtol: {})", self.atol, self.rtol))
    }
}

/// The outcome of a comparison: the verdict and the elementwise residual.
#[derive(Debug, Clone, PartialEq)]
pub struct Closeness {
    pub(crate) is_close: bool,
    pub(crate) residual: Matrix,
}

impl Closeness {
    /// Returns true if every residual is nonpositive.
    #[inline(always)]
    pub fn is_close(&self) -> bool {
        self.is_close
    }

    /// Returns the residual matrix.
    pub fn residual(&self) -> &Matrix {
        &self.residual
    }

    pub fn into_residual(self) -> Matrix {
        self.residual
    }

    /// Returns the maximum residual, or −∞ for empty matrices.
    ///
    /// If some residual is NaN, the result is NaN.
    pub fn max_residual(&self) -> f64 {
        let r = self.residual.as_slice();
        if r.iter().any(|x| x.is_nan()) {
            return f64::NAN;
        }
        r.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Compares `a` against the reference `b`.
///
/// Returns a [`Closeness`] whose verdict is true if and only if the maximum
/// residual is nonpositive. A NaN residual is never close. Fails with
/// [`ShapeMismatch`](crate::error::MclError::ShapeMismatch) if the shapes
/// differ.
///
/// # Examples
///
/// ```
/// use mcl::matrix::Matrix;
/// use mcl::tolerance::{Tolerance, allclose};
///
/// let a = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]])?;
/// let mut b = a.clone();
/// b[(0, 0)] += 1E-12;
///
/// assert!(allclose(&a, &b, Tolerance::default())?.is_close());
/// b[(0, 0)] += 1E-3;
/// assert!(!allclose(&a, &b, Tolerance::default())?.is_close());
/// # Ok::<(), mcl::error::MclError>(())
/// ```
pub fn allclose(a: &Matrix, b: &Matrix, tolerance: Tolerance) -> Result<Closeness> {
    a.ensure_same_shape(b)?;
    let residual: Vec<f64> = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(&x, &y)| tolerance.residual(x, y))
        .collect();
    // Written so that NaN residuals fail the test
    let is_close = residual.iter().all(|&c| c <= 0.0);
    Ok(Closeness {
        is_close,
        residual: Matrix::from_vec(a.rows(), a.cols(), residual)?,
    })
}
