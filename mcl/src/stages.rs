/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Sequential stages of the MCL transformation.
//!
//! Each driver iteration applies [expansion](expand) and then
//! [inflation](inflate) to the current matrix. Before the first iteration the
//! adjacency matrix receives [self-loops](add_self_loops) and is
//! [normalized](normalize_columns) so that it becomes column-stochastic.
//!
//! All stages except [`add_self_loops`] return a new matrix.

use crate::error::{MclError, Result};
use crate::matrix::Matrix;
use kahan::KahanSum;

/// How to expand a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expansion {
    /// Raises every entry to the expansion exponent. This is the default.
    #[default]
    Elementwise,
    /// Multiplies the matrix by itself, as in classical MCL: the expansion
    /// exponent must be a positive integer.
    MatrixPower,
}

impl std::fmt::Display for Expansion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expansion::Elementwise => f.write_str("elementwise"),
            Expansion::MatrixPower => f.write_str("matrix power"),
        }
    }
}

/// What to do with columns summing to zero during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroColumns {
    /// Fails with [`DegenerateColumn`](MclError::DegenerateColumn). This is
    /// the default.
    #[default]
    Reject,
    /// Divides anyway: the column becomes NaN, and the NaNs propagate to the
    /// following iterations.
    Propagate,
}

impl std::fmt::Display for ZeroColumns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZeroColumns::Reject => f.write_str("reject"),
            ZeroColumns::Propagate => f.write_str("propagate"),
        }
    }
}

/// Parameters of a single iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    pub expansion: f64,
    pub expansion_mode: Expansion,
    pub inflation: f64,
    pub zero_columns: ZeroColumns,
}

impl Params {
    pub const DEFAULT_EXPANSION: f64 = 2.0;
    pub const DEFAULT_INFLATION: f64 = 2.0;
}

impl Default for Params {
    fn default() -> Self {
        Self {
            expansion: Self::DEFAULT_EXPANSION,
            expansion_mode: Expansion::default(),
            inflation: Self::DEFAULT_INFLATION,
            zero_columns: ZeroColumns::default(),
        }
    }
}

/// Adds `loop_value` to every diagonal entry, in place.
///
/// Calling this function twice adds the value twice.
pub fn add_self_loops(matrix: &mut Matrix, loop_value: f64) -> Result<()> {
    matrix.ensure_square()?;
    for i in 0..matrix.rows() {
        matrix[(i, i)] += loop_value;
    }
    Ok(())
}

/// Returns a column-stochastic copy of `matrix`.
///
/// Columns summing to zero are handled following `zero_columns`.
pub fn normalize_columns(matrix: &Matrix, zero_columns: ZeroColumns) -> Result<Matrix> {
    let sums = matrix.column_sums();
    if zero_columns == ZeroColumns::Reject {
        if let Some(column) = sums.iter().position(|&s| s == 0.0) {
            return Err(MclError::DegenerateColumn { column });
        }
    }
    let cols = matrix.cols();
    let mut result = matrix.clone();
    for (k, x) in result.as_mut_slice().iter_mut().enumerate() {
        *x /= sums[k % cols];
    }
    Ok(result)
}

/// Expands `matrix` with the given exponent.
///
/// # Panics
///
/// In [`MatrixPower`](Expansion::MatrixPower) mode, panics if the matrix is
/// not square or if the exponent is not a positive integer.
pub fn expand(matrix: &Matrix, expansion: f64, mode: Expansion) -> Matrix {
    match mode {
        Expansion::Elementwise => elementwise_pow(matrix, expansion),
        Expansion::MatrixPower => {
            assert!(matrix.is_square(), "Matrix powers need a square matrix");
            let k = matrix_power_exponent(expansion);
            let mut result = matrix.clone();
            for _ in 1..k {
                result = multiply(&result, matrix);
            }
            result
        }
    }
}

/// Raises every entry to `inflation`, and then normalizes the columns.
pub fn inflate(matrix: &Matrix, inflation: f64, zero_columns: ZeroColumns) -> Result<Matrix> {
    normalize_columns(&elementwise_pow(matrix, inflation), zero_columns)
}

/// Performs a single MCL step: [expansion](expand) followed by
/// [inflation](inflate).
pub fn iterate(matrix: &Matrix, params: &Params) -> Result<Matrix> {
    inflate(
        &expand(matrix, params.expansion, params.expansion_mode),
        params.inflation,
        params.zero_columns,
    )
}

/// Returns the product `a` · `b`.
///
/// # Panics
///
/// If the number of columns of `a` differs from the number of rows of `b`.
pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    assert_eq!(
        a.cols(),
        b.rows(),
        "Cannot multiply a {}x{} matrix by a {}x{} matrix",
        a.rows(),
        a.cols(),
        b.rows(),
        b.cols()
    );
    Matrix::from_fn(a.rows(), b.cols(), |i, j| {
        (0..a.cols())
            .fold(KahanSum::<f64>::new(), |sum, k| sum + a[(i, k)] * b[(k, j)])
            .sum()
    })
}

/// Raises `x` to `exponent`, squaring by multiplication.
#[inline(always)]
pub(crate) fn pow(x: f64, exponent: f64) -> f64 {
    if exponent == 2.0 { x * x } else { x.powf(exponent) }
}

fn elementwise_pow(matrix: &Matrix, exponent: f64) -> Matrix {
    let mut result = matrix.clone();
    result
        .as_mut_slice()
        .iter_mut()
        .for_each(|x| *x = pow(*x, exponent));
    result
}

/// Checks that `expansion` can be used in the given mode.
///
/// Fails with [`InvalidExpansion`](MclError::InvalidExpansion) if `mode` is
/// [`MatrixPower`](Expansion::MatrixPower) and `expansion` is not a positive
/// integer.
pub fn ensure_expansion(expansion: f64, mode: Expansion) -> Result<()> {
    match mode {
        Expansion::Elementwise => Ok(()),
        Expansion::MatrixPower if expansion >= 1.0 && expansion.fract() == 0.0 => Ok(()),
        Expansion::MatrixPower => Err(MclError::InvalidExpansion {
            exponent: expansion,
        }),
    }
}

/// Converts an expansion exponent into a number of factors.
pub(crate) fn matrix_power_exponent(expansion: f64) -> usize {
    assert!(
        expansion >= 1.0 && expansion.fract() == 0.0,
        "Matrix-power expansion needs a positive integer exponent, got {expansion}"
    );
    expansion as usize
}
