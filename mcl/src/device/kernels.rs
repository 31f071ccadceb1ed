/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Kernels of the parallel MCL engine.
//!
//! Every kernel is executed by a single compute unit, which derives from its
//! coordinates the element, or the column, it owns. Units whose position
//! falls outside the data do nothing, so grids may be larger than needed.
//!
//! Each unit reads only the locations it owns (or read-only buffers) and
//! writes only the locations it owns, so kernels can be launched without
//! further synchronization.

use super::{MatrixCells, MatrixView, Unit1, Unit2};
use crate::stages::pow;
use crate::tolerance::Tolerance;
use kahan::KahanSum;

/// One unit per element: raises the element to `exponent`.
#[inline]
pub fn expand(unit: Unit2, input: MatrixView, output: MatrixCells<f64>, exponent: f64) {
    let (x, y) = unit.pos();
    if x < input.rows && y < input.cols {
        // SAFETY: the unit owns (x, y)
        unsafe { output.set(x, y, pow(input.get(x, y), exponent)) };
    }
}

/// One unit per element: computes the element (`x`, `y`) of `a` · `b`.
#[inline]
pub fn multiply(unit: Unit2, a: MatrixView, b: MatrixView, output: MatrixCells<f64>) {
    let (x, y) = unit.pos();
    if x < a.rows && y < b.cols {
        let sum = (0..a.cols)
            .fold(KahanSum::<f64>::new(), |sum, k| sum + a.get(x, k) * b.get(k, y))
            .sum();
        // SAFETY: the unit owns (x, y)
        unsafe { output.set(x, y, sum) };
    }
}

/// One unit per column: raises the entries of the column to `exponent` into
/// `scratch`, sums them, and writes the normalized column to `output`.
///
/// `degenerate` has one entry per column, which is set to true if the column
/// sums to zero; in that case the column of `output` is NaN.
#[inline]
pub fn inflate(
    unit: Unit1,
    input: MatrixView,
    scratch: MatrixCells<f64>,
    output: MatrixCells<f64>,
    degenerate: MatrixCells<bool>,
    exponent: f64,
) {
    let x = unit.pos();
    if x < input.cols {
        // SAFETY: the unit owns column x of scratch and output, and entry x
        // of degenerate
        unsafe {
            for i in 0..input.rows {
                scratch.set(i, x, pow(input.get(i, x), exponent));
            }
            let mut sum = KahanSum::<f64>::new();
            for i in 0..input.rows {
                sum += scratch.get(i, x);
            }
            let sum = sum.sum();
            for i in 0..input.rows {
                output.set(i, x, scratch.get(i, x) / sum);
            }
            degenerate.set(0, x, sum == 0.0);
        }
    }
}

/// One unit per element: writes the residual of `new` against the reference
/// `old`, and whether it is nonpositive.
#[inline]
pub fn check_converge(
    unit: Unit2,
    old: MatrixView,
    new: MatrixView,
    residual: MatrixCells<f64>,
    verdict: MatrixCells<bool>,
    tolerance: Tolerance,
) {
    let (x, y) = unit.pos();
    if x < old.rows && y < old.cols {
        let c = tolerance.residual(new.get(x, y), old.get(x, y));
        // SAFETY: the unit owns (x, y)
        unsafe {
            residual.set(x, y, c);
            verdict.set(x, y, c <= 0.0);
        }
    }
}
