/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Parallel stages of the MCL transformation.
//!
//! The functions in this module mirror those in [`stages`](crate::stages)
//! and [`tolerance`](crate::tolerance), but run the corresponding
//! [kernels](crate::device::kernels) on a [`Device`]. Results are identical,
//! bit for bit, to the sequential ones.
//!
//! The `*_on` variants work on matrices already in device memory; the others
//! copy their arguments to the device and the result back to the host.
//!
//! A [`Device`] is also an [`Engine`]: a driver iteration uploads the
//! previous matrix, launches the expansion, inflation and convergence
//! kernels in this order, and downloads the new matrix, the residuals and
//! the verdicts. All buffers are released at the end of the iteration.

use crate::device::{Device, DeviceBuffer, DeviceMatrix, MatrixCells, kernels};
use crate::driver::Engine;
use crate::error::{MclError, Result};
use crate::matrix::Matrix;
use crate::stages::{Expansion, Params, ZeroColumns, ensure_expansion, matrix_power_exponent};
use crate::tolerance::{Closeness, Tolerance};

/// Returns `a` · `b` as a new device matrix.
pub fn multiply_on<'d>(
    device: &'d Device,
    a: &DeviceMatrix<'_>,
    b: &DeviceMatrix<'_>,
) -> Result<DeviceMatrix<'d>> {
    if a.cols() != b.rows() {
        return Err(MclError::ShapeMismatch {
            expected: (a.cols(), b.cols()),
            got: b.shape(),
        });
    }
    let mut output = DeviceMatrix::alloc(device, a.rows(), b.cols())?;
    let (a, b, cells) = (a.view(), b.view(), output.cells());
    device.launch_over_elements(a.rows, b.cols, |unit| {
        kernels::multiply(unit, a, b, cells)
    })?;
    Ok(output)
}

/// Expands a device matrix.
///
/// # Panics
///
/// In [`MatrixPower`](Expansion::MatrixPower) mode, if the exponent is not a
/// positive integer.
pub fn expand_on<'d>(
    device: &'d Device,
    input: &DeviceMatrix<'_>,
    expansion: f64,
    mode: Expansion,
) -> Result<DeviceMatrix<'d>> {
    match mode {
        Expansion::Elementwise => {
            let mut output = DeviceMatrix::alloc(device, input.rows(), input.cols())?;
            let (view, cells) = (input.view(), output.cells());
            device.launch_over_elements(view.rows, view.cols, |unit| {
                kernels::expand(unit, view, cells, expansion)
            })?;
            Ok(output)
        }
        Expansion::MatrixPower => {
            let k = matrix_power_exponent(expansion);
            if k == 1 {
                return DeviceMatrix::from_host(device, &input.to_host()?);
            }
            let mut result = multiply_on(device, input, input)?;
            for _ in 2..k {
                result = multiply_on(device, &result, input)?;
            }
            Ok(result)
        }
    }
}

/// Inflates a device matrix.
///
/// Columns summing to zero are handled following `zero_columns`.
pub fn inflate_on<'d>(
    device: &'d Device,
    input: &DeviceMatrix<'_>,
    inflation: f64,
    zero_columns: ZeroColumns,
) -> Result<DeviceMatrix<'d>> {
    let (rows, cols) = input.shape();
    let mut scratch = DeviceMatrix::alloc(device, rows, cols)?;
    let mut output = DeviceMatrix::alloc(device, rows, cols)?;
    let mut degenerate = DeviceBuffer::<bool>::alloc(device, cols)?;

    let view = input.view();
    let (scratch_cells, output_cells) = (scratch.cells(), output.cells());
    let degenerate_cells = MatrixCells::new(&mut degenerate, 1, cols);
    device.launch_over_items(cols, |unit| {
        kernels::inflate(
            unit,
            view,
            scratch_cells,
            output_cells,
            degenerate_cells,
            inflation,
        )
    })?;

    if zero_columns == ZeroColumns::Reject {
        if let Some(column) = degenerate.as_slice().iter().position(|&d| d) {
            return Err(MclError::DegenerateColumn { column });
        }
    }
    Ok(output)
}

/// Compares the device matrix `new` against the reference `old`.
///
/// The verdicts of the compute units are reduced on the host.
pub fn check_converge_on(
    device: &Device,
    new: &DeviceMatrix<'_>,
    old: &DeviceMatrix<'_>,
    tolerance: Tolerance,
) -> Result<Closeness> {
    if new.shape() != old.shape() {
        return Err(MclError::ShapeMismatch {
            expected: new.shape(),
            got: old.shape(),
        });
    }
    let (rows, cols) = old.shape();
    let mut residual = DeviceMatrix::alloc(device, rows, cols)?;
    let mut verdict = DeviceBuffer::<bool>::alloc(device, rows * cols)?;

    let (old_view, new_view) = (old.view(), new.view());
    let residual_cells = residual.cells();
    let verdict_cells = MatrixCells::new(&mut verdict, rows, cols);
    device.launch_over_elements(rows, cols, |unit| {
        kernels::check_converge(
            unit,
            old_view,
            new_view,
            residual_cells,
            verdict_cells,
            tolerance,
        )
    })?;

    Ok(Closeness {
        is_close: verdict.to_host().into_iter().all(|v| v),
        residual: residual.to_host()?,
    })
}

/// Expands a matrix on the device.
///
/// See [`stages::expand`](crate::stages::expand).
pub fn expand(device: &Device, matrix: &Matrix, expansion: f64, mode: Expansion) -> Result<Matrix> {
    if mode == Expansion::MatrixPower {
        matrix.ensure_square()?;
    }
    ensure_expansion(expansion, mode)?;
    let input = DeviceMatrix::from_host(device, matrix)?;
    expand_on(device, &input, expansion, mode)?.to_host()
}

/// Inflates a matrix on the device.
///
/// See [`stages::inflate`](crate::stages::inflate).
pub fn inflate(
    device: &Device,
    matrix: &Matrix,
    inflation: f64,
    zero_columns: ZeroColumns,
) -> Result<Matrix> {
    let input = DeviceMatrix::from_host(device, matrix)?;
    inflate_on(device, &input, inflation, zero_columns)?.to_host()
}

/// Compares `a` against the reference `b` on the device.
///
/// See [`allclose`](crate::tolerance::allclose).
pub fn allclose(device: &Device, a: &Matrix, b: &Matrix, tolerance: Tolerance) -> Result<Closeness> {
    a.ensure_same_shape(b)?;
    let new = DeviceMatrix::from_host(device, a)?;
    let old = DeviceMatrix::from_host(device, b)?;
    check_converge_on(device, &new, &old, tolerance)
}

/// Performs a single MCL step on the device.
///
/// See [`stages::iterate`](crate::stages::iterate).
pub fn iterate(device: &Device, matrix: &Matrix, params: &Params) -> Result<Matrix> {
    matrix.ensure_square()?;
    ensure_expansion(params.expansion, params.expansion_mode)?;
    let input = DeviceMatrix::from_host(device, matrix)?;
    let expanded = expand_on(device, &input, params.expansion, params.expansion_mode)?;
    inflate_on(device, &expanded, params.inflation, params.zero_columns)?.to_host()
}

impl Engine for Device {
    fn step(
        &self,
        previous: &Matrix,
        params: &Params,
        tolerance: Tolerance,
    ) -> Result<(Matrix, Closeness)> {
        previous.ensure_square()?;
        ensure_expansion(params.expansion, params.expansion_mode)?;
        let old = DeviceMatrix::from_host(self, previous)?;
        let expanded = expand_on(self, &old, params.expansion, params.expansion_mode)?;
        let new = inflate_on(self, &expanded, params.inflation, params.zero_columns)?;
        drop(expanded);
        let closeness = check_converge_on(self, &new, &old, tolerance)?;
        Ok((new.to_host()?, closeness))
    }
}
