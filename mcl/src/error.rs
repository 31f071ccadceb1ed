/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Error types.

use thiserror::Error;

/// Errors raised by the stages, the drivers and the compute device.
///
/// Note that running out of iterations is not an error: it is reported as
/// [`Status::BudgetExhausted`](crate::driver::Status::BudgetExhausted).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MclError {
    /// Operands have different shapes, or a square matrix was required.
    #[error("Shape mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, got.0, got.1)]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// A column sums to zero and cannot be normalized.
    #[error("Column {column} sums to zero")]
    DegenerateColumn { column: usize },

    /// The device cannot provide a buffer of the requested size.
    #[error("Cannot allocate {requested} bytes on the device ({available} available)")]
    DeviceAllocationFailure { requested: usize, available: usize },

    /// An explicit launch grid does not cover the data it is launched on.
    #[error("Launch grid {grid:?} with blocks {block:?} does not cover {extent:?}")]
    LaunchGeometry {
        grid: (usize, usize),
        block: (usize, usize),
        extent: (usize, usize),
    },

    /// Matrix-power expansion was requested with an exponent that is not a
    /// positive integer.
    #[error("Matrix-power expansion needs a positive integer exponent, got {exponent}")]
    InvalidExpansion { exponent: f64 },

    /// An input entry is negative or not finite.
    #[error("Invalid entry {value} at ({row}, {col}): entries must be finite and nonnegative")]
    InvalidEntry { row: usize, col: usize, value: f64 },
}

/// Result type for MCL operations.
pub type Result<T> = std::result::Result<T, MclError>;
