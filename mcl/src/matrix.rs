/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Dense matrices.

use crate::error::{MclError, Result};
use kahan::KahanSum;
use std::ops::{Index, IndexMut};

/// A dense matrix of `f64` stored in row-major order.
///
/// Element (*i*, *j*) lives at index *i* · `cols` + *j* of the
/// [underlying slice](Matrix::as_slice). The algorithm only works on square
/// matrices, but rectangular ones can be built, and every operation that
/// needs a square matrix checks it.
///
/// # Examples
///
/// ```
/// use mcl::matrix::Matrix;
///
/// let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]])?;
/// assert_eq!(m[(1, 0)], 3.0);
/// assert_eq!(m.column_sums(), vec![4.0, 6.0]);
/// # Ok::<(), mcl::error::MclError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Box<[f64]>,
}

impl Matrix {
    /// Creates a zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols].into_boxed_slice(),
        }
    }

    /// Creates a square matrix with ones on the diagonal.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Wraps row-major data.
    ///
    /// Fails with [`ShapeMismatch`](MclError::ShapeMismatch) if the length of
    /// `data` is not `rows` · `cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MclError::ShapeMismatch {
                expected: (rows, cols),
                got: (1, data.len()),
            });
        }
        Ok(Self {
            rows,
            cols,
            data: data.into_boxed_slice(),
        })
    }

    /// Builds a matrix from a slice of rows, which must all have the same
    /// length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(MclError::ShapeMismatch {
                    expected: (rows.len(), cols),
                    got: (rows.len(), row.len()),
                });
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), cols, data)
    }

    /// Builds a matrix by evaluating `f` on every (row, column) pair.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self {
            rows,
            cols,
            data: data.into_boxed_slice(),
        }
    }

    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the pair (rows, columns).
    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the row-major content of the matrix.
    #[inline(always)]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_boxed_slice(self) -> Box<[f64]> {
        self.data
    }

    /// Returns an iterator over the rows of the matrix.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on zero
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Returns an iterator over the entries of column `j`.
    pub fn column(&self, j: usize) -> impl Iterator<Item = f64> + '_ {
        assert!(j < self.cols, "Column {j} out of range (cols = {})", self.cols);
        (0..self.rows).map(move |i| self.data[i * self.cols + j])
    }

    /// Returns the (compensated) sum of each column.
    pub fn column_sums(&self) -> Vec<f64> {
        (0..self.cols)
            .map(|j| {
                self.column(j)
                    .fold(KahanSum::<f64>::new(), |sum, x| sum + x)
                    .sum()
            })
            .collect()
    }

    /// Returns true if every column sums to one within `tolerance`.
    pub fn is_column_stochastic(&self, tolerance: f64) -> bool {
        self.column_sums()
            .into_iter()
            .all(|s| (s - 1.0).abs() <= tolerance)
    }

    /// Returns true if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Returns the (row, column) positions of all non-finite entries, in
    /// row-major order.
    pub fn non_finite_positions(&self) -> Vec<(usize, usize)> {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, x)| !x.is_finite())
            .map(|(k, _)| (k / self.cols, k % self.cols))
            .collect()
    }

    /// Returns the maximum entry, or [`None`] if the matrix is empty.
    ///
    /// NaN entries are ignored unless all entries are NaN.
    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }

    /// Returns the transpose.
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self[(j, i)])
    }

    /// Checks that `other` has the same shape as `self`.
    pub fn ensure_same_shape(&self, other: &Matrix) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(MclError::ShapeMismatch {
                expected: self.shape(),
                got: other.shape(),
            });
        }
        Ok(())
    }

    /// Checks that the matrix is square.
    pub fn ensure_square(&self) -> Result<()> {
        if !self.is_square() {
            return Err(MclError::ShapeMismatch {
                expected: (self.rows, self.rows),
                got: self.shape(),
            });
        }
        Ok(())
    }

    /// Checks that all entries are finite and nonnegative.
    pub fn ensure_nonnegative(&self) -> Result<()> {
        match self
            .data
            .iter()
            .position(|x| !x.is_finite() || *x < 0.0)
        {
            Some(k) => Err(MclError::InvalidEntry {
                row: k / self.cols,
                col: k % self.cols,
                value: self.data[k],
            }),
            None => Ok(()),
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline(always)]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        debug_assert!(i < self.rows && j < self.cols);
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline(always)]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        debug_assert!(i < self.rows && j < self.cols);
        &mut self.data[i * self.cols + j]
    }
}

impl std::fmt::Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.iter_rows() {
            let mut first = true;
            for x in row {
                if !first {
                    f.write_str(" ")?;
                }
                first = false;
                write!(f, "{x}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
