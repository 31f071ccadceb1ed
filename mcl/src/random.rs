/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Seeded random matrices.

use crate::matrix::Matrix;
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Returns an `n` × `n` matrix of integers drawn uniformly in [`low` . .
/// `high`), given a seed for the [pseudorandom number generator](SmallRng).
///
/// # Panics
///
/// If `low` ≥ `high`.
pub fn uniform(n: usize, low: u32, high: u32, seed: u64) -> Matrix {
    assert!(low < high, "Empty range [{low} . . {high})");
    let mut rng = SmallRng::seed_from_u64(seed);
    Matrix::from_fn(n, n, |_, _| rng.random_range(low..high) as f64)
}

/// Returns a symmetric `n` × `n` matrix of integers drawn uniformly in
/// [`low` . . `high`).
///
/// The matrix is obtained from a [uniform] one by mirroring its lower
/// triangle (diagonal included) onto the upper one.
///
/// # Examples
///
/// ```
/// use mcl::random;
///
/// let m = random::symmetric(16, 1, 10, 42);
/// assert_eq!(m, m.transpose());
/// assert!(m.as_slice().iter().all(|&x| (1.0..10.0).contains(&x)));
/// ```
pub fn symmetric(n: usize, low: u32, high: u32, seed: u64) -> Matrix {
    let start = uniform(n, low, high, seed);
    Matrix::from_fn(n, n, |i, j| {
        if j <= i {
            start[(i, j)]
        } else {
            start[(j, i)]
        }
    })
}
