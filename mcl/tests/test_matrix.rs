/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use mcl::error::MclError;
use mcl::matrix::Matrix;
use mcl::random;

#[test]
fn test_from_vec_wrong_length() {
    assert_eq!(
        Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0]),
        Err(MclError::ShapeMismatch {
            expected: (2, 2),
            got: (1, 3)
        })
    );
}

#[test]
fn test_from_rows_ragged() {
    assert!(matches!(
        Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]),
        Err(MclError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_empty() -> Result<()> {
    let m = Matrix::from_rows(&[])?;
    assert_eq!(m.shape(), (0, 0));
    assert!(m.is_empty());
    assert!(m.is_square());
    assert!(m.column_sums().is_empty());
    assert_eq!(m.max(), None);
    assert_eq!(m.iter_rows().count(), 0);
    Ok(())
}

#[test]
fn test_row_major_layout() -> Result<()> {
    let m = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])?;
    assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(m[(0, 2)], 3.0);
    assert_eq!(m[(1, 0)], 4.0);
    assert_eq!(m.column(1).collect::<Vec<_>>(), vec![2.0, 5.0]);
    assert_eq!(m.column_sums(), vec![5.0, 7.0, 9.0]);
    assert_eq!(
        m.transpose(),
        Matrix::from_rows(&[vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]])?
    );
    Ok(())
}

#[test]
fn test_ensure_square() -> Result<()> {
    let m = Matrix::zeros(2, 3);
    assert_eq!(
        m.ensure_square(),
        Err(MclError::ShapeMismatch {
            expected: (2, 2),
            got: (2, 3)
        })
    );
    Matrix::identity(3).ensure_square()?;
    Ok(())
}

#[test]
fn test_ensure_nonnegative() -> Result<()> {
    let mut m = Matrix::identity(3);
    m.ensure_nonnegative()?;
    m[(2, 1)] = -0.5;
    assert_eq!(
        m.ensure_nonnegative(),
        Err(MclError::InvalidEntry {
            row: 2,
            col: 1,
            value: -0.5
        })
    );
    m[(2, 1)] = f64::INFINITY;
    assert!(matches!(
        m.ensure_nonnegative(),
        Err(MclError::InvalidEntry { row: 2, col: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_non_finite_positions() {
    let mut m = Matrix::zeros(3, 3);
    assert!(m.is_finite());
    m[(0, 1)] = f64::NAN;
    m[(2, 1)] = f64::INFINITY;
    assert!(!m.is_finite());
    assert_eq!(m.non_finite_positions(), vec![(0, 1), (2, 1)]);
}

#[test]
fn test_is_column_stochastic() -> Result<()> {
    let m = Matrix::from_rows(&[vec![0.25, 1.0], vec![0.75, 0.0]])?;
    assert!(m.is_column_stochastic(0.0));
    let m = Matrix::from_rows(&[vec![0.25, 1.0], vec![0.7, 0.0]])?;
    assert!(!m.is_column_stochastic(1E-3));
    Ok(())
}

#[test]
fn test_display() -> Result<()> {
    let m = Matrix::from_rows(&[vec![1.0, 2.5], vec![0.0, 4.0]])?;
    assert_eq!(m.to_string(), "1 2.5\n0 4\n");
    Ok(())
}

#[test]
fn test_random_symmetric() {
    let m = random::symmetric(50, 1, 10, 42);
    assert_eq!(m.shape(), (50, 50));
    assert_eq!(m, m.transpose());
    assert!(m.as_slice().iter().all(|&x| (1.0..10.0).contains(&x)));
    assert!(m.as_slice().iter().all(|x| x.fract() == 0.0));
    // Deterministic
    assert_eq!(m, random::symmetric(50, 1, 10, 42));
    assert_ne!(m, random::symmetric(50, 1, 10, 43));
}

#[test]
fn test_random_uniform_lower_triangle() {
    let u = random::uniform(20, 1, 10, 0);
    let s = random::symmetric(20, 1, 10, 0);
    for i in 0..20 {
        for j in 0..=i {
            assert_eq!(s[(i, j)], u[(i, j)]);
        }
    }
}
