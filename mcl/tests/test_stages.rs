/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use mcl::error::MclError;
use mcl::matrix::Matrix;
use mcl::random;
use mcl::stages::*;
use mcl::tolerance::Tolerance;

#[test]
fn test_self_loops() -> Result<()> {
    for &v in &[0.0, 1.0, 2.5] {
        let original = random::symmetric(12, 1, 10, 1);
        let mut m = original.clone();
        add_self_loops(&mut m, v)?;
        for i in 0..12 {
            for j in 0..12 {
                if i == j {
                    assert_eq!(m[(i, j)] - original[(i, j)], v);
                } else {
                    assert_eq!(m[(i, j)], original[(i, j)]);
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_self_loops_compound() -> Result<()> {
    let mut m = Matrix::zeros(3, 3);
    add_self_loops(&mut m, 1.0)?;
    add_self_loops(&mut m, 1.0)?;
    assert_eq!(m[(1, 1)], 2.0);
    Ok(())
}

#[test]
fn test_self_loops_not_square() {
    let mut m = Matrix::zeros(2, 3);
    assert!(matches!(
        add_self_loops(&mut m, 1.0),
        Err(MclError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_normalize() -> Result<()> {
    let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 2.0]])?;
    let n = normalize_columns(&m, ZeroColumns::Reject)?;
    assert_eq!(
        n,
        Matrix::from_rows(&[vec![0.25, 0.5], vec![0.75, 0.5]])?
    );
    // The input is untouched
    assert_eq!(m[(0, 0)], 1.0);
    Ok(())
}

#[test]
fn test_normalize_idempotent() -> Result<()> {
    let m = normalize_columns(&random::uniform(30, 1, 10, 3), ZeroColumns::Reject)?;
    assert!(m.is_column_stochastic(1E-12));
    let n = normalize_columns(&m, ZeroColumns::Reject)?;
    for (x, y) in m.as_slice().iter().zip(n.as_slice()) {
        assert!((x - y).abs() <= f64::EPSILON);
    }
    Ok(())
}

#[test]
fn test_normalize_zero_column_reject() {
    let mut m = random::uniform(5, 1, 10, 0);
    for i in 0..5 {
        m[(i, 3)] = 0.0;
    }
    assert_eq!(
        normalize_columns(&m, ZeroColumns::Reject),
        Err(MclError::DegenerateColumn { column: 3 })
    );
    assert_eq!(
        inflate(&m, 2.0, ZeroColumns::Reject),
        Err(MclError::DegenerateColumn { column: 3 })
    );
}

#[test]
fn test_normalize_zero_column_propagate() -> Result<()> {
    let mut m = random::uniform(5, 1, 10, 0);
    for i in 0..5 {
        m[(i, 3)] = 0.0;
    }
    let n = normalize_columns(&m, ZeroColumns::Propagate)?;
    assert_eq!(
        n.non_finite_positions(),
        (0..5).map(|i| (i, 3)).collect::<Vec<_>>()
    );
    assert!(n.column(3).all(f64::is_nan));
    Ok(())
}

#[test]
fn test_expand_elementwise() -> Result<()> {
    let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 0.5]])?;
    assert_eq!(
        expand(&m, 2.0, Expansion::Elementwise),
        Matrix::from_rows(&[vec![1.0, 4.0], vec![9.0, 0.25]])?
    );
    assert_eq!(
        expand(&m, 3.0, Expansion::Elementwise),
        Matrix::from_rows(&[vec![1.0, 8.0], vec![27.0, 0.125]])?
    );
    Ok(())
}

#[test]
fn test_expand_matrix_power() -> Result<()> {
    let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]])?;
    assert_eq!(expand(&m, 1.0, Expansion::MatrixPower), m);
    assert_eq!(
        expand(&m, 2.0, Expansion::MatrixPower),
        Matrix::from_rows(&[vec![7.0, 10.0], vec![15.0, 22.0]])?
    );
    assert_eq!(
        expand(&m, 3.0, Expansion::MatrixPower),
        Matrix::from_rows(&[vec![37.0, 54.0], vec![81.0, 118.0]])?
    );
    Ok(())
}

#[test]
#[should_panic]
fn test_expand_matrix_power_fractional() {
    expand(&Matrix::identity(2), 1.5, Expansion::MatrixPower);
}

#[test]
fn test_multiply_identity() {
    let m = random::uniform(7, 1, 10, 9);
    assert_eq!(multiply(&m, &Matrix::identity(7)), m);
    assert_eq!(multiply(&Matrix::identity(7), &m), m);
}

#[test]
fn test_inflate_column_sums() -> Result<()> {
    let tolerance = Tolerance::default();
    for seed in 0..10 {
        let m = random::uniform(16, 1, 10, seed);
        let n = normalize_columns(&m, ZeroColumns::Reject)?;
        for &inflation in &[1.5, 2.0, 3.0] {
            let i = inflate(&n, inflation, ZeroColumns::Reject)?;
            for s in i.column_sums() {
                assert!((s - 1.0).abs() <= tolerance.atol());
            }
            assert!(i.as_slice().iter().all(|&x| x >= 0.0));
        }
    }
    Ok(())
}

#[test]
fn test_inflate_exponent() -> Result<()> {
    let m = Matrix::from_rows(&[vec![1.0, 1.0], vec![2.0, 3.0]])?;
    // Squares: [1, 1; 4, 9] -> columns sum to 5 and 10
    assert_eq!(
        inflate(&m, 2.0, ZeroColumns::Reject)?,
        Matrix::from_rows(&[vec![0.2, 0.1], vec![0.8, 0.9]])?
    );
    // With exponent one inflation is a plain normalization
    assert_eq!(
        inflate(&m, 1.0, ZeroColumns::Reject)?,
        normalize_columns(&m, ZeroColumns::Reject)?
    );
    Ok(())
}

#[test]
fn test_iterate() -> Result<()> {
    let m = normalize_columns(&random::symmetric(10, 1, 10, 5), ZeroColumns::Reject)?;
    let params = Params::default();
    let step = iterate(&m, &params)?;
    let manual = inflate(&expand(&m, 2.0, Expansion::Elementwise), 2.0, ZeroColumns::Reject)?;
    assert_eq!(step, manual);
    assert!(step.is_column_stochastic(1E-12));
    Ok(())
}
