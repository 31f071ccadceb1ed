/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use mcl::device::{Dim2, LaunchConfig};
use mcl_cli::run::LaunchArgs;
use mcl_cli::{MatrixFormat, cli_main};

#[test]
fn test_gen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.txt");
    cli_main(["mcl", "gen", "-n", "12", "-s", "7", path.to_str().unwrap()])?;
    let m = MatrixFormat::Ascii.load(&path)?;
    assert_eq!(m, mcl::random::symmetric(12, 1, 10, 7));

    assert!(cli_main(["mcl", "gen", "--low", "5", "--high", "5", path.to_str().unwrap()]).is_err());
    Ok(())
}

#[test]
fn test_run_engines_agree() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let graph = dir.path().join("graph.json");
    let seq = dir.path().join("seq.txt");
    let par = dir.path().join("par.txt");
    cli_main([
        "mcl",
        "gen",
        "-n",
        "24",
        "-s",
        "3",
        "--fmt",
        "json",
        graph.to_str().unwrap(),
    ])?;
    cli_main([
        "mcl",
        "run",
        "-i",
        graph.to_str().unwrap(),
        "--input-fmt",
        "json",
        "--engine",
        "seq",
        seq.to_str().unwrap(),
    ])?;
    cli_main([
        "mcl",
        "run",
        "-i",
        graph.to_str().unwrap(),
        "--input-fmt",
        "json",
        "--engine",
        "par",
        "-j",
        "3",
        "--block-x",
        "5",
        "--block-y",
        "3",
        "--block-1d",
        "7",
        par.to_str().unwrap(),
    ])?;
    assert_eq!(std::fs::read_to_string(&seq)?, std::fs::read_to_string(&par)?);

    let m = MatrixFormat::Ascii.load(&seq)?;
    assert_eq!(m.shape(), (24, 24));
    assert!(m.is_column_stochastic(1E-8));
    Ok(())
}

#[test]
fn test_run_generated_with_residual() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("out.json");
    let residual = dir.path().join("residual.json");
    cli_main([
        "mcl",
        "run",
        "-n",
        "8",
        "-s",
        "42",
        "--max-iter",
        "2",
        "--fmt",
        "json",
        "--residual",
        residual.to_str().unwrap(),
        output.to_str().unwrap(),
    ])?;
    assert_eq!(MatrixFormat::Json.load(&output)?.shape(), (8, 8));
    assert_eq!(MatrixFormat::Json.load(&residual)?.shape(), (8, 8));
    Ok(())
}

#[test]
fn test_run_invalid_parameters() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("out.txt");
    let output = output.to_str().unwrap();
    assert!(cli_main(["mcl", "run", "--inflation", "0", output]).is_err());
    assert!(cli_main(["mcl", "run", "--atol=-1", output]).is_err());
    assert!(
        cli_main([
            "mcl",
            "run",
            "--expansion-mode",
            "matrix-power",
            "--expansion",
            "2.5",
            output
        ])
        .is_err()
    );
    assert!(cli_main(["mcl", "run", "--block-x", "0", output]).is_err());
    // An explicit grid too small for the matrix
    assert!(
        cli_main([
            "mcl", "run", "-n", "40", "--grid-x", "1", "--grid-y", "1", output
        ])
        .is_err()
    );
    assert!(!std::path::Path::new(output).exists());
    Ok(())
}

#[test]
fn test_launch_args() -> Result<()> {
    let mut args = LaunchArgs {
        block_x: 4,
        block_y: 2,
        block_1d: 32,
        grid_x: Some(3),
        grid_y: Some(5),
        grid_1d: None,
    };
    assert_eq!(
        args.to_launch_config()?,
        LaunchConfig::default()
            .block_2d((4, 2))
            .block_1d(32)
            .grid_2d(Some(Dim2::new(3, 5)))
    );

    // Half a grid is an error, not a panic
    args.grid_y = None;
    assert!(args.to_launch_config().is_err());
    args.grid_x = None;
    args.grid_y = Some(5);
    assert!(args.to_launch_config().is_err());

    args.grid_y = None;
    assert_eq!(
        args.to_launch_config()?,
        LaunchConfig::default().block_2d((4, 2)).block_1d(32)
    );
    Ok(())
}

#[test]
fn test_run_degenerate_input() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("graph.txt");
    let output = dir.path().join("out.txt");
    std::fs::write(&input, "0 1 0\n1 0 0\n0 0 0\n")?;
    let run = |zero_columns: &str| {
        cli_main([
            "mcl",
            "run",
            "-i",
            input.to_str().unwrap(),
            "--loop-value",
            "0",
            "--max-iter",
            "3",
            "--zero-columns",
            zero_columns,
            output.to_str().unwrap(),
        ])
    };
    assert!(run("reject").is_err());
    run("propagate")?;
    let m = MatrixFormat::Ascii.load(&output)?;
    assert_eq!(
        m.non_finite_positions(),
        vec![(0, 2), (1, 2), (2, 2)]
    );
    Ok(())
}
