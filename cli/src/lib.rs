/*
 * SPDX-FileCopyrightText: 2026 The mcl-rs developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

use anyhow::{Context, Result, anyhow, bail, ensure};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mcl::matrix::Matrix;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use std::time::SystemTime;

/// Parses the number of threads from a string.
///
/// This function is meant to be used with `#[arg(...,  value_parser =
/// num_threads_parser)]`.
pub fn num_threads_parser(arg: &str) -> Result<usize> {
    let num_threads = arg.parse::<usize>()?;
    ensure!(num_threads > 0, "Number of threads must be greater than 0");
    Ok(num_threads)
}

/// Shared CLI arguments for commands that specify a number of threads.
#[derive(Args, Debug)]
pub struct NumThreadsArg {
    #[arg(short = 'j', long, default_value_t = rayon::current_num_threads().max(1), value_parser = num_threads_parser)]
    /// The number of threads to use.
    pub num_threads: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
/// Formats for storing and loading dense matrices.
pub enum MatrixFormat {
    /// ASCII format, one row per line, entries separated by whitespace.
    Ascii,
    /// A JSON array of rows, each row being an array of numbers.
    Json,
}

impl MatrixFormat {
    /// Stores a matrix in the specified `path` using the format defined by
    /// `self`.
    ///
    /// `precision` will be used to truncate the entries to the specified
    /// number of decimal digits. If `None`, [zmij](https://crates.io/crates/zmij)
    /// formatting will be used.
    pub fn store(
        &self,
        path: impl AsRef<Path>,
        matrix: &Matrix,
        precision: Option<usize>,
    ) -> Result<()> {
        create_parent_dir(&path)?;
        let path_display = path.as_ref().display();
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Could not create matrix at {}", path_display))?;
        let mut file = BufWriter::new(file);
        let mut buf = zmij::Buffer::new();
        let mut entry = |x: f64| match precision {
            None => buf.format(x).to_owned(),
            Some(precision) => format!("{x:.precision$}"),
        };

        match self {
            MatrixFormat::Ascii => {
                log::info!("Storing in ASCII format at {}", path_display);
                for row in matrix.iter_rows() {
                    let line = row.iter().map(|&x| entry(x)).collect::<Vec<_>>();
                    writeln!(file, "{}", line.join(" "))
                        .with_context(|| format!("Could not write matrix to {}", path_display))?;
                }
            }
            MatrixFormat::Json => {
                log::info!("Storing in JSON format at {}", path_display);
                let rows = matrix
                    .iter_rows()
                    .map(|row| {
                        let row = row.iter().map(|&x| entry(x)).collect::<Vec<_>>();
                        format!("[{}]", row.join(", "))
                    })
                    .collect::<Vec<_>>();
                write!(file, "[{}]", rows.join(", "))
                    .with_context(|| format!("Could not write matrix to {}", path_display))?;
            }
        }

        file.flush()
            .with_context(|| format!("Could not write matrix to {}", path_display))?;
        Ok(())
    }

    /// Loads a matrix from the specified `path` using the format defined by
    /// `self`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Matrix> {
        let path = path.as_ref();
        let path_display = path.display();
        let file =
            std::fs::File::open(path).with_context(|| format!("Could not open {}", path_display))?;
        let reader = BufReader::new(file);

        let rows: Vec<Vec<f64>> = match self {
            MatrixFormat::Ascii => {
                log::info!("Loading ASCII format from {}", path_display);
                reader
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
                    .map(|(i, line)| {
                        let line = line.with_context(|| {
                            format!("Error reading line {} of {}", i + 1, path_display)
                        })?;
                        line.split_whitespace()
                            .map(|token| {
                                token.parse::<f64>().map_err(|e| {
                                    anyhow!(
                                        "Error parsing line {} of {}: {}",
                                        i + 1,
                                        path_display,
                                        e
                                    )
                                })
                            })
                            .collect()
                    })
                    .collect::<Result<_>>()?
            }
            MatrixFormat::Json => {
                log::info!("Loading JSON format from {}", path_display);
                serde_json::from_reader(reader)
                    .with_context(|| format!("Error parsing {}", path_display))?
            }
        };

        Matrix::from_rows(&rows).with_context(|| format!("Ragged matrix in {}", path_display))
    }
}

/// Creates a [`ThreadPool`](rayon::ThreadPool) with the given number of threads.
pub fn get_thread_pool(num_threads: usize) -> rayon::ThreadPool {
    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .expect("Failed to create thread pool");
    log::info!("Using {} threads", thread_pool.current_num_threads());
    thread_pool
}

/// Creates all parent directories of the given file path.
pub fn create_parent_dir(file_path: impl AsRef<Path>) -> Result<()> {
    if let Some(parent_dir) = file_path.as_ref().parent() {
        std::fs::create_dir_all(parent_dir).with_context(|| {
            format!(
                "Failed to create the directory {:?}",
                parent_dir.to_string_lossy()
            )
        })?;
    }
    Ok(())
}

/// Parses a duration from a string.
///
/// If no suffix is given, the value is assumed to be in milliseconds.
/// Available suffixes:
/// - `s` for seconds
/// - `m` for minutes
/// - `h` for hours
/// - `d` for days
///
/// Example: `1d2h3m4s567` is parsed as 1 day, 2 hours, 3 minutes, 4 seconds,
/// and 567 milliseconds.
fn parse_duration(value: &str) -> Result<Duration> {
    if value.is_empty() {
        bail!("Empty duration string, if you want every 0 milliseconds use `0`.");
    }
    let mut duration = Duration::from_secs(0);
    let mut acc = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            acc.push(c);
        } else if c.is_whitespace() {
            continue;
        } else {
            let dur = acc.parse::<u64>()?;
            match c {
                's' => duration += Duration::from_secs(dur),
                'm' => duration += Duration::from_secs(dur * 60),
                'h' => duration += Duration::from_secs(dur * 60 * 60),
                'd' => duration += Duration::from_secs(dur * 60 * 60 * 24),
                _ => return Err(anyhow!("Invalid duration suffix: {}", c)),
            }
            acc.clear();
        }
    }
    if !acc.is_empty() {
        let dur = acc.parse::<u64>()?;
        duration += Duration::from_millis(dur);
    }
    Ok(duration)
}

/// Initializes the `env_logger` logger with a custom format including
/// timestamps with elapsed time since initialization.
pub fn init_env_logger() -> Result<()> {
    use jiff::SpanRound;
    use jiff::fmt::friendly::{Designator, Spacing, SpanPrinter};

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let start = std::time::Instant::now();
    let printer = SpanPrinter::new()
        .spacing(Spacing::None)
        .designator(Designator::Compact);
    let span_round = SpanRound::new()
        .largest(jiff::Unit::Day)
        .smallest(jiff::Unit::Millisecond)
        .days_are_24_hours();

    builder.format(move |buf, record| {
        let Ok(ts) = jiff::Timestamp::try_from(SystemTime::now()) else {
            return Err(std::io::Error::other("Failed to get timestamp"));
        };
        let style = buf.default_level_style(record.level());
        let elapsed = start.elapsed();
        let span = jiff::Span::new()
            .seconds(elapsed.as_secs() as i64)
            .milliseconds(elapsed.subsec_millis() as i64);
        let span = span.round(span_round).map_err(std::io::Error::other)?;
        writeln!(
            buf,
            "{} {} {style}{}{style:#} [{:?}] {} - {}",
            ts.strftime("%F %T%.3f"),
            printer.span_to_string(&span),
            record.level(),
            std::thread::current().id(),
            record.target(),
            record.args()
        )
    });
    builder.init();
    Ok(())
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    #[arg(long, value_parser = parse_duration, global=true, display_order = 1000)]
    /// How often to log progress. Default is 10s. You can use the suffixes "s"
    /// for seconds, "m" for minutes, "h" for hours, and "d" for days. If no
    /// suffix is provided it is assumed to be in milliseconds.
    pub log_interval: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    #[clap(name = "run")]
    Run(run::CliArgs),
    #[clap(name = "gen")]
    Gen(generate::CliArgs),
}

#[derive(Parser, Debug)]
#[command(name = "mcl", version)]
/// Markov Clustering of dense weighted graphs.
///
/// Noteworthy environment variables:
///
/// - RUST_MIN_STACK: minimum thread stack size (in bytes).
///
/// - RUST_LOG: configuration for env_logger
///   <https://docs.rs/env_logger/latest/env_logger/>.
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,
    #[clap(flatten)]
    pub args: GlobalArgs,
}

pub mod generate;
pub mod run;

/// The entry point of the command-line interface.
pub fn cli_main<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let start = std::time::Instant::now();
    let cli = Cli::parse_from(args);
    match cli.command {
        SubCommands::Run(args) => {
            run::main(cli.args, args)?;
        }
        SubCommands::Gen(args) => {
            generate::main(cli.args, args)?;
        }
    }

    log::info!(
        "The command took {}",
        pretty_print_elapsed(start.elapsed().as_secs_f64())
    );

    Ok(())
}

/// Pretty-prints seconds in a human-readable format.
fn pretty_print_elapsed(elapsed: f64) -> String {
    let mut result = String::new();
    let mut elapsed_seconds = elapsed as u64;
    let weeks = elapsed_seconds / (60 * 60 * 24 * 7);
    elapsed_seconds %= 60 * 60 * 24 * 7;
    let days = elapsed_seconds / (60 * 60 * 24);
    elapsed_seconds %= 60 * 60 * 24;
    let hours = elapsed_seconds / (60 * 60);
    elapsed_seconds %= 60 * 60;
    let minutes = elapsed_seconds / 60;

    match weeks {
        0 => {}
        1 => result.push_str("1 week "),
        _ => result.push_str(&format!("{} weeks ", weeks)),
    }
    match days {
        0 => {}
        1 => result.push_str("1 day "),
        _ => result.push_str(&format!("{} days ", days)),
    }
    match hours {
        0 => {}
        1 => result.push_str("1 hour "),
        _ => result.push_str(&format!("{} hours ", hours)),
    }
    match minutes {
        0 => {}
        1 => result.push_str("1 minute "),
        _ => result.push_str(&format!("{} minutes ", minutes)),
    }

    result.push_str(&format!("{:.3} seconds ({}s)", elapsed % 60.0, elapsed));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    mod matrix_format {
        use super::*;

        fn sample() -> Matrix {
            Matrix::from_rows(&[vec![1.5, 2.75, 0.0], vec![0.125, 3.0, 1E-9]]).unwrap()
        }

        #[test]
        fn test_ascii() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("test.txt");
            MatrixFormat::Ascii.store(&path, &sample(), None).unwrap();
            let content = std::fs::read_to_string(&path).unwrap();
            assert_eq!(content.lines().count(), 2);
            for (line, row) in content.lines().zip(sample().iter_rows()) {
                let parsed: Vec<f64> = line
                    .split_whitespace()
                    .map(|t| t.parse().unwrap())
                    .collect();
                assert_eq!(parsed, row);
            }
        }

        #[test]
        fn test_ascii_with_precision() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("test.txt");
            let m = Matrix::from_rows(&[vec![1.123456789, 2.987654321]]).unwrap();
            MatrixFormat::Ascii.store(&path, &m, Some(3)).unwrap();
            let content = std::fs::read_to_string(&path).unwrap();
            assert_eq!(content, "1.123 2.988\n");
        }

        #[test]
        fn test_ascii_blank_lines() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("test.txt");
            std::fs::write(&path, "1 2\n\n  3\t4  \n\n").unwrap();
            let m = MatrixFormat::Ascii.load(&path).unwrap();
            assert_eq!(
                m,
                Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap()
            );
        }

        #[test]
        fn test_ascii_invalid() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("test.txt");
            std::fs::write(&path, "1 2\n3 x\n").unwrap();
            let err = MatrixFormat::Ascii.load(&path).unwrap_err();
            assert!(err.to_string().contains("line 2"));
        }

        #[test]
        fn test_ascii_ragged() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("test.txt");
            std::fs::write(&path, "1 2\n3\n").unwrap();
            assert!(MatrixFormat::Ascii.load(&path).is_err());
        }

        #[test]
        fn test_json() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("test.json");
            MatrixFormat::Json.store(&path, &sample(), None).unwrap();
            let content = std::fs::read_to_string(&path).unwrap();
            let parsed: Vec<Vec<f64>> = serde_json::from_str(&content).unwrap();
            assert_eq!(Matrix::from_rows(&parsed).unwrap(), sample());
        }

        #[test]
        fn test_json_with_precision() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("test.json");
            let m = Matrix::from_rows(&[vec![1.123456789], vec![2.987654321]]).unwrap();
            MatrixFormat::Json.store(&path, &m, Some(2)).unwrap();
            let content = std::fs::read_to_string(&path).unwrap();
            assert_eq!(content, "[[1.12], [2.99]]");
        }

        #[test]
        fn test_json_empty() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("test.json");
            MatrixFormat::Json
                .store(&path, &Matrix::zeros(0, 0), None)
                .unwrap();
            let content = std::fs::read_to_string(&path).unwrap();
            assert_eq!(content, "[]");
            assert!(MatrixFormat::Json.load(&path).unwrap().is_empty());
        }

        #[test]
        fn test_creates_parent_dirs() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("a").join("b").join("test.txt");
            MatrixFormat::Ascii
                .store(&path, &Matrix::identity(2), None)
                .unwrap();
            assert!(path.exists());
        }

        #[test]
        fn test_roundtrip() {
            let dir = tempfile::tempdir().unwrap();
            let m = mcl::random::symmetric(10, 1, 10, 0);
            for (fmt, name) in [(MatrixFormat::Ascii, "m.txt"), (MatrixFormat::Json, "m.json")] {
                let path = dir.path().join(name);
                fmt.store(&path, &m, None).unwrap();
                assert_eq!(fmt.load(&path).unwrap(), m);
            }
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("567").unwrap(), Duration::from_millis(567));
        assert_eq!(
            parse_duration("1d2h3m4s567").unwrap(),
            Duration::from_millis(93_784_567)
        );
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("3x").is_err());
    }

    #[test]
    fn test_num_threads_parser() {
        assert_eq!(num_threads_parser("4").unwrap(), 4);
        assert!(num_threads_parser("0").is_err());
        assert!(num_threads_parser("four").is_err());
    }

    #[test]
    fn test_pretty_print_elapsed() {
        assert_eq!(pretty_print_elapsed(1.5), "1.500 seconds (1.5s)");
        assert_eq!(
            pretty_print_elapsed(3725.0),
            "1 hour 2 minutes 5.000 seconds (3725s)"
        );
    }
}
