//! CLI argument parsing.
//!
//! Hand-rolled so parsing can be exercised from tests with any iterator of
//! strings.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Default number of `verify` runs.
pub const DEFAULT_VERIFY_RUNS: usize = 3;

/// CLI arguments container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// The command to execute.
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Estimate the beam efficiency
    Simulate {
        /// Optional suite YAML file; its estimator section is used.
        config_path: Option<PathBuf>,
        /// Sample count override.
        samples: Option<usize>,
        /// Probe the accelerated backend first.
        gpu: bool,
        /// Optional RNG seed.
        seed: Option<u64>,
    },
    /// Report accelerated-backend availability
    Probe,
    /// Run the experiment suite
    RunAll {
        /// Optional suite YAML file.
        config_path: Option<PathBuf>,
        /// Optional SVG output path.
        plot_path: Option<PathBuf>,
        /// Optional JSON report path.
        report_path: Option<PathBuf>,
        /// Optional seed override.
        seed_override: Option<u64>,
        /// Enable verbose output.
        verbose: bool,
    },
    /// Check latent sampling is reproducible
    Verify {
        /// Number of runs to compare.
        runs: usize,
    },
    /// Show help
    Help,
    /// Show version
    Version,
    /// Arguments that could not be parsed
    Invalid {
        /// What was wrong with them.
        message: String,
    },
}

impl Args {
    /// Parse command-line arguments from an iterator.
    ///
    /// The first item is the program name.
    #[must_use]
    pub fn parse_from<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::parse_from_vec(&args)
    }

    /// Parse command-line arguments from the environment.
    #[must_use]
    pub fn parse() -> Self {
        Self::parse_from(std::env::args())
    }

    /// Verbose flag, if the command has one.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        matches!(self.command, Command::RunAll { verbose: true, .. })
    }

    fn parse_from_vec(args: &[String]) -> Self {
        if args.len() < 2 {
            return Self {
                command: Command::Help,
            };
        }

        let parsed = match args[1].as_str() {
            "simulate" => Self::parse_simulate_command(&args[2..]),
            "probe" => Ok(Command::Probe),
            "run-all" => Self::parse_run_all_command(&args[2..]),
            "verify" => Self::parse_verify_command(&args[2..]),
            "-h" | "--help" | "help" => Ok(Command::Help),
            "-V" | "--version" | "version" => Ok(Command::Version),
            unknown => {
                eprintln!("Unknown command: {unknown}");
                Ok(Command::Help)
            }
        };

        let command = parsed.unwrap_or_else(|message| Command::Invalid { message });
        Self { command }
    }

    /// Parse the 'simulate' command options.
    fn parse_simulate_command(opts: &[String]) -> Result<Command, String> {
        let mut config_path = None;
        let mut samples = None;
        let mut gpu = false;
        let mut seed = None;

        let mut i = 0;
        while i < opts.len() {
            match opts[i].as_str() {
                "--config" | "-c" => {
                    config_path = Some(PathBuf::from(option_value(opts, i)?));
                    i += 2;
                }
                "--samples" | "-n" => {
                    samples = Some(parse_option(opts, i)?);
                    i += 2;
                }
                "--gpu" => {
                    gpu = true;
                    i += 1;
                }
                "--seed" => {
                    seed = Some(parse_option(opts, i)?);
                    i += 2;
                }
                _ => i += 1,
            }
        }

        Ok(Command::Simulate {
            config_path,
            samples,
            gpu,
            seed,
        })
    }

    /// Parse the 'run-all' command options.
    fn parse_run_all_command(opts: &[String]) -> Result<Command, String> {
        let mut config_path = None;
        let mut plot_path = None;
        let mut report_path = None;
        let mut seed_override = None;
        let mut verbose = false;

        let mut i = 0;
        while i < opts.len() {
            match opts[i].as_str() {
                "--config" | "-c" => {
                    config_path = Some(PathBuf::from(option_value(opts, i)?));
                    i += 2;
                }
                "--plot" => {
                    plot_path = Some(PathBuf::from(option_value(opts, i)?));
                    i += 2;
                }
                "--report" => {
                    report_path = Some(PathBuf::from(option_value(opts, i)?));
                    i += 2;
                }
                "--seed" => {
                    seed_override = Some(parse_option(opts, i)?);
                    i += 2;
                }
                "-v" | "--verbose" => {
                    verbose = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }

        Ok(Command::RunAll {
            config_path,
            plot_path,
            report_path,
            seed_override,
            verbose,
        })
    }

    /// Parse the 'verify' command options.
    fn parse_verify_command(opts: &[String]) -> Result<Command, String> {
        let mut runs = DEFAULT_VERIFY_RUNS;
        if opts.first().map(String::as_str) == Some("--runs") {
            runs = parse_option(opts, 0)?;
        }
        Ok(Command::Verify { runs })
    }
}

/// The value following the flag at `opts[i]`.
fn option_value(opts: &[String], i: usize) -> Result<&str, String> {
    opts.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", opts[i]))
}

/// The value following the flag at `opts[i]`, parsed.
fn parse_option<T>(opts: &[String], i: usize) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = option_value(opts, i)?;
    raw.parse()
        .map_err(|e| format!("invalid value '{raw}' for {}: {e}", opts[i]))
}
