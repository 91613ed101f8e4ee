//! Command-line surface (spec §6). Grounded on the pack's own compiler
//! binaries' option layout: a target source file, an optional function
//! name restriction, and flags mirroring [`harnessgen::config`]'s two
//! option structs one-for-one.

use std::path::PathBuf;

use clap::Parser;

use harnessgen::config::{AnalysisOptions, HarnessOptions};

#[derive(Parser, Debug)]
#[command(name = "harnessgen", about = "Synthesize a C fuzzing harness for one function of a translation unit")]
pub struct Cli {
  /// C source file to analyze.
  pub source: PathBuf,

  /// Restrict analysis to this function; otherwise every function defined
  /// in the file is processed.
  #[arg(long)]
  pub function: Option<String>,

  /// Also write `.dot` dependence-graph checkpoints alongside the harness.
  #[arg(long)]
  pub write_constraints: bool,

  /// Append a timing row per function to `harnessgen_timings.csv`.
  #[arg(long)]
  pub csv: bool,

  #[arg(long, default_value_t = HarnessOptions::default().max_array_size)]
  pub max_array_size: u32,

  #[arg(long, default_value_t = HarnessOptions::default().min_array_size)]
  pub min_array_size: u32,

  #[arg(long, default_value_t = HarnessOptions::default().nb_tests)]
  pub nb_tests: u32,

  #[arg(long, default_value_t = HarnessOptions::default().nb_calls)]
  pub nb_calls: u32,

  #[arg(long, default_value_t = AnalysisOptions::default().loop_iteration_cap)]
  pub loop_iteration_cap: usize,

  #[arg(long, overrides_with = "no_float_truncation")]
  pub float_truncation: bool,

  #[arg(long, overrides_with = "float_truncation")]
  pub no_float_truncation: bool,

  /// Increase log verbosity (`-v` info, `-vv` debug).
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,

  /// Suppress everything below warnings.
  #[arg(short, long)]
  pub quiet: bool,

  #[arg(long)]
  pub log_level: Option<String>,
}

impl Cli {
  pub fn analysis_options(&self) -> AnalysisOptions {
    AnalysisOptions {
      write_constraints: self.write_constraints,
      generate_csv: self.csv,
      loop_iteration_cap: self.loop_iteration_cap.max(1),
      truncate_floats: !self.no_float_truncation,
    }
  }

  pub fn harness_options(&self) -> HarnessOptions {
    HarnessOptions {
      max_array_size: self.max_array_size,
      min_array_size: self.min_array_size,
      nb_tests: self.nb_tests,
      nb_calls: self.nb_calls,
    }
  }

  pub fn log_filter(&self) -> log::LevelFilter {
    if let Some(level) = &self.log_level {
      return level.parse().unwrap_or(log::LevelFilter::Info);
    }
    if self.quiet { return log::LevelFilter::Warn; }
    match self.verbose {
      0 => log::LevelFilter::Info,
      1 => log::LevelFilter::Debug,
      _ => log::LevelFilter::Trace,
    }
  }
}
