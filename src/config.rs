//! `AnalysisOptions`/`HarnessOptions` — spec §6 Configuration flags, given a
//! concrete shape so the CLI (§6 "ambient stack") has something to fill in.

use serde::{Deserialize, Serialize};

/// Flags governing the analysis itself, independent of any one function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
  /// spec's `writeConstraints`: also emit the intermediate constraints
  /// stream (unused by the core analyses, kept for parity with the
  /// original tool's flag surface).
  pub write_constraints: bool,
  /// spec's `generateCSV`: include timing and CSV emission in the harness.
  pub generate_csv: bool,
  /// Loop fix-point iteration cap (§4.3/§9), minimum 1, default 8.
  pub loop_iteration_cap: usize,
  /// Whether floating-point literals are truncated to their integer part
  /// (§9 Open Question; preserved, but made explicit).
  pub truncate_floats: bool,
}

impl Default for AnalysisOptions {
  fn default() -> Self {
    AnalysisOptions {
      write_constraints: false,
      generate_csv: false,
      loop_iteration_cap: 8,
      truncate_floats: true,
    }
  }
}

/// Constants baked into the emitted harness (§4.6 macros).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HarnessOptions {
  pub max_array_size: u32,
  pub min_array_size: u32,
  pub nb_tests: u32,
  pub nb_calls: u32,
}

impl Default for HarnessOptions {
  fn default() -> Self {
    HarnessOptions { max_array_size: 100, min_array_size: 1, nb_tests: 1000, nb_calls: 10 }
  }
}
