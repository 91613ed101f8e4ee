//! Severity triage per spec §7: Warning (log, continue), Fatal (skip this
//! function, continue with the next), Assertion (programmer error).

use thiserror::Error;

/// Which propagation phase failed, for [`HarnessError::PropagationFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  TopDown,
  BottomUp,
}

impl std::fmt::Display for Phase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Phase::TopDown => write!(f, "top-down"),
      Phase::BottomUp => write!(f, "bottom-up"),
    }
  }
}

/// A fatal error for one analyzed function: the current function's harness
/// is abandoned, but the driver continues with the next function.
#[derive(Debug, Error)]
pub enum HarnessError {
  #[error("function `{func}` has no argument names available")]
  NoArgumentNames { func: String },

  #[error("{phase} propagation produced an inconsistent range for node `{node}` in `{func}`")]
  PropagationFailed { func: String, phase: Phase, node: String },

  #[error("labeled edge target `{symbol}` is not classified as an array")]
  NonArrayLabeledEdgeTarget { symbol: String },

  #[error("i/o error writing harness output: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse `{path}`: {message}")]
  Parse { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Emit a Warning-severity diagnostic (spec §7): printed, analysis continues.
/// A thin wrapper so call sites read like the severity table in the spec
/// rather than bare `log::warn!` calls scattered through the analyses.
macro_rules! warn_diag {
  ($($arg:tt)*) => { log::warn!($($arg)*) };
}
pub(crate) use warn_diag;
