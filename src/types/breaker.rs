//! Circuit-breaker state for one action id.

use std::fmt;

use tokio::time::Instant;

/// Breaker mode. Closed passes calls through, Open rejects them outright,
/// HalfOpen admits one trial call at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitMode {
  Closed,
  Open,
  HalfOpen,
}

impl fmt::Display for CircuitMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CircuitMode::Closed => write!(f, "closed"),
      CircuitMode::Open => write!(f, "open"),
      CircuitMode::HalfOpen => write!(f, "half_open"),
    }
  }
}

/// Per-action breaker bookkeeping. Created lazily on first reference and kept
/// for the process lifetime, so flakiness is remembered across runs.
///
/// Timestamps use [tokio::time::Instant] so paused-clock tests can drive the
/// reset timeout deterministically.
#[derive(Debug, Clone)]
pub struct BreakerState {
  pub mode: CircuitMode,
  pub consecutive_failures: u32,
  /// Successes observed while half-open.
  pub half_open_successes: u32,
  pub last_failure: Option<Instant>,
}

impl Default for BreakerState {
  fn default() -> Self {
    Self {
      mode: CircuitMode::Closed,
      consecutive_failures: 0,
      half_open_successes: 0,
      last_failure: None,
    }
  }
}
