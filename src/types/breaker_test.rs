//! Tests for `breaker`.

use crate::types::{BreakerState, CircuitMode};

#[test]
fn default_breaker_is_closed_with_zero_counters() {
  let state = BreakerState::default();
  assert_eq!(state.mode, CircuitMode::Closed);
  assert_eq!(state.consecutive_failures, 0);
  assert_eq!(state.half_open_successes, 0);
  assert!(state.last_failure.is_none());
}

#[test]
fn mode_display_names() {
  assert_eq!(CircuitMode::Closed.to_string(), "closed");
  assert_eq!(CircuitMode::Open.to_string(), "open");
  assert_eq!(CircuitMode::HalfOpen.to_string(), "half_open");
}
