//! Recovery coordinator: per-action circuit breakers, retries and fallbacks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::error::EngineError;
use crate::executor::{ExecutionContext, Executor};
use crate::types::{Action, BreakerState, CircuitMode, ExecutorOutput};

/// Static recovery policy for one action id.
#[derive(Debug, Clone)]
pub struct RecoveryStrategy {
  /// Exhausted retries on a critical action abort the whole run.
  pub critical: bool,
  pub retry: bool,
  pub max_retries: u32,
  pub retry_delay: Duration,
  /// Alternate executor invoked once when all retries fail. Ignored when
  /// `retry` is false: a no-retry action gets exactly one attempt.
  pub fallback_action_id: Option<String>,
}

impl Default for RecoveryStrategy {
  /// The conservative default applied to any action id not explicitly
  /// listed: non-critical, three retries, no fallback.
  fn default() -> Self {
    Self {
      critical: false,
      retry: true,
      max_retries: 3,
      retry_delay: Duration::from_millis(200),
      fallback_action_id: None,
    }
  }
}

/// Static map from action id to strategy, with the default for unlisted ids.
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
  entries: HashMap<String, RecoveryStrategy>,
  default: RecoveryStrategy,
}

impl StrategyTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, action_id: impl Into<String>, strategy: RecoveryStrategy) {
    self.entries.insert(action_id.into(), strategy);
  }

  pub fn strategy_for(&self, action_id: &str) -> &RecoveryStrategy {
    self.entries.get(action_id).unwrap_or(&self.default)
  }
}

/// Circuit-breaker thresholds shared by every action id.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
  /// Consecutive failures that open the breaker.
  pub max_failures: u32,
  /// Time the breaker stays open before admitting a half-open trial.
  pub reset_timeout: Duration,
  /// Consecutive half-open successes that close the breaker.
  pub success_threshold: u32,
}

impl Default for BreakerConfig {
  fn default() -> Self {
    Self {
      max_failures: 3,
      reset_timeout: Duration::from_secs(30),
      success_threshold: 2,
    }
  }
}

/// Process-wide breaker map, keyed by action id and created lazily. Owned by
/// the host and injected into the engine so flakiness of a downstream
/// dependency is remembered across runs. The mutex guards multi-run hosts;
/// it is never held across an await point.
#[derive(Default)]
pub struct RecoveryState {
  breakers: Mutex<HashMap<String, BreakerState>>,
}

impl RecoveryState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current mode for an action id, if its breaker exists yet.
  pub fn mode(&self, action_id: &str) -> Option<CircuitMode> {
    self
      .breakers
      .lock()
      .ok()?
      .get(action_id)
      .map(|b| b.mode)
  }

  /// Admission check before invoking an executor. Open breakers reject
  /// immediately until `reset_timeout` has elapsed since the last failure,
  /// then move to half-open and admit one trial call.
  fn admit(&self, action_id: &str, config: &BreakerConfig) -> Result<(), EngineError> {
    let Ok(mut breakers) = self.breakers.lock() else {
      return Ok(()); // poisoned lock: fail open rather than wedge the run
    };
    let breaker = breakers.entry(action_id.to_string()).or_default();
    match breaker.mode {
      CircuitMode::Closed | CircuitMode::HalfOpen => Ok(()),
      CircuitMode::Open => {
        let elapsed = breaker.last_failure.map(|t| t.elapsed());
        if elapsed.is_some_and(|e| e >= config.reset_timeout) {
          breaker.mode = CircuitMode::HalfOpen;
          breaker.half_open_successes = 0;
          info!(action_id, "circuit breaker half-open");
          Ok(())
        } else {
          Err(EngineError::CircuitOpen(action_id.to_string()))
        }
      }
    }
  }

  fn record_success(&self, action_id: &str, config: &BreakerConfig) {
    let Ok(mut breakers) = self.breakers.lock() else {
      return;
    };
    let breaker = breakers.entry(action_id.to_string()).or_default();
    match breaker.mode {
      CircuitMode::Closed => breaker.consecutive_failures = 0,
      CircuitMode::HalfOpen => {
        breaker.half_open_successes += 1;
        if breaker.half_open_successes >= config.success_threshold {
          breaker.mode = CircuitMode::Closed;
          breaker.consecutive_failures = 0;
          breaker.half_open_successes = 0;
          info!(action_id, "circuit breaker closed");
        }
      }
      CircuitMode::Open => {}
    }
  }

  fn record_failure(&self, action_id: &str, config: &BreakerConfig) {
    let Ok(mut breakers) = self.breakers.lock() else {
      return;
    };
    let breaker = breakers.entry(action_id.to_string()).or_default();
    breaker.last_failure = Some(tokio::time::Instant::now());
    match breaker.mode {
      CircuitMode::Closed => {
        breaker.consecutive_failures += 1;
        if breaker.consecutive_failures >= config.max_failures {
          breaker.mode = CircuitMode::Open;
          warn!(
            action_id,
            failures = breaker.consecutive_failures,
            "circuit breaker opened"
          );
        }
      }
      CircuitMode::HalfOpen => {
        // failed trial call re-opens immediately
        breaker.mode = CircuitMode::Open;
        breaker.half_open_successes = 0;
        warn!(action_id, "circuit breaker re-opened from half-open");
      }
      CircuitMode::Open => {}
    }
  }
}

/// Wraps executor calls in breaker admission, a deadline, the action's retry
/// policy and an optional fallback, escalating to [EngineError::CriticalAbort]
/// where the strategy demands it.
pub struct RecoveryCoordinator {
  strategies: StrategyTable,
  state: Arc<RecoveryState>,
  breaker: BreakerConfig,
}

impl RecoveryCoordinator {
  pub fn new(strategies: StrategyTable, state: Arc<RecoveryState>, breaker: BreakerConfig) -> Self {
    Self {
      strategies,
      state,
      breaker,
    }
  }

  pub fn strategy_for(&self, action_id: &str) -> &RecoveryStrategy {
    self.strategies.strategy_for(action_id)
  }

  /// One breaker-guarded, deadline-raced executor invocation.
  ///
  /// The executor future is dropped at the deadline, so its work is abandoned
  /// at the next await point; a call that blocks without awaiting only loses
  /// its waiter (see DESIGN notes on cancellation).
  async fn attempt(
    &self,
    action_id: &str,
    executor: &Arc<dyn Executor>,
    ctx: &ExecutionContext,
    deadline: Duration,
  ) -> Result<ExecutorOutput, EngineError> {
    self.state.admit(action_id, &self.breaker)?;
    match tokio::time::timeout(deadline, executor.run(ctx)).await {
      Ok(Ok(output)) => {
        self.state.record_success(action_id, &self.breaker);
        Ok(output)
      }
      Ok(Err(failure)) => {
        self.state.record_failure(action_id, &self.breaker);
        if failure.critical {
          Err(EngineError::CriticalAbort {
            action_id: action_id.to_string(),
            message: failure.message,
          })
        } else {
          Err(EngineError::Executor {
            action_id: action_id.to_string(),
            message: failure.message,
          })
        }
      }
      Err(_) => {
        self.state.record_failure(action_id, &self.breaker);
        Err(EngineError::ExecutorTimeout {
          action_id: action_id.to_string(),
          timeout_ms: deadline.as_millis() as u64,
        })
      }
    }
  }

  /// Runs `executor` for `action` under the action's recovery strategy:
  /// retry loop, then fallback executor (if configured and retries are
  /// enabled), then critical escalation or a recoverable error for the
  /// engine to record as skipped. A `retry: false` strategy gets exactly one
  /// attempt through the breaker and no fallback.
  #[instrument(level = "trace", skip(self, action, executor, fallback, ctx), fields(action_id = %action.id))]
  pub async fn execute_with_recovery(
    &self,
    action: &Action,
    executor: Arc<dyn Executor>,
    fallback: Option<(String, Arc<dyn Executor>)>,
    ctx: &ExecutionContext,
    deadline: Duration,
  ) -> Result<ExecutorOutput, EngineError> {
    let strategy = self.strategies.strategy_for(&action.id);
    let attempts = if strategy.retry {
      strategy.max_retries + 1
    } else {
      1
    };

    let mut last_err = None;
    for attempt in 1..=attempts {
      match self.attempt(&action.id, &executor, ctx, deadline).await {
        Ok(output) => return Ok(output),
        Err(err @ EngineError::CriticalAbort { .. }) => return Err(err),
        Err(err) => {
          warn!(attempt, attempts, error = %err, "action attempt failed");
          last_err = Some(err);
          if attempt < attempts {
            tokio::time::sleep(strategy.retry_delay).await;
          }
        }
      }
    }

    if strategy.retry
      && let Some((fallback_id, fallback_executor)) = fallback
    {
      info!(fallback_id = %fallback_id, "retries exhausted, invoking fallback");
      match self.attempt(&fallback_id, &fallback_executor, ctx, deadline).await {
        Ok(output) => return Ok(output),
        Err(err @ EngineError::CriticalAbort { .. }) => return Err(err),
        Err(err) => {
          warn!(fallback_id = %fallback_id, error = %err, "fallback failed");
          last_err = Some(err);
        }
      }
    }

    let err = last_err.unwrap_or_else(|| EngineError::Executor {
      action_id: action.id.clone(),
      message: "no attempt was made".to_string(),
    });
    if strategy.critical {
      Err(EngineError::CriticalAbort {
        action_id: action.id.clone(),
        message: err.to_string(),
      })
    } else {
      Err(err)
    }
  }
}
