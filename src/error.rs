//! Error taxonomy for planning and execution.

use thiserror::Error;

/// Everything that can go wrong while planning or driving a run.
///
/// Fatal variants unwind the whole run; the rest are caught per action and
/// the step is marked skipped (see [EngineError::is_fatal]).
#[derive(Debug, Clone, Error)]
pub enum EngineError {
  /// Goal unreachable or search budget exhausted.
  #[error("no plan found: {0}")]
  PlanNotFound(String),

  /// A quality gate rejected a transition. Always fatal: planner output and
  /// runtime state disagree on an invariant.
  #[error("handoff violation before '{action_id}': {reason}")]
  HandoffViolation { action_id: String, reason: String },

  /// The catalog references an action with no registered executor.
  #[error("no executor registered for action '{0}'")]
  ExecutorMissing(String),

  /// The per-action deadline elapsed before the executor resolved.
  #[error("action '{action_id}' timed out after {timeout_ms}ms")]
  ExecutorTimeout { action_id: String, timeout_ms: u64 },

  /// The underlying executor failed.
  #[error("executor for action '{action_id}' failed: {message}")]
  Executor { action_id: String, message: String },

  /// The breaker rejected the call without attempting execution.
  #[error("circuit open for action '{0}'")]
  CircuitOpen(String),

  /// A critical action exhausted its retries, or an executor error was
  /// explicitly tagged critical.
  #[error("critical action '{action_id}' aborted the run: {message}")]
  CriticalAbort { action_id: String, message: String },
}

impl EngineError {
  /// True when the error must unwind the run instead of skipping the step.
  pub fn is_fatal(&self) -> bool {
    matches!(
      self,
      EngineError::PlanNotFound(_)
        | EngineError::HandoffViolation { .. }
        | EngineError::ExecutorMissing(_)
        | EngineError::CriticalAbort { .. }
    )
  }
}
