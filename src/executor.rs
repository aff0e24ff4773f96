//! Executor contract and the string-keyed dispatch registry.
//!
//! Everything that feeds the pipeline (classification, skin-tone estimation,
//! embedding extraction, encryption, literature search) is an opaque executor
//! behind this seam: a unit of work invoked by action id that may fail or be
//! slow.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::ActionCatalog;
use crate::error::EngineError;
use crate::types::{ExecutorOutput, WorldState};

/// Failure reported by an executor. `critical: true` escalates straight to a
/// run abort regardless of the action's retry policy.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExecutorFailure {
  pub message: String,
  pub critical: bool,
}

impl ExecutorFailure {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      critical: false,
    }
  }

  pub fn critical(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      critical: true,
    }
  }
}

/// Opaque context handed to each executor invocation.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
  pub run_id: Uuid,
  /// Snapshot of the world state at the time of invocation.
  pub state: WorldState,
  /// Caller-supplied payload (image handle, patient context, ...).
  pub payload: HashMap<String, serde_json::Value>,
}

/// Unit of work bound to an action id. Implementations should respect the
/// caller-imposed deadline; the engine drops the future at the deadline, so
/// work is abandoned at the next await point.
#[async_trait]
pub trait Executor: Send + Sync {
  async fn run(&self, ctx: &ExecutionContext) -> Result<ExecutorOutput, ExecutorFailure>;
}

/// Validated lookup table from action id to executor, built once at startup.
#[derive(Default)]
pub struct ExecutorRegistry {
  executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, action_id: impl Into<String>, executor: Arc<dyn Executor>) {
    self.executors.insert(action_id.into(), executor);
  }

  pub fn get(&self, action_id: &str) -> Option<Arc<dyn Executor>> {
    self.executors.get(action_id).cloned()
  }

  /// Startup check: every catalog action id must have a registered executor.
  /// Fail fast here rather than per-call mid-run.
  pub fn validate_against(&self, catalog: &ActionCatalog) -> Result<(), EngineError> {
    for action in catalog.actions() {
      if !self.executors.contains_key(&action.id) {
        return Err(EngineError::ExecutorMissing(action.id.clone()));
      }
    }
    Ok(())
  }
}
