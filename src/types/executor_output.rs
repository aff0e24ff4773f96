//! Result contract for executors (see [crate::executor::Executor]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::StatePatch;

/// Successful executor result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorOutput {
  /// Opaque metadata copied onto the agent record.
  #[serde(default)]
  pub metadata: HashMap<String, serde_json::Value>,
  /// Optional state updates, merged before the action's declared effects.
  #[serde(default)]
  pub state_updates: Option<StatePatch>,
  /// True when the executor observed a world change that invalidates the
  /// remainder of the cached plan.
  #[serde(default)]
  pub should_replan: bool,
}

impl ExecutorOutput {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Output carrying state updates.
  pub fn with_updates(updates: StatePatch) -> Self {
    Self {
      state_updates: Some(updates),
      ..Self::default()
    }
  }

  pub fn replan(mut self) -> Self {
    self.should_replan = true;
    self
  }
}
