//! Per-attempt execution record appended to the run trace.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of one action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
  Running,
  Completed,
  Failed,
  Skipped,
}

impl fmt::Display for AgentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AgentStatus::Running => write!(f, "running"),
      AgentStatus::Completed => write!(f, "completed"),
      AgentStatus::Failed => write!(f, "failed"),
      AgentStatus::Skipped => write!(f, "skipped"),
    }
  }
}

/// One action attempt: created when the action begins, finalized when it
/// ends, never deleted from the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionAgentRecord {
  pub id: Uuid,
  pub action_id: String,
  pub started_at: DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
  pub status: AgentStatus,
  pub error: Option<String>,
  /// Opaque metadata returned by the executor on success.
  #[serde(default)]
  pub metadata: HashMap<String, serde_json::Value>,
}

impl ExecutionAgentRecord {
  /// Opens a record in `running` state for the given action.
  pub fn begin(action_id: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      action_id: action_id.into(),
      started_at: Utc::now(),
      finished_at: None,
      status: AgentStatus::Running,
      error: None,
      metadata: HashMap::new(),
    }
  }

  pub fn complete(&mut self, metadata: HashMap<String, serde_json::Value>) {
    self.status = AgentStatus::Completed;
    self.metadata = metadata;
    self.finished_at = Some(Utc::now());
  }

  pub fn fail(&mut self, error: impl Into<String>) {
    self.status = AgentStatus::Failed;
    self.error = Some(error.into());
    self.finished_at = Some(Utc::now());
  }

  pub fn skip(&mut self, error: impl Into<String>) {
    self.status = AgentStatus::Skipped;
    self.error = Some(error.into());
    self.finished_at = Some(Utc::now());
  }
}
