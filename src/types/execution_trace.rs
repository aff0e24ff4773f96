//! Execution trace: the sole externally consumed artifact of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ExecutionAgentRecord, WorldState};

/// Ordered record of one run: opened at run start, appended to throughout,
/// closed when the run terminates (successfully, aborted or exhausted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
  pub run_id: Uuid,
  pub started_at: DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
  pub records: Vec<ExecutionAgentRecord>,
  /// World state when the trace was closed.
  pub final_state: WorldState,
}

impl ExecutionTrace {
  pub fn open(run_id: Uuid) -> Self {
    Self {
      run_id,
      started_at: Utc::now(),
      finished_at: None,
      records: vec![],
      final_state: WorldState::new(),
    }
  }

  pub fn push(&mut self, record: ExecutionAgentRecord) {
    self.records.push(record);
  }

  pub fn close(&mut self, final_state: WorldState) {
    self.final_state = final_state;
    self.finished_at = Some(Utc::now());
  }

  pub fn is_closed(&self) -> bool {
    self.finished_at.is_some()
  }
}
