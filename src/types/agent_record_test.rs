//! Tests for `agent_record`.

use std::collections::HashMap;

use crate::types::{AgentStatus, ExecutionAgentRecord};

#[test]
fn begin_opens_running_record() {
  let record = ExecutionAgentRecord::begin("classify_image");
  assert_eq!(record.action_id, "classify_image");
  assert_eq!(record.status, AgentStatus::Running);
  assert!(record.finished_at.is_none());
  assert!(record.error.is_none());
}

#[test]
fn complete_sets_status_and_metadata() {
  let mut record = ExecutionAgentRecord::begin("classify_image");
  let mut meta = HashMap::new();
  meta.insert("label".to_string(), serde_json::json!("dermoscopic"));
  record.complete(meta);
  assert_eq!(record.status, AgentStatus::Completed);
  assert!(record.finished_at.is_some());
  assert_eq!(record.metadata["label"], "dermoscopic");
}

#[test]
fn fail_and_skip_record_the_error() {
  let mut failed = ExecutionAgentRecord::begin("a");
  failed.fail("deadline exceeded");
  assert_eq!(failed.status, AgentStatus::Failed);
  assert_eq!(failed.error.as_deref(), Some("deadline exceeded"));

  let mut skipped = ExecutionAgentRecord::begin("b");
  skipped.skip("circuit open");
  assert_eq!(skipped.status, AgentStatus::Skipped);
  assert!(skipped.finished_at.is_some());
}

#[test]
fn status_serializes_snake_case() {
  let mut record = ExecutionAgentRecord::begin("a");
  record.skip("x");
  let json = serde_json::to_value(&record).unwrap();
  assert_eq!(json["status"], "skipped");
  assert_eq!(json["action_id"], "a");
}
