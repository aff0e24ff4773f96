//! Tests for `execution_trace`.

use uuid::Uuid;

use crate::types::{ExecutionAgentRecord, ExecutionTrace, WorldState};

#[test]
fn trace_opens_empty_and_closes_with_final_state() {
  let mut trace = ExecutionTrace::open(Uuid::new_v4());
  assert!(!trace.is_closed());
  assert!(trace.records.is_empty());

  let mut record = ExecutionAgentRecord::begin("classify_image");
  record.complete(Default::default());
  trace.push(record);

  trace.close(WorldState::new().with("image_classified", true));
  assert!(trace.is_closed());
  assert_eq!(trace.records.len(), 1);
  assert_eq!(trace.final_state.bool_attr("image_classified"), Some(true));
}

#[test]
fn trace_serializes_to_json() {
  let run_id = Uuid::new_v4();
  let mut trace = ExecutionTrace::open(run_id);
  let mut record = ExecutionAgentRecord::begin("a1");
  record.fail("boom");
  trace.push(record);
  trace.close(WorldState::new().with("a", true));

  let json = serde_json::to_value(&trace).unwrap();
  assert_eq!(json["run_id"], serde_json::json!(run_id));
  assert_eq!(json["records"][0]["status"], "failed");
  assert!(json["finished_at"].is_string());
}
