//! End-to-end runs of the built-in dermatology pipeline: planning, gate
//! validation, recovery and trace persistence together, so the public API
//! can be refactored safely.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use planweave::types::{AttrValue, CONFIDENCE_SCORE, IS_LOW_CONFIDENCE, StatePatch};
use planweave::{
  AgentStatus, Engine, EngineConfig, EngineError, ExecutionContext, Executor, ExecutorFailure,
  ExecutorOutput, ExecutorRegistry, RecoveryState, StrategyTable, WorldState, builtin_catalog,
  builtin_handoff, trace_io,
};

/// Succeeds immediately and tags the record with its action id.
struct StageExecutor {
  id: &'static str,
}

#[async_trait]
impl Executor for StageExecutor {
  async fn run(&self, _ctx: &ExecutionContext) -> Result<ExecutorOutput, ExecutorFailure> {
    let mut output = ExecutorOutput::empty();
    output
      .metadata
      .insert("stage".to_string(), serde_json::json!(self.id));
    Ok(output)
  }
}

/// Fails every call, counting invocations.
struct FlakyExecutor {
  calls: AtomicUsize,
}

#[async_trait]
impl Executor for FlakyExecutor {
  async fn run(&self, _ctx: &ExecutionContext) -> Result<ExecutorOutput, ExecutorFailure> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Err(ExecutorFailure::new("vector store unavailable"))
  }
}

fn init_tracing() {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn full_registry() -> ExecutorRegistry {
  let mut registry = ExecutorRegistry::new();
  for id in [
    "classify_image",
    "normalize_color",
    "calibrate_standard",
    "calibrate_safety",
    "extract_embedding",
    "encrypt_embedding",
    "search_literature",
  ] {
    registry.register(id, Arc::new(StageExecutor { id }));
  }
  registry
}

fn goal(keys: &[&str]) -> StatePatch {
  keys
    .iter()
    .map(|k| (k.to_string(), AttrValue::Bool(true)))
    .collect()
}

fn engine_with(registry: ExecutorRegistry, state: Arc<RecoveryState>) -> Engine {
  Engine::new(
    builtin_catalog(),
    registry,
    builtin_handoff(&builtin_catalog()),
    StrategyTable::new(),
    state,
    EngineConfig::default(),
  )
  .unwrap()
}

#[tokio::test]
async fn full_pipeline_standard_branch() {
  init_tracing();
  let engine = engine_with(full_registry(), Arc::new(RecoveryState::new()));
  let start = WorldState::new()
    .with(CONFIDENCE_SCORE, 0.91)
    .with(IS_LOW_CONFIDENCE, false);

  let trace = engine
    .execute(&start, &goal(&["literature_searched"]), HashMap::new())
    .await
    .unwrap();

  assert!(trace.is_closed());
  assert!(trace.records.iter().all(|r| r.status == AgentStatus::Completed));
  let ids: Vec<&str> = trace.records.iter().map(|r| r.action_id.as_str()).collect();
  assert!(ids.contains(&"calibrate_standard"));
  assert!(!ids.contains(&"calibrate_safety"));
  assert_eq!(trace.final_state.bool_attr("literature_searched"), Some(true));
}

#[tokio::test]
async fn low_confidence_start_is_corrected_and_takes_safety_branch() {
  init_tracing();
  let engine = engine_with(full_registry(), Arc::new(RecoveryState::new()));
  // the flag disagrees with the score; the engine corrects it before planning
  let start = WorldState::new()
    .with(CONFIDENCE_SCORE, 0.42)
    .with(IS_LOW_CONFIDENCE, false);

  let trace = engine
    .execute(&start, &goal(&["skin_tone_estimated"]), HashMap::new())
    .await
    .unwrap();

  let ids: Vec<&str> = trace.records.iter().map(|r| r.action_id.as_str()).collect();
  assert!(ids.contains(&"calibrate_safety"));
  assert!(!ids.contains(&"calibrate_standard"));
  assert_eq!(trace.final_state.bool_attr(IS_LOW_CONFIDENCE), Some(true));
}

#[tokio::test]
async fn unreachable_goal_fails_with_plan_not_found() {
  let engine = engine_with(full_registry(), Arc::new(RecoveryState::new()));
  let err = engine
    .execute(&WorldState::new(), &goal(&["teleported"]), HashMap::new())
    .await
    .unwrap_err();
  assert!(matches!(err, EngineError::PlanNotFound(_)));
}

#[tokio::test]
async fn breaker_history_persists_across_runs() {
  init_tracing();
  let flaky = Arc::new(FlakyExecutor {
    calls: AtomicUsize::new(0),
  });
  let mut registry = full_registry();
  registry.register("search_literature", flaky.clone());

  let shared = Arc::new(RecoveryState::new());
  let engine = engine_with(registry, shared.clone());
  let start = WorldState::new()
    .with(CONFIDENCE_SCORE, 0.91)
    .with(IS_LOW_CONFIDENCE, false);

  // first run: default strategy retries search_literature 4 times, which
  // trips the breaker (max_failures = 3); the step ends up skipped
  let trace = engine
    .execute(&start, &goal(&["literature_searched"]), HashMap::new())
    .await
    .unwrap();
  let search = trace
    .records
    .iter()
    .find(|r| r.action_id == "search_literature")
    .unwrap();
  assert_eq!(search.status, AgentStatus::Skipped);
  let after_first = flaky.calls.load(Ordering::SeqCst);
  assert_eq!(after_first, 3); // fourth attempt was rejected by the breaker

  // second run via the same RecoveryState: the breaker is still open, so the
  // executor is never invoked again
  let trace = engine
    .execute(&start, &goal(&["literature_searched"]), HashMap::new())
    .await
    .unwrap();
  let search = trace
    .records
    .iter()
    .find(|r| r.action_id == "search_literature")
    .unwrap();
  assert_eq!(search.status, AgentStatus::Skipped);
  assert!(search.error.as_ref().unwrap().contains("circuit open"));
  assert_eq!(flaky.calls.load(Ordering::SeqCst), after_first);
}

#[tokio::test]
async fn trace_is_persistable_and_reloadable() {
  let engine = engine_with(full_registry(), Arc::new(RecoveryState::new()));
  let start = WorldState::new()
    .with(CONFIDENCE_SCORE, 0.91)
    .with(IS_LOW_CONFIDENCE, false);
  let trace = engine
    .execute(&start, &goal(&["embedding_encrypted"]), HashMap::new())
    .await
    .unwrap();

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(trace_io::TRACE_FILENAME);
  trace_io::save_trace(&path, &trace).unwrap();
  let loaded = trace_io::load_trace(&path).unwrap();
  assert_eq!(loaded.run_id, trace.run_id);
  assert_eq!(loaded.records.len(), trace.records.len());
}
