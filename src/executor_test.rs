//! Tests for `executor`.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::ActionCatalog;
use crate::error::EngineError;
use crate::executor::{ExecutionContext, Executor, ExecutorFailure, ExecutorRegistry};
use crate::types::{Action, ExecutorOutput, WorldState};

struct NoopExecutor;

#[async_trait]
impl Executor for NoopExecutor {
  async fn run(&self, _ctx: &ExecutionContext) -> Result<ExecutorOutput, ExecutorFailure> {
    Ok(ExecutorOutput::empty())
  }
}

#[test]
fn validate_against_flags_first_unregistered_action() {
  let catalog = ActionCatalog::from_actions(vec![
    Action::new("a1", "A1", 1.0),
    Action::new("a2", "A2", 1.0),
  ])
  .unwrap();
  let mut registry = ExecutorRegistry::new();
  registry.register("a1", Arc::new(NoopExecutor));
  let err = registry.validate_against(&catalog).unwrap_err();
  assert!(matches!(err, EngineError::ExecutorMissing(id) if id == "a2"));
}

#[test]
fn validate_against_passes_for_full_coverage() {
  let catalog = ActionCatalog::from_actions(vec![Action::new("a1", "A1", 1.0)]).unwrap();
  let mut registry = ExecutorRegistry::new();
  registry.register("a1", Arc::new(NoopExecutor));
  assert!(registry.validate_against(&catalog).is_ok());
}

#[tokio::test]
async fn registered_executor_is_invocable_by_id() {
  let mut registry = ExecutorRegistry::new();
  registry.register("a1", Arc::new(NoopExecutor));
  let executor = registry.get("a1").unwrap();
  let ctx = ExecutionContext {
    run_id: Uuid::new_v4(),
    state: WorldState::new(),
    payload: Default::default(),
  };
  assert!(executor.run(&ctx).await.is_ok());
  assert!(registry.get("missing").is_none());
}

#[test]
fn failure_constructors_set_criticality() {
  assert!(!ExecutorFailure::new("x").critical);
  assert!(ExecutorFailure::critical("x").critical);
  assert_eq!(ExecutorFailure::new("boom").to_string(), "boom");
}
