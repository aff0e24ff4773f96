//! Execution engine: drives a planned action list through the coordinators.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::ActionCatalog;
use crate::error::EngineError;
use crate::executor::{ExecutionContext, Executor, ExecutorRegistry};
use crate::handoff::HandoffCoordinator;
use crate::planner;
use crate::recovery::{BreakerConfig, RecoveryCoordinator, RecoveryState, StrategyTable};
use crate::types::{ExecutionAgentRecord, ExecutionTrace, StatePatch, WorldState};

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Per-action deadline for the executor call.
  pub action_timeout: Duration,
  pub breaker: BreakerConfig,
  /// Cap on mid-flight replans, so a pathological executor that always
  /// requests one cannot loop the run forever.
  pub max_replans: u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      action_timeout: Duration::from_secs(30),
      breaker: BreakerConfig::default(),
      max_replans: 5,
    }
  }
}

/// One cooperative control loop: plans, validates handoffs, invokes executors
/// through the recovery coordinator, merges effects and replans on request.
/// Actions run strictly sequentially; the world state is owned by this loop
/// for the duration of a run and passed between steps by snapshot.
pub struct Engine {
  catalog: ActionCatalog,
  registry: ExecutorRegistry,
  handoff: HandoffCoordinator,
  recovery: RecoveryCoordinator,
  config: EngineConfig,
}

impl Engine {
  /// Builds an engine, failing fast if any catalog action lacks a registered
  /// executor. `recovery_state` is host-owned so breaker history survives
  /// across runs.
  pub fn new(
    catalog: ActionCatalog,
    registry: ExecutorRegistry,
    handoff: HandoffCoordinator,
    strategies: StrategyTable,
    recovery_state: Arc<RecoveryState>,
    config: EngineConfig,
  ) -> Result<Self, EngineError> {
    registry.validate_against(&catalog)?;
    let recovery = RecoveryCoordinator::new(strategies, recovery_state, config.breaker.clone());
    Ok(Self {
      catalog,
      registry,
      handoff,
      recovery,
      config,
    })
  }

  /// Runs `start` toward `goal` and returns the closed trace. Fatal errors
  /// finalize the trace, log its content and unwind to the caller;
  /// recoverable per-action failures leave the state untouched and continue.
  #[instrument(level = "trace", skip(self, start, goal, payload))]
  pub async fn execute(
    &self,
    start: &WorldState,
    goal: &StatePatch,
    payload: HashMap<String, serde_json::Value>,
  ) -> Result<ExecutionTrace, EngineError> {
    let run_id = Uuid::new_v4();
    let mut trace = ExecutionTrace::open(run_id);
    let mut state = start.clone();
    info!(run_id = %run_id, goal_keys = goal.len(), "run started");

    let result = self
      .drive(run_id, &mut trace, &mut state, goal, &payload)
      .await;
    trace.close(state);
    match result {
      Ok(()) => {
        info!(
          run_id = %run_id,
          steps = trace.records.len(),
          "run completed"
        );
        Ok(trace)
      }
      Err(err) => {
        // the caller gets the error; the partial trace goes to the log
        error!(
          run_id = %run_id,
          error = %err,
          steps = trace.records.len(),
          final_state = %trace.final_state.canonical_key(),
          "run aborted"
        );
        Err(err)
      }
    }
  }

  /// Plan-cursor loop. A replan request discards the remaining cached plan
  /// and re-enters the loop from the top of a fresh plan; the cursor is never
  /// mutated as a sentinel.
  async fn drive(
    &self,
    run_id: Uuid,
    trace: &mut ExecutionTrace,
    state: &mut WorldState,
    goal: &StatePatch,
    payload: &HashMap<String, serde_json::Value>,
  ) -> Result<(), EngineError> {
    // correct the routing flag up front so the plan and the gates agree
    *state = self.handoff.ensure_state_consistency(state);
    let mut plan = planner::plan(&self.catalog, state, goal)?;
    let mut cursor = 0usize;
    let mut replans = 0u32;
    let mut prev_completed: Option<String> = None;

    while cursor < plan.actions.len() {
      let action = plan.actions[cursor].clone();
      cursor += 1;

      *state = self.handoff.ensure_state_consistency(state);
      let verdict = self
        .handoff
        .validate_handoff(prev_completed.as_deref(), &action, state);
      if !verdict.valid {
        return Err(EngineError::HandoffViolation {
          action_id: action.id.clone(),
          reason: verdict.reason.unwrap_or_else(|| "gate rejected".to_string()),
        });
      }

      let mut record = ExecutionAgentRecord::begin(&action.id);
      info!(run_id = %run_id, action_id = %action.id, "action started");

      let Some(executor) = self.registry.get(&action.id) else {
        let err = EngineError::ExecutorMissing(action.id.clone());
        record.fail(err.to_string());
        trace.push(record);
        return Err(err);
      };
      let fallback = self.resolve_fallback(&action.id);

      let ctx = ExecutionContext {
        run_id,
        state: state.clone(),
        payload: payload.clone(),
      };
      let outcome = self
        .recovery
        .execute_with_recovery(&action, executor, fallback, &ctx, self.config.action_timeout)
        .await;

      match outcome {
        Ok(output) => {
          if let Some(updates) = &output.state_updates {
            *state = state.apply(updates);
          }
          // declared effects merge last: the catalog is ground truth even
          // when the executor reported a partial state update
          *state = state.apply(&action.effects);
          record.complete(output.metadata);
          trace.push(record);
          prev_completed = Some(action.id.clone());
          info!(run_id = %run_id, action_id = %action.id, "action completed");

          if output.should_replan {
            replans += 1;
            if replans > self.config.max_replans {
              return Err(EngineError::PlanNotFound(format!(
                "replan budget of {} exhausted",
                self.config.max_replans
              )));
            }
            info!(run_id = %run_id, replans, "replanning from current state");
            plan = planner::plan(&self.catalog, state, goal)?;
            cursor = 0;
          }
        }
        Err(err) if err.is_fatal() => {
          record.fail(err.to_string());
          trace.push(record);
          return Err(err);
        }
        Err(err @ EngineError::ExecutorTimeout { .. }) => {
          // deadline elapsed: recorded failed, state untouched, run goes on
          record.fail(err.to_string());
          trace.push(record);
          warn!(run_id = %run_id, action_id = %action.id, error = %err, "action timed out");
        }
        Err(err) => {
          record.skip(err.to_string());
          trace.push(record);
          warn!(run_id = %run_id, action_id = %action.id, error = %err, "action skipped");
        }
      }
    }
    Ok(())
  }

  /// Resolves the configured fallback executor for an action, if any.
  /// No-retry strategies never get one: they are single-attempt by contract.
  fn resolve_fallback(&self, action_id: &str) -> Option<(String, Arc<dyn Executor>)> {
    let strategy = self.recovery.strategy_for(action_id);
    if !strategy.retry {
      return None;
    }
    let fallback_id = strategy.fallback_action_id.clone()?;
    match self.registry.get(&fallback_id) {
      Some(executor) => Some((fallback_id, executor)),
      None => {
        warn!(action_id, fallback_id = %fallback_id, "fallback has no registered executor");
        None
      }
    }
  }
}
