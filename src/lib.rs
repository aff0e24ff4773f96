//! # planweave
//!
//! Goal-directed action planner paired with a fault-tolerant execution
//! engine: given a starting [WorldState] and a goal (a partial state to
//! reach), the planner computes a minimum-cost action sequence with A*, and
//! the engine runs it step by step, validating every transition through a
//! pipeline of quality gates, wrapping executors in per-action circuit
//! breakers, retries and deadlines, and replanning mid-flight when an
//! executor reports that the world changed underneath it.
//!
//! ## Architecture
//!
//! - `types` — world state, action, trace and breaker data model.
//! - `catalog` — the static action table (plus the built-in pipeline).
//! - `planner` — A* search over the implicit state graph.
//! - `handoff` — quality gates run before each action executes.
//! - `recovery` — circuit breakers, retry/fallback policy.
//! - `engine` — the control loop tying it all together.
//!
//! Everything that does real work (classification, embedding extraction,
//! encryption, search) lives behind the [Executor] seam and is registered by
//! action id in an [ExecutorRegistry].

pub mod catalog;
pub mod engine;
pub mod error;
pub mod executor;
#[cfg(test)]
mod executor_test;
pub mod handoff;
pub mod planner;
pub mod recovery;
pub mod trace_io;
pub mod types;

pub use catalog::{ActionCatalog, builtin_catalog};
pub use engine::{Engine, EngineConfig};
pub use error::EngineError;
pub use executor::{ExecutionContext, Executor, ExecutorFailure, ExecutorRegistry};
pub use handoff::{BranchPolicy, HandoffCoordinator, HandoffVerdict, builtin_handoff};
pub use planner::{Plan, plan};
pub use recovery::{BreakerConfig, RecoveryState, RecoveryStrategy, StrategyTable};
pub use types::{
  Action, AgentStatus, ExecutionAgentRecord, ExecutionTrace, ExecutorOutput, WorldState,
};
