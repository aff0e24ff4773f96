//! Core data model for planning and execution.
//!
//! [WorldState] snapshots flow through the engine by value; the only piece of
//! state that outlives a single run is the per-action [BreakerState] map owned
//! by the host (see [crate::recovery::RecoveryState]).

use std::collections::BTreeMap;

mod action;
#[cfg(test)]
mod action_test;
mod agent_record;
#[cfg(test)]
mod agent_record_test;
mod breaker;
#[cfg(test)]
mod breaker_test;
mod execution_trace;
#[cfg(test)]
mod execution_trace_test;
mod executor_output;
mod world_state;

pub use action::Action;
pub use agent_record::{AgentStatus, ExecutionAgentRecord};
pub use breaker::{BreakerState, CircuitMode};
pub use execution_trace::ExecutionTrace;
pub use executor_output::ExecutorOutput;
pub use world_state::{AttrValue, ImageClass, WorldState};

/// Partial state: the map shape shared by preconditions, effects, goals and
/// executor state updates. Sorted keys keep every encoding order-independent.
pub type StatePatch = BTreeMap<String, AttrValue>;

/// Attribute carrying the numeric classification confidence in [0, 1].
pub const CONFIDENCE_SCORE: &str = "confidence_score";
/// Attribute carrying the skin-tone estimation confidence in [0, 1].
pub const SKIN_TONE_CONFIDENCE: &str = "skin_tone_confidence";
/// Routing flag: true when the run must take the safety calibration branch.
pub const IS_LOW_CONFIDENCE: &str = "is_low_confidence";
/// Bounded enum attribute holding the image classification result.
pub const IMAGE_CLASS: &str = "image_class";

/// Threshold below which a confidence score routes to the safety branch.
pub const CONFIDENCE_THRESHOLD: f64 = 0.65;
