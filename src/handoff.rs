//! Handoff coordinator: quality gates validated between consecutive actions.

use std::collections::HashMap;

use tracing::{instrument, warn};

use crate::types::{
  Action, AttrValue, CONFIDENCE_SCORE, CONFIDENCE_THRESHOLD, IS_LOW_CONFIDENCE, StatePatch,
  WorldState,
};

/// The two mutually exclusive calibration branches and the flag that routes
/// between them.
#[derive(Debug, Clone)]
pub struct BranchPolicy {
  pub safety_action_id: String,
  pub standard_action_id: String,
  pub routing_flag: String,
}

/// Verdict of one handoff validation. The first failing gate short-circuits
/// with a reason; non-fatal anomalies accumulate as warnings.
#[derive(Debug, Clone)]
pub struct HandoffVerdict {
  pub valid: bool,
  pub reason: Option<String>,
  pub warnings: Vec<String>,
}

/// Runs the fixed gate pipeline before each action executes. Gate order:
/// branch exclusivity, canonical sequence, structural prerequisites,
/// confidence consistency (warning only), formal preconditions.
#[derive(Debug, Clone)]
pub struct HandoffCoordinator {
  branch: BranchPolicy,
  /// Canonical pipeline stage order (action ids). Ids not listed here carry
  /// no ordering constraint.
  stage_order: Vec<String>,
  /// Structural prerequisites beyond an action's formal preconditions.
  structural: HashMap<String, StatePatch>,
  score_attr: String,
  threshold: f64,
}

impl HandoffCoordinator {
  pub fn new(branch: BranchPolicy, stage_order: Vec<String>) -> Self {
    Self {
      branch,
      stage_order,
      structural: HashMap::new(),
      score_attr: CONFIDENCE_SCORE.to_string(),
      threshold: CONFIDENCE_THRESHOLD,
    }
  }

  /// Declares a structural prerequisite: `action_id` additionally requires
  /// `key=value` in the current state.
  pub fn require(
    mut self,
    action_id: impl Into<String>,
    key: impl Into<String>,
    value: impl Into<AttrValue>,
  ) -> Self {
    self
      .structural
      .entry(action_id.into())
      .or_default()
      .insert(key.into(), value.into());
    self
  }

  fn stage_rank(&self, action_id: &str) -> Option<usize> {
    self.stage_order.iter().position(|id| id == action_id)
  }

  /// Gate 1: a transition into the safety branch is illegal unless the
  /// routing flag signals low confidence, and vice versa for the standard
  /// branch. The two branches must never both be reachable from one state.
  fn check_branch_exclusivity(&self, next: &Action, state: &WorldState) -> Result<(), String> {
    let low = state.bool_attr(&self.branch.routing_flag).unwrap_or(false);
    if next.id == self.branch.safety_action_id && !low {
      return Err(format!(
        "safety branch '{}' entered while '{}' is false",
        next.id, self.branch.routing_flag
      ));
    }
    if next.id == self.branch.standard_action_id && low {
      return Err(format!(
        "standard branch '{}' entered while '{}' is true",
        next.id, self.branch.routing_flag
      ));
    }
    Ok(())
  }

  /// Gate 2: the pipeline may not regress against the canonical stage order.
  fn check_canonical_sequence(&self, prev: Option<&str>, next: &Action) -> Result<(), String> {
    let Some(prev_id) = prev else { return Ok(()) };
    if let (Some(prev_rank), Some(next_rank)) = (self.stage_rank(prev_id), self.stage_rank(&next.id))
      && next_rank < prev_rank
    {
      return Err(format!(
        "'{}' (stage {}) would regress behind completed '{}' (stage {})",
        next.id, next_rank, prev_id, prev_rank
      ));
    }
    Ok(())
  }

  /// Gate 3: structural prerequisites declared beyond formal preconditions.
  fn check_state_consistency(&self, next: &Action, state: &WorldState) -> Result<(), String> {
    if let Some(required) = self.structural.get(&next.id)
      && !state.satisfies(required)
    {
      return Err(format!(
        "structural prerequisite of '{}' not met by current state",
        next.id
      ));
    }
    Ok(())
  }

  /// Gate 4: score/flag disagreement is an anomaly worth surfacing, but not
  /// a reason to block execution.
  fn check_confidence_consistency(&self, state: &WorldState) -> Option<String> {
    let score = state.score_attr(&self.score_attr)?;
    let flag = state.bool_attr(&self.branch.routing_flag)?;
    let expected = score < self.threshold;
    if flag != expected {
      return Some(format!(
        "{} {:.2} disagrees with {}={} (threshold {})",
        self.score_attr, score, self.branch.routing_flag, flag, self.threshold
      ));
    }
    None
  }

  /// Gate 5: re-validate declared preconditions independently of the planner.
  fn check_formal_preconditions(&self, next: &Action, state: &WorldState) -> Result<(), String> {
    for (key, want) in &next.preconditions {
      if state.get(key) != Some(want) {
        return Err(format!(
          "precondition '{}' of '{}' not satisfied",
          key, next.id
        ));
      }
    }
    Ok(())
  }

  /// Validates the transition from the previous *completed* action into
  /// `next`. The first failing gate short-circuits.
  #[instrument(level = "trace", skip(self, next, state), fields(next_id = %next.id))]
  pub fn validate_handoff(
    &self,
    prev_completed: Option<&str>,
    next: &Action,
    state: &WorldState,
  ) -> HandoffVerdict {
    let mut warnings = vec![];
    let reject = |reason: String, warnings: Vec<String>| {
      warn!(action_id = %next.id, reason = %reason, "handoff violation");
      HandoffVerdict {
        valid: false,
        reason: Some(reason),
        warnings,
      }
    };

    if let Err(reason) = self.check_branch_exclusivity(next, state) {
      return reject(reason, warnings);
    }
    if let Err(reason) = self.check_canonical_sequence(prev_completed, next) {
      return reject(reason, warnings);
    }
    if let Err(reason) = self.check_state_consistency(next, state) {
      return reject(reason, warnings);
    }
    if let Some(warning) = self.check_confidence_consistency(state) {
      warn!(action_id = %next.id, warning = %warning, "handoff warning");
      warnings.push(warning);
    }
    if let Err(reason) = self.check_formal_preconditions(next, state) {
      return reject(reason, warnings);
    }
    HandoffVerdict {
      valid: true,
      reason: None,
      warnings,
    }
  }

  /// Derives the routing flag from the numeric score before each action runs,
  /// so a long-lived state stays self-consistent even when an executor forgot
  /// to set the flag. Every correction is logged.
  #[instrument(level = "trace", skip(self, state))]
  pub fn ensure_state_consistency(&self, state: &WorldState) -> WorldState {
    let Some(score) = state.score_attr(&self.score_attr) else {
      return state.clone();
    };
    let expected = score < self.threshold;
    if state.bool_attr(&self.branch.routing_flag) == Some(expected) {
      return state.clone();
    }
    warn!(
      score,
      was = ?state.bool_attr(&self.branch.routing_flag),
      now = expected,
      "auto-corrected routing flag from confidence score"
    );
    let mut patch = StatePatch::new();
    patch.insert(self.branch.routing_flag.clone(), AttrValue::Bool(expected));
    state.apply(&patch)
  }
}

/// Coordinator wired for [crate::catalog::builtin_catalog]: calibration
/// branch policy, catalog declaration order as the stage order, and the
/// calibration stages' dependency on upstream color normalization.
pub fn builtin_handoff(catalog: &crate::catalog::ActionCatalog) -> HandoffCoordinator {
  HandoffCoordinator::new(
    BranchPolicy {
      safety_action_id: "calibrate_safety".to_string(),
      standard_action_id: "calibrate_standard".to_string(),
      routing_flag: IS_LOW_CONFIDENCE.to_string(),
    },
    catalog.stage_order(),
  )
  .require("calibrate_standard", "color_normalized", true)
  .require("calibrate_safety", "color_normalized", true)
  .require("search_literature", "embedding_encrypted", true)
}
