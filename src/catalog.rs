//! Action catalog: the static table of plannable actions.

use std::collections::HashMap;

use thiserror::Error;
use tracing::instrument;

use crate::types::{Action, IS_LOW_CONFIDENCE};

/// Catalog load/validation errors. These are startup-time failures, separate
/// from the runtime [crate::error::EngineError] taxonomy.
#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("action '{id}' has non-positive cost {cost}")]
  NonPositiveCost { id: String, cost: f64 },

  #[error("duplicate action id '{0}'")]
  DuplicateId(String),

  #[error("catalog parse error: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Validated, ordered action table. Declaration order doubles as the
/// canonical pipeline stage order used by the handoff coordinator.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
  actions: Vec<Action>,
  index: HashMap<String, usize>,
}

impl ActionCatalog {
  /// Builds a catalog, rejecting duplicate ids and non-positive or
  /// non-finite costs (either would break A* optimality).
  #[instrument(level = "trace", skip(actions))]
  pub fn from_actions(actions: Vec<Action>) -> Result<Self, CatalogError> {
    let mut index = HashMap::new();
    for (i, action) in actions.iter().enumerate() {
      if !(action.cost.is_finite() && action.cost > 0.0) {
        return Err(CatalogError::NonPositiveCost {
          id: action.id.clone(),
          cost: action.cost,
        });
      }
      if index.insert(action.id.clone(), i).is_some() {
        return Err(CatalogError::DuplicateId(action.id.clone()));
      }
    }
    Ok(Self { actions, index })
  }

  /// Loads the static JSON list format: `[{id, name, preconditions, effects,
  /// cost}, ...]`.
  pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
    let actions: Vec<Action> = serde_json::from_str(json)?;
    Self::from_actions(actions)
  }

  pub fn get(&self, id: &str) -> Option<&Action> {
    self.index.get(id).map(|&i| &self.actions[i])
  }

  /// Actions in declaration order.
  pub fn actions(&self) -> &[Action] {
    &self.actions
  }

  /// Action ids in declaration order (the canonical stage order).
  pub fn stage_order(&self) -> Vec<String> {
    self.actions.iter().map(|a| a.id.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.actions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.actions.is_empty()
  }
}

/// The dermatology analysis pipeline this engine was built around. Two
/// calibration branches share the `skin_tone_estimated` effect key; their
/// mutual exclusivity is enforced by the handoff coordinator, not here.
pub fn builtin_catalog() -> ActionCatalog {
  let actions = vec![
    Action::new("classify_image", "Classify image", 10.0).eff("image_classified", true),
    Action::new("normalize_color", "Normalize color space", 15.0)
      .pre("image_classified", true)
      .eff("color_normalized", true),
    Action::new("calibrate_standard", "Standard skin-tone calibration", 20.0)
      .pre("color_normalized", true)
      .pre(IS_LOW_CONFIDENCE, false)
      .eff("skin_tone_estimated", true),
    Action::new("calibrate_safety", "Safety skin-tone calibration", 35.0)
      .pre("color_normalized", true)
      .pre(IS_LOW_CONFIDENCE, true)
      .eff("skin_tone_estimated", true),
    Action::new("extract_embedding", "Extract image embedding", 25.0)
      .pre("skin_tone_estimated", true)
      .eff("embedding_extracted", true),
    Action::new("encrypt_embedding", "Encrypt embedding", 5.0)
      .pre("embedding_extracted", true)
      .eff("embedding_encrypted", true),
    Action::new("search_literature", "Search literature", 40.0)
      .pre("embedding_encrypted", true)
      .pre("skin_tone_estimated", true)
      .eff("literature_searched", true),
  ];
  ActionCatalog::from_actions(actions).expect("builtin catalog is valid")
}
