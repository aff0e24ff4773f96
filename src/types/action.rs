//! Catalog action: preconditions, effects and a positive cost.

use serde::{Deserialize, Serialize};

use super::{AttrValue, StatePatch};

/// One entry of the action catalog. Static, loaded once at startup.
///
/// `cost` must be positive and finite; the catalog loader rejects anything
/// else because a zero or negative edge weight breaks A* optimality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub preconditions: StatePatch,
  #[serde(default)]
  pub effects: StatePatch,
  pub cost: f64,
}

impl Action {
  pub fn new(id: impl Into<String>, name: impl Into<String>, cost: f64) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      preconditions: StatePatch::new(),
      effects: StatePatch::new(),
      cost,
    }
  }

  /// Builder-style precondition insertion.
  pub fn pre(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
    self.preconditions.insert(key.into(), value.into());
    self
  }

  /// Builder-style effect insertion.
  pub fn eff(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
    self.effects.insert(key.into(), value.into());
    self
  }
}
