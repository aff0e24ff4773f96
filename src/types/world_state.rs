//! World state: named-attribute snapshot describing pipeline progress.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::StatePatch;

/// Bounded classification enum for the image-type attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageClass {
  Dermoscopic,
  Clinical,
  Unknown,
}

impl fmt::Display for ImageClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ImageClass::Dermoscopic => write!(f, "dermoscopic"),
      ImageClass::Clinical => write!(f, "clinical"),
      ImageClass::Unknown => write!(f, "unknown"),
    }
  }
}

/// Value of one world-state attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
  /// Pipeline stage completion flag or routing flag.
  Bool(bool),
  /// Bounded classification result.
  Class(ImageClass),
  /// Confidence scalar in [0, 1].
  Score(f64),
}

impl AttrValue {
  /// Stable text form used inside [WorldState::canonical_key]. Rust's float
  /// Display prints the shortest round-trip representation, so identical
  /// values always encode identically.
  pub(crate) fn canonical(&self) -> String {
    match self {
      AttrValue::Bool(b) => b.to_string(),
      AttrValue::Class(c) => c.to_string(),
      AttrValue::Score(s) => s.to_string(),
    }
  }
}

impl From<bool> for AttrValue {
  fn from(b: bool) -> Self {
    AttrValue::Bool(b)
  }
}

impl From<f64> for AttrValue {
  fn from(s: f64) -> Self {
    AttrValue::Score(s)
  }
}

impl From<ImageClass> for AttrValue {
  fn from(c: ImageClass) -> Self {
    AttrValue::Class(c)
  }
}

/// Immutable-by-convention attribute snapshot. Each execution step produces a
/// fresh snapshot via [WorldState::apply]; nothing mutates a state mid-run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
  attrs: BTreeMap<String, AttrValue>,
}

impl WorldState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style attribute insertion, for assembling start states.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
    self.attrs.insert(key.into(), value.into());
    self
  }

  pub fn get(&self, key: &str) -> Option<&AttrValue> {
    self.attrs.get(key)
  }

  /// Boolean attribute, or None when absent or not a Bool.
  pub fn bool_attr(&self, key: &str) -> Option<bool> {
    match self.attrs.get(key) {
      Some(AttrValue::Bool(b)) => Some(*b),
      _ => None,
    }
  }

  /// Score attribute, or None when absent or not a Score.
  pub fn score_attr(&self, key: &str) -> Option<f64> {
    match self.attrs.get(key) {
      Some(AttrValue::Score(s)) => Some(*s),
      _ => None,
    }
  }

  /// Strict partial-state match: every key of `partial` must be present in
  /// this state with an equal value. A missing key is a mismatch.
  pub fn satisfies(&self, partial: &StatePatch) -> bool {
    partial
      .iter()
      .all(|(k, v)| self.attrs.get(k).is_some_and(|have| have == v))
  }

  /// Returns a fresh snapshot with `patch` merged over this state.
  pub fn apply(&self, patch: &StatePatch) -> WorldState {
    let mut next = self.clone();
    for (k, v) in patch {
      next.attrs.insert(k.clone(), v.clone());
    }
    next
  }

  /// Order-independent identity key: attribute names are stored sorted, so
  /// two states with identical content encode identically regardless of
  /// insertion order. Used as the planner's visited-set key.
  pub fn canonical_key(&self) -> String {
    let mut out = String::from("{");
    for (i, (k, v)) in self.attrs.iter().enumerate() {
      if i > 0 {
        out.push(',');
      }
      out.push_str(k);
      out.push('=');
      out.push_str(&v.canonical());
    }
    out.push('}');
    out
  }

  pub fn attrs(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
    self.attrs.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.attrs.is_empty()
  }
}
