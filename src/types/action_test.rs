//! Tests for `action`.

use crate::types::{Action, AttrValue, WorldState};

#[test]
fn builder_populates_preconditions_and_effects() {
  let action = Action::new("calibrate_standard", "Standard calibration", 20.0)
    .pre("color_normalized", true)
    .pre("is_low_confidence", false)
    .eff("skin_tone_estimated", true);
  assert_eq!(action.preconditions.len(), 2);
  assert_eq!(
    action.effects.get("skin_tone_estimated"),
    Some(&AttrValue::Bool(true))
  );
  assert_eq!(action.cost, 20.0);
}

#[test]
fn effects_apply_through_world_state() {
  let action = Action::new("a1", "A1", 10.0).eff("done", true);
  let state = WorldState::new();
  assert!(state.apply(&action.effects).bool_attr("done").unwrap());
}

#[test]
fn action_deserializes_from_catalog_json() {
  let json = r#"{
    "id": "classify_image",
    "name": "Classify image",
    "preconditions": {},
    "effects": {"image_classified": {"bool": true}},
    "cost": 10.0
  }"#;
  let action: Action = serde_json::from_str(json).unwrap();
  assert_eq!(action.id, "classify_image");
  assert!(action.preconditions.is_empty());
  assert_eq!(
    action.effects.get("image_classified"),
    Some(&AttrValue::Bool(true))
  );
}
