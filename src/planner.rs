//! A* planner: lowest-cost action sequence from a start state to a goal.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::{info, instrument, warn};

use crate::catalog::ActionCatalog;
use crate::error::EngineError;
use crate::types::{Action, StatePatch, WorldState};

/// Expansion cap bounding worst-case search in pathological catalogs.
pub const MAX_EXPANSIONS: usize = 5_000;

/// Ordered action sequence with its total cost.
#[derive(Debug, Clone)]
pub struct Plan {
  pub actions: Vec<Action>,
  pub total_cost: f64,
}

/// One discovered search node. Parent links reconstruct the action path.
struct SearchNode {
  state: WorldState,
  parent: Option<usize>,
  /// Catalog index of the action that produced this node.
  action_idx: Option<usize>,
  g: f64,
}

/// Open-set entry. Ordered so the BinaryHeap pops the smallest `f` first,
/// breaking ties FIFO by discovery sequence for deterministic output.
struct OpenEntry {
  f: f64,
  seq: u64,
  node: usize,
}

impl PartialEq for OpenEntry {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for OpenEntry {
  fn cmp(&self, other: &Self) -> Ordering {
    other
      .f
      .total_cmp(&self.f)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

/// Admissible remaining-cost estimate: for every goal key not yet satisfied,
/// charge the cheapest action whose effects satisfy it, counting each distinct
/// action once. Ignoring ordering constraints can only underestimate, never
/// overestimate, so A* optimality holds. Returns infinity when some goal key
/// has no provider at all.
#[instrument(level = "trace", skip(catalog, state, goal))]
pub(crate) fn heuristic(catalog: &ActionCatalog, state: &WorldState, goal: &StatePatch) -> f64 {
  let mut charged: HashSet<usize> = HashSet::new();
  let mut total = 0.0;
  for (key, want) in goal {
    if state.get(key) == Some(want) {
      continue;
    }
    let cheapest = catalog
      .actions()
      .iter()
      .enumerate()
      .filter(|(_, a)| a.effects.get(key) == Some(want))
      .min_by(|(_, a), (_, b)| a.cost.total_cmp(&b.cost));
    match cheapest {
      Some((idx, action)) => {
        if charged.insert(idx) {
          total += action.cost;
        }
      }
      None => return f64::INFINITY,
    }
  }
  total
}

/// Finds the lowest-total-cost action sequence whose effects, applied in
/// order from `start`, produce a state matching every key of `goal`.
///
/// Fails with [EngineError::PlanNotFound] when the goal is unreachable or the
/// expansion cap is hit. Equal-cost plans resolve deterministically: ties on
/// `f` pop in discovery order and actions are tried in catalog order.
#[instrument(level = "trace", skip(catalog, start, goal))]
pub fn plan(
  catalog: &ActionCatalog,
  start: &WorldState,
  goal: &StatePatch,
) -> Result<Plan, EngineError> {
  info!(
    goal_keys = goal.len(),
    catalog_size = catalog.len(),
    "planning started"
  );

  let h0 = heuristic(catalog, start, goal);
  if h0.is_infinite() {
    warn!("planning failed: some goal attribute has no producing action");
    return Err(EngineError::PlanNotFound(
      "goal references an attribute no catalog action produces".to_string(),
    ));
  }

  let mut nodes: Vec<SearchNode> = vec![SearchNode {
    state: start.clone(),
    parent: None,
    action_idx: None,
    g: 0.0,
  }];
  let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
  let mut closed: HashSet<String> = HashSet::new();
  // Best g seen per canonical state, so stale heap entries can be dropped.
  let mut best_g: HashMap<String, f64> = HashMap::new();
  let mut seq: u64 = 0;

  best_g.insert(start.canonical_key(), 0.0);
  open.push(OpenEntry {
    f: h0,
    seq,
    node: 0,
  });

  let mut expansions = 0usize;
  while let Some(entry) = open.pop() {
    let node_idx = entry.node;
    let key = nodes[node_idx].state.canonical_key();
    if best_g.get(&key).is_some_and(|&g| nodes[node_idx].g > g) {
      continue; // superseded by a cheaper path to the same state
    }

    if nodes[node_idx].state.satisfies(goal) {
      let plan = reconstruct(catalog, &nodes, node_idx);
      info!(
        steps = plan.actions.len(),
        total_cost = plan.total_cost,
        expansions,
        "plan found"
      );
      return Ok(plan);
    }

    if expansions >= MAX_EXPANSIONS {
      warn!(expansions, "planning failed: expansion cap reached");
      return Err(EngineError::PlanNotFound(format!(
        "search budget of {MAX_EXPANSIONS} expansions exhausted"
      )));
    }
    expansions += 1;

    if !closed.insert(key) {
      continue;
    }

    for (action_idx, action) in catalog.actions().iter().enumerate() {
      if !nodes[node_idx].state.satisfies(&action.preconditions) {
        continue;
      }
      let next_state = nodes[node_idx].state.apply(&action.effects);
      let next_key = next_state.canonical_key();
      if closed.contains(&next_key) {
        continue;
      }
      let g = nodes[node_idx].g + action.cost;
      if best_g.get(&next_key).is_some_and(|&known| g >= known) {
        continue;
      }
      let h = heuristic(catalog, &next_state, goal);
      if h.is_infinite() {
        continue;
      }
      best_g.insert(next_key, g);
      nodes.push(SearchNode {
        state: next_state,
        parent: Some(node_idx),
        action_idx: Some(action_idx),
        g,
      });
      seq += 1;
      open.push(OpenEntry {
        f: g + h,
        seq,
        node: nodes.len() - 1,
      });
    }
  }

  warn!(expansions, "planning failed: goal unreachable");
  Err(EngineError::PlanNotFound("goal is unreachable".to_string()))
}

/// Walks parent links from `goal_idx` back to the root and reverses the path.
fn reconstruct(catalog: &ActionCatalog, nodes: &[SearchNode], goal_idx: usize) -> Plan {
  let mut actions = vec![];
  let mut cursor = goal_idx;
  while let (Some(action_idx), Some(parent)) = (nodes[cursor].action_idx, nodes[cursor].parent) {
    actions.push(catalog.actions()[action_idx].clone());
    cursor = parent;
  }
  actions.reverse();
  Plan {
    total_cost: nodes[goal_idx].g,
    actions,
  }
}
