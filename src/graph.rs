//! The dependence graph (spec §4.4): a directed multigraph recording how
//! a function's inputs, globals, and arrays relate, built once per
//! analyzed function and then propagated top-down (ranges) and bottom-up
//! (minimum array sizes). Grounded on `original_source/FunctionGenerator.cpp`'s
//! `depGraph_` usage; the arena + generational-key storage follows
//! `hydro-project-hydro`'s `dfir_lang` graph module rather than the
//! original's raw pointer graph (§9: "arena + integer ids, not pointer
//! cycles").

use std::collections::HashMap;
use slotmap::{new_key_type, SlotMap};

use crate::diagnostic::{HarnessError, Phase, Result};
use crate::range::{Range, POS_INF};
use crate::symbol::SymbolId;
use crate::value::AvInterner;

new_key_type! { pub struct NodeId; }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
  /// Size is syntactically known (`int a[10]`).
  Declared,
  /// Size must be derived bottom-up from observed index accesses.
  Inferred,
}

/// One additive term's factor in an [`NodeKind::Affine`] combination: either
/// a plain symbol, or another graph node (a [`NodeKind::Product`], or a
/// nested `Affine`) substituted in by `extractOneTerm` (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AffineFactor {
  Symbol(SymbolId),
  Node(NodeId),
}

#[derive(Debug, Clone)]
pub enum NodeKind {
  Input(SymbolId),
  GlobalVar(SymbolId),
  /// `const_term + Σ coef_i * term_i`, the result of
  /// `extractOneTerm`/`simplifyToAffine` (§4.5) walking an arithmetic
  /// expression's `+`/`-`/`*` structure down to symbols and constants.
  Affine { const_term: i64, terms: Vec<(i64, AffineFactor)> },
  /// Two non-constant factors multiplied together, synthesized when a
  /// multiplicative term has more than one symbol factor (§4.5
  /// "ProductNode", scenario S6).
  Product { lhs: NodeId, rhs: NodeId },
  Array { symbol: SymbolId, kind: ArrayKind },
  /// A callee with no visible definition; stubbed by the harness emitter.
  UncompletedFunction { name: String },
}

#[derive(Debug, Clone)]
pub struct NodeData {
  pub kind: NodeKind,
  pub range: Option<Range>,
}

/// A directed multigraph over analysis nodes. Plain edges mean "depends
/// on" (the source's range feeds the target during top-down propagation);
/// labeled edges mean "this index expression indexes that array at this
/// dimension" and drive bottom-up size inference.
/// Symbol-id-only description of a node, for error messages where a
/// [`crate::symbol::SymbolTable`] is not at hand (unlike [`DependenceGraph::to_dot`],
/// which has one and prints real names).
fn node_desc(kind: &NodeKind) -> String {
  match kind {
    NodeKind::Input(s) => format!("input:{s}"),
    NodeKind::GlobalVar(s) => format!("global:{s}"),
    NodeKind::Affine { const_term, terms } => {
      let mut parts = vec![const_term.to_string()];
      for (coef, factor) in terms {
        parts.push(match factor {
          AffineFactor::Symbol(s) => format!("{coef}*{s}"),
          AffineFactor::Node(n) => format!("{coef}*n{n:?}"),
        });
      }
      parts.join("+")
    }
    NodeKind::Product { lhs, rhs } => format!("n{lhs:?}*n{rhs:?}"),
    NodeKind::Array { symbol, .. } => format!("array:{symbol}"),
    NodeKind::UncompletedFunction { name } => format!("call:{name}"),
  }
}

#[derive(Default)]
pub struct DependenceGraph {
  nodes: SlotMap<NodeId, NodeData>,
  by_symbol: HashMap<SymbolId, NodeId>,
  deps: HashMap<NodeId, Vec<NodeId>>,
  labeled: HashMap<NodeId, Vec<(NodeId, usize)>>,
}

impl DependenceGraph {
  pub fn new() -> Self { DependenceGraph::default() }

  pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
    self.nodes.insert(NodeData { kind, range: None })
  }

  /// Insert (or reuse) the node for `symbol`, so repeated references to
  /// the same input/global do not fork into duplicate nodes.
  pub fn find_or_insert(&mut self, symbol: SymbolId, make: impl FnOnce() -> NodeKind) -> NodeId {
    if let Some(&id) = self.by_symbol.get(&symbol) {
      return id;
    }
    let id = self.add_node(make());
    self.by_symbol.insert(symbol, id);
    id
  }

  pub fn find(&self, symbol: SymbolId) -> Option<NodeId> { self.by_symbol.get(&symbol).copied() }

  /// Register an already-inserted node as `symbol`'s canonical node, for
  /// callers that build a node (possibly a small subgraph of it, e.g. a
  /// `Product` chain) before knowing which symbol it belongs to.
  pub fn alias(&mut self, symbol: SymbolId, node: NodeId) -> NodeId {
    self.by_symbol.entry(symbol).or_insert(node);
    *self.by_symbol.get(&symbol).unwrap()
  }

  pub fn node(&self, id: NodeId) -> &NodeData { &self.nodes[id] }
  pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData { &mut self.nodes[id] }

  pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
    self.deps.entry(from).or_default().push(to);
  }

  pub fn add_labeled_edge(&mut self, idx: NodeId, array: NodeId, dim: usize) {
    self.labeled.entry(idx).or_default().push((array, dim));
  }

  pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ { self.nodes.keys() }

  /// `merge`: two nodes representing the same affine term (same coef,
  /// same symbol) collapse to one, redirecting every edge. Idempotent and
  /// cheap since node count per function is small.
  pub fn merge_duplicate_affines(&mut self) {
    let mut canon: HashMap<(i64, Vec<(i64, AffineFactor)>), NodeId> = HashMap::new();
    let mut redirect: HashMap<NodeId, NodeId> = HashMap::new();
    for id in self.nodes.keys().collect::<Vec<_>>() {
      if let NodeKind::Affine { const_term, terms } = self.nodes[id].kind.clone() {
        match canon.entry((const_term, terms)) {
          std::collections::hash_map::Entry::Occupied(e) => { redirect.insert(id, *e.get()); }
          std::collections::hash_map::Entry::Vacant(e) => { e.insert(id); }
        }
      }
    }
    if redirect.is_empty() { return; }
    let rewrite = |id: NodeId, redirect: &HashMap<NodeId, NodeId>| *redirect.get(&id).unwrap_or(&id);
    for targets in self.deps.values_mut() {
      for t in targets.iter_mut() { *t = rewrite(*t, &redirect); }
    }
    for targets in self.labeled.values_mut() {
      for (t, _) in targets.iter_mut() { *t = rewrite(*t, &redirect); }
    }
    let old_deps: Vec<NodeId> = self.deps.keys().copied().collect();
    for from in old_deps {
      if let Some(canon_from) = redirect.get(&from) {
        let v = self.deps.remove(&from).unwrap_or_default();
        self.deps.entry(*canon_from).or_default().extend(v);
      }
    }
  }

  fn topo_order(&self) -> Vec<NodeId> {
    let mut indeg: HashMap<NodeId, usize> = self.nodes.keys().map(|id| (id, 0)).collect();
    for targets in self.deps.values() {
      for t in targets { *indeg.entry(*t).or_insert(0) += 1; }
    }
    let mut queue: Vec<NodeId> = indeg.iter().filter(|(_, d)| **d == 0).map(|(id, _)| *id).collect();
    queue.sort_by_key(|id| format!("{id:?}"));
    let mut order = Vec::new();
    let mut i = 0;
    while i < queue.len() {
      let id = queue[i];
      i += 1;
      order.push(id);
      if let Some(targets) = self.deps.get(&id) {
        for t in targets {
          let d = indeg.get_mut(t).unwrap();
          *d -= 1;
          if *d == 0 { queue.push(*t); }
        }
      }
    }
    // A cycle (shouldn't happen for the fragment we model) leaves nodes
    // unscheduled; append them so propagation still terminates.
    for id in self.nodes.keys() {
      if !order.contains(&id) { order.push(id); }
    }
    order
  }

  /// Top-down pass: every node's range is the combination of its
  /// predecessors' ranges per its kind (§4.4/§4.5). Fatal (§7) if any
  /// node's computed range is `Empty` — an inconsistency downstream
  /// propagation and harness emission cannot recover from.
  pub fn propagate_top_down(&mut self, iv: &mut AvInterner, func: &str, ranges: impl Fn(SymbolId) -> Range) -> Result<()> {
    let order = self.topo_order();
    for id in order {
      let range = match self.nodes[id].kind.clone() {
        NodeKind::Input(sym) | NodeKind::GlobalVar(sym) => ranges(sym),
        NodeKind::Affine { const_term, terms } => {
          let mut acc = Range::constant(iv, const_term);
          for (coef, factor) in &terms {
            let factor_range = match factor {
              AffineFactor::Symbol(s) => ranges(*s),
              AffineFactor::Node(n) => self.nodes[*n].range.clone().unwrap_or_else(|| Range::full(iv)),
            };
            let c = Range::constant(iv, *coef);
            acc = acc.add(iv, &factor_range.mul(iv, &c));
          }
          acc
        }
        NodeKind::Product { lhs, rhs } => {
          let l = self.nodes[lhs].range.clone().unwrap_or_else(|| Range::full(iv));
          let r = self.nodes[rhs].range.clone().unwrap_or_else(|| Range::full(iv));
          l.mul(iv, &r)
        }
        NodeKind::Array { .. } | NodeKind::UncompletedFunction { .. } => Range::full(iv),
      };
      if range.is_empty() {
        return Err(HarnessError::PropagationFailed {
          func: func.to_string(),
          phase: Phase::TopDown,
          node: node_desc(&self.nodes[id].kind),
        });
      }
      self.nodes[id].range = Some(range);
    }
    Ok(())
  }

  /// Bottom-up pass: for each `(idx, array, dim)` labeled edge, the array's
  /// minimum dimension size is the idx range's upper bound + 1 (0-based
  /// indexing), and the idx's lower bound is tightened to `max(0, lower)`
  /// since a negative index cannot be satisfied by a generated array
  /// (§4.5 "tighten index lower bounds"). Fatal (§7) if an index node's
  /// range is `Empty`/missing, or if a labeled edge's target was never
  /// classified as an array.
  pub fn propagate_bottom_up(&mut self, iv: &mut AvInterner, func: &str) -> Result<HashMap<SymbolId, Vec<Range>>> {
    let mut min_sizes: HashMap<SymbolId, Vec<Range>> = HashMap::new();
    let labeled: Vec<(NodeId, NodeId, usize)> = self.labeled.iter()
      .flat_map(|(idx, targets)| targets.iter().map(move |(array, dim)| (*idx, *array, *dim)))
      .collect();

    for (idx, array, dim) in labeled {
      let idx_range = match self.nodes[idx].range.clone() {
        Some(r) if !r.is_empty() => r,
        _ => return Err(HarnessError::PropagationFailed {
          func: func.to_string(),
          phase: Phase::BottomUp,
          node: node_desc(&self.nodes[idx].kind),
        }),
      };
      let zero = iv.integer(0);
      let tightened_lower = iv.evaluate(&iv.max(idx_range.lower.clone(), zero));
      let tightened = Range::new(tightened_lower, idx_range.upper.clone());
      self.nodes[idx].range = Some(tightened.clone());

      // An unbounded upper endpoint stays unbounded rather than wrapping
      // through `POS_INF + 1`; the harness emitter already falls back to
      // the configured array-size bound for an unresolved `±∞` endpoint.
      let min_len = if tightened.upper.as_integer() == Some(POS_INF) {
        iv.integer(POS_INF)
      } else {
        let one = iv.integer(1);
        iv.evaluate(&iv.add(tightened.upper.clone(), one))
      };

      let array_sym = match &self.nodes[array].kind {
        NodeKind::Array { symbol, .. } => *symbol,
        other => return Err(HarnessError::NonArrayLabeledEdgeTarget { symbol: node_desc(other) }),
      };
      let dims = min_sizes.entry(array_sym).or_default();
      while dims.len() <= dim { dims.push(Range::constant(iv, 0)); }
      dims[dim] = dims[dim].union(iv, &Range::new(iv.integer(0), min_len));
    }
    Ok(min_sizes)
  }

  /// Render a GraphViz `.dot` snapshot, used for the `_init`/`_simpl`/
  /// `_topdown`/`_bottomup` checkpoint files (§4.6, §6 `--write-constraints`).
  pub fn to_dot(&self, table: &crate::symbol::SymbolTable) -> String {
    let mut out = String::from("digraph deps {\n");
    for id in self.nodes.keys() {
      let label = match &self.nodes[id].kind {
        NodeKind::Input(s) => format!("input:{}", table.name(*s)),
        NodeKind::GlobalVar(s) => format!("global:{}", table.name(*s)),
        NodeKind::Affine { const_term, terms } => {
          let mut label = const_term.to_string();
          for (coef, factor) in terms {
            let term = match factor {
              AffineFactor::Symbol(s) => format!("{coef}*{}", table.name(*s)),
              AffineFactor::Node(n) => format!("{coef}*n{n:?}"),
            };
            label.push('+');
            label.push_str(&term);
          }
          label
        }
        NodeKind::Product { lhs, rhs } => format!("n{lhs:?}*n{rhs:?}"),
        NodeKind::Array { symbol, kind } => format!("array:{}({kind:?})", table.name(*symbol)),
        NodeKind::UncompletedFunction { name } => format!("call:{name}"),
      };
      let range = self.nodes[id].range.as_ref().map(|r| format!(" [{}, {}]", r.lower, r.upper)).unwrap_or_default();
      out.push_str(&format!("  n{:?} [label=\"{label}{range}\"];\n", id));
    }
    for (from, targets) in &self.deps {
      for to in targets {
        out.push_str(&format!("  n{from:?} -> n{to:?};\n"));
      }
    }
    for (idx, targets) in &self.labeled {
      for (array, dim) in targets {
        out.push_str(&format!("  n{idx:?} -> n{array:?} [label=\"dim{dim}\", style=dashed];\n"));
      }
    }
    out.push_str("}\n");
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::{SymbolTable, TypeTag, GLOBAL_SCOPE};

  #[test]
  fn top_down_propagates_affine_range() {
    let mut table = SymbolTable::new();
    let n = table.declare("n", GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let mut g = DependenceGraph::new();
    let mut iv = AvInterner::new();
    let input = g.add_node(NodeKind::Input(n));
    let affine = g.add_node(NodeKind::Affine { const_term: 0, terms: vec![(2, AffineFactor::Symbol(n))] });
    g.add_edge(input, affine);
    let seed = Range::new(iv.integer(0), iv.integer(5));
    g.propagate_top_down(&mut iv, "f", |_| seed.clone()).unwrap();
    let r = g.node(affine).range.clone().unwrap();
    assert_eq!(r.upper.as_integer(), Some(10));
  }

  #[test]
  fn product_node_multiplies_its_two_factor_ranges() {
    let mut table = SymbolTable::new();
    let i = table.declare("i", GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let j = table.declare("j", GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let mut g = DependenceGraph::new();
    let mut iv = AvInterner::new();
    let in_i = g.add_node(NodeKind::Input(i));
    let in_j = g.add_node(NodeKind::Input(j));
    let product = g.add_node(NodeKind::Product { lhs: in_i, rhs: in_j });
    g.add_edge(in_i, product);
    g.add_edge(in_j, product);
    let seed = Range::new(iv.integer(2), iv.integer(3));
    g.propagate_top_down(&mut iv, "f", |_| seed.clone()).unwrap();
    let r = g.node(product).range.clone().unwrap();
    assert_eq!(r.lower.as_integer(), Some(4));
    assert_eq!(r.upper.as_integer(), Some(9));
  }

  #[test]
  fn bottom_up_derives_minimum_array_size() {
    let mut table = SymbolTable::new();
    let a = table.declare("a", GLOBAL_SCOPE, TypeTag::Pointer, "int *".into(), 1);
    let i = table.declare("i", GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let mut g = DependenceGraph::new();
    let mut iv = AvInterner::new();
    let idx = g.add_node(NodeKind::Input(i));
    let arr = g.add_node(NodeKind::Array { symbol: a, kind: ArrayKind::Inferred });
    let seed = Range::new(iv.integer(0), iv.integer(9));
    g.propagate_top_down(&mut iv, "f", |_| seed.clone()).unwrap();
    g.add_labeled_edge(idx, arr, 0);
    let sizes = g.propagate_bottom_up(&mut iv, "f").unwrap();
    let dims = sizes.get(&a).unwrap();
    assert_eq!(dims[0].upper.as_integer(), Some(10));
  }

  #[test]
  fn unbounded_index_upper_does_not_overflow_min_len() {
    let mut table = SymbolTable::new();
    let a = table.declare("a", GLOBAL_SCOPE, TypeTag::Pointer, "int *".into(), 1);
    let i = table.declare("i", GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let mut g = DependenceGraph::new();
    let mut iv = AvInterner::new();
    let idx = g.add_node(NodeKind::Input(i));
    let arr = g.add_node(NodeKind::Array { symbol: a, kind: ArrayKind::Inferred });
    let full = Range::full(&mut iv);
    g.propagate_top_down(&mut iv, "f", |_| full.clone()).unwrap();
    g.add_labeled_edge(idx, arr, 0);
    let sizes = g.propagate_bottom_up(&mut iv, "f").unwrap();
    let dims = sizes.get(&a).unwrap();
    assert_eq!(dims[0].upper.as_integer(), Some(crate::range::POS_INF));
  }

  #[test]
  fn labeled_edge_into_non_array_node_is_fatal() {
    let mut table = SymbolTable::new();
    let i = table.declare("i", GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let n = table.declare("n", GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let mut g = DependenceGraph::new();
    let mut iv = AvInterner::new();
    let idx = g.add_node(NodeKind::Input(i));
    let not_array = g.add_node(NodeKind::Input(n));
    let seed = Range::new(iv.integer(0), iv.integer(5));
    g.propagate_top_down(&mut iv, "f", |_| seed.clone()).unwrap();
    g.add_labeled_edge(idx, not_array, 0);
    assert!(g.propagate_bottom_up(&mut iv, "f").is_err());
  }
}
