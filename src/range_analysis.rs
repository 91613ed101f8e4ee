//! Flow-sensitive interval abstract interpreter over a bound function body
//! (spec §4.2). Grounded on `original_source/RangeAnalysis.h`'s visitor:
//! parameters get an initial range, straight-line statements update ranges
//! in place, `if`/`else` branches refine a snapshot per side, and
//! `while`/`for`/`do` loops iterate to a fixed point with the widening
//! accelerator from [`crate::range`].

use hashbrown::HashMap;
use im::HashMap as PersistentMap;
use lang_c::ast::{
  BinaryOperator, BinaryOperatorExpression, BlockItem, Constant, DoWhileStatement, Expression,
  ForInitializer, ForStatement, Identifier, IfStatement, Initializer, Statement, UnaryOperator,
  UnaryOperatorExpression, WhileStatement,
};
use smallvec::SmallVec;

use crate::binder::declarator_name;
use crate::config::AnalysisOptions;
use crate::diagnostic::{warn_diag, HarnessError, Result};
use crate::range::{self, Range, POS_INF};
use crate::symbol::{ScopeId, SymbolId, SymbolTable, TypeTag};
use crate::value::AvInterner;

/// Per-symbol array facts accumulated across a function body. Unlike scalar
/// ranges these are *not* flow sensitive: once a pointer has been indexed
/// anywhere in the function it is an array everywhere (sticky, §4.2/§9).
#[derive(Debug, Clone, Default)]
pub struct ArrayInfo {
  pub pointer_is_array: bool,
  /// One accumulated index range per dimension, in access order: `a[i][j]`
  /// contributes to dimension 0 from `i`, dimension 1 from `j`.
  pub index_ranges: Vec<Range>,
}

impl ArrayInfo {
  fn record_access(&mut self, iv: &mut AvInterner, dim: usize, idx: &Range) {
    self.pointer_is_array = true;
    while self.index_ranges.len() <= dim {
      self.index_ranges.push(Range::constant(iv, 0));
    }
    self.index_ranges[dim] = self.index_ranges[dim].union(iv, idx);
  }
}

#[derive(Debug, Clone)]
struct Versioned {
  range: Range,
  history: SmallVec<[Range; 3]>,
  revision: u32,
}

/// Flow-sensitive symbol -> range map with O(1) snapshot/restore via
/// `im::HashMap`'s structural sharing, plus a short per-key history used by
/// the widening accelerator (§4.2, §9: "arena + revision counters, not deep
/// copies").
#[derive(Debug, Clone, Default)]
struct VersionedMap {
  entries: PersistentMap<SymbolId, Versioned>,
}

impl VersionedMap {
  fn new() -> Self { VersionedMap::default() }

  fn get(&self, sym: SymbolId) -> Option<Range> {
    self.entries.get(&sym).map(|v| v.range.clone())
  }

  fn set(&mut self, sym: SymbolId, range: Range) {
    match self.entries.get_mut(&sym) {
      Some(v) => {
        if v.history.len() == 3 { v.history.remove(0); }
        v.history.push(v.range.clone());
        v.range = range;
        v.revision += 1;
      }
      None => {
        self.entries.insert(sym, Versioned { range, history: SmallVec::new(), revision: 0 });
      }
    }
  }

  fn history(&self, sym: SymbolId) -> &[Range] {
    self.entries.get(&sym).map(|v| v.history.as_slice()).unwrap_or(&[])
  }

  /// O(1): the persistent map shares structure with `self` until mutated.
  fn snapshot(&self) -> Self { self.clone() }
}

pub struct RangeAnalysis<'a> {
  table: &'a SymbolTable,
  iv: AvInterner,
  ranges: VersionedMap,
  arrays: HashMap<SymbolId, ArrayInfo>,
  options: AnalysisOptions,
}

impl<'a> RangeAnalysis<'a> {
  pub fn new(table: &'a SymbolTable, options: AnalysisOptions) -> Self {
    RangeAnalysis { table, iv: AvInterner::new(), ranges: VersionedMap::new(), arrays: HashMap::new(), options }
  }

  pub fn interner_mut(&mut self) -> &mut AvInterner { &mut self.iv }

  pub fn range_of(&self, sym: SymbolId) -> Range {
    self.ranges.get(sym).unwrap_or_else(|| Range::full(&mut AvInterner::new()))
  }

  pub fn array_info(&self, sym: SymbolId) -> Option<&ArrayInfo> { self.arrays.get(&sym) }

  pub fn arrays(&self) -> impl Iterator<Item = (&SymbolId, &ArrayInfo)> { self.arrays.iter() }

  /// Seed a parameter's initial range: full range, clamped to `[0, +inf)`
  /// for an unsigned spelling, and pointers get a nominal `[0, 0]` dummy
  /// range since what matters for them is array-ness, tracked separately.
  pub fn seed_param(&mut self, sym: SymbolId) {
    let data = self.table.data(sym);
    let range = match data.tag {
      TypeTag::Pointer | TypeTag::Array => {
        self.arrays.entry(sym).or_default();
        Range::full(&mut self.iv)
      }
      _ if data.spelled_type.contains("unsigned") => {
        Range::new(self.iv.integer(0), self.iv.integer(POS_INF))
      }
      _ => Range::full(&mut self.iv),
    };
    self.ranges.set(sym, range);
  }

  pub fn analyze_body(&mut self, body: &Statement, scope: ScopeId) -> Result<()> {
    self.visit_statement(body, scope)
  }

  fn visit_statement(&mut self, stmt: &Statement, scope: ScopeId) -> Result<()> {
    match stmt {
      Statement::Compound(items) => {
        for item in items {
          self.visit_block_item(&item.node, scope)?;
        }
        Ok(())
      }
      Statement::Expression(Some(expr)) => {
        self.eval(&expr.node, scope)?;
        Ok(())
      }
      Statement::Expression(None) => Ok(()),
      Statement::If(inner) => self.visit_if(&inner.node, scope),
      Statement::While(inner) => self.visit_while(&inner.node, scope),
      Statement::DoWhile(inner) => self.visit_do_while(&inner.node, scope),
      Statement::For(inner) => self.visit_for(&inner.node, scope),
      Statement::Labeled(inner) => self.visit_statement(&inner.node.statement.node, scope),
      Statement::Return(Some(expr)) => {
        self.eval(&expr.node, scope)?;
        Ok(())
      }
      Statement::Return(None)
      | Statement::Continue
      | Statement::Break
      | Statement::Goto(_)
      | Statement::Asm(_) => Ok(()),
      Statement::Switch(inner) => self.visit_statement(&inner.node.statement.node, scope),
    }
  }

  fn visit_block_item(&mut self, item: &BlockItem, scope: ScopeId) -> Result<()> {
    match item {
      BlockItem::Declaration(decl) => {
        for init in &decl.node.declarators {
          let Some(name) = declarator_name(&init.node.declarator.node) else { continue };
          let Some(sym) = self.table.lookup(&name, scope) else { continue };
          let range = match &init.node.initializer {
            Some(i) => self.eval_initializer(&i.node, scope)?,
            None => Range::full(&mut self.iv),
          };
          if matches!(self.table.tag(sym), TypeTag::Pointer | TypeTag::Array) {
            self.arrays.entry(sym).or_default();
          }
          self.ranges.set(sym, range);
        }
        Ok(())
      }
      BlockItem::Statement(stmt) => self.visit_statement(&stmt.node, scope),
      BlockItem::StaticAssert(_) => Ok(()),
    }
  }

  fn eval_initializer(&mut self, init: &Initializer, scope: ScopeId) -> Result<Range> {
    match init {
      Initializer::Expression(e) => self.eval(&e.node, scope),
      Initializer::List(_) => Ok(Range::full(&mut self.iv)),
    }
  }

  fn visit_if(&mut self, s: &IfStatement, scope: ScopeId) -> Result<()> {
    let (then_refine, else_refine) = self.condition_refinements(&s.condition.node, scope);

    let entry = self.ranges.snapshot();
    self.apply_refinements(&then_refine);
    self.visit_statement(&s.then_statement.node, scope)?;
    let then_exit = self.ranges.snapshot();

    self.ranges = entry;
    self.apply_refinements(&else_refine);
    if let Some(els) = &s.else_statement {
      self.visit_statement(&els.node, scope)?;
    }
    let else_exit = self.ranges.snapshot();

    self.ranges = self.join(&then_exit, &else_exit);
    Ok(())
  }

  /// Refine with the guard's "loop continues" side before running the body
  /// each pass, so the induction variable's range seen by the body is
  /// pulled back to the guard's bound even after a pass widens it to `±∞`
  /// (the next guard refinement re-clamps it — see `fixpoint_loop`).
  fn visit_while(&mut self, s: &WhileStatement, scope: ScopeId) -> Result<()> {
    self.fixpoint_loop(scope, |this, scope| {
      let (then_refine, _) = this.condition_refinements(&s.expression.node, scope);
      this.apply_refinements(&then_refine);
      this.visit_statement(&s.statement.node, scope)
    })
  }

  fn visit_do_while(&mut self, s: &DoWhileStatement, scope: ScopeId) -> Result<()> {
    self.fixpoint_loop(scope, |this, scope| {
      this.visit_statement(&s.statement.node, scope)?;
      let (then_refine, _) = this.condition_refinements(&s.expression.node, scope);
      this.apply_refinements(&then_refine);
      Ok(())
    })
  }

  fn visit_for(&mut self, s: &ForStatement, scope: ScopeId) -> Result<()> {
    match &s.initializer.node {
      ForInitializer::Declaration(decl) => {
        self.visit_block_item(&BlockItem::Declaration(decl.clone()), scope)?;
      }
      ForInitializer::Expression(e) => {
        self.eval(&e.node, scope)?;
      }
      ForInitializer::Empty => {}
    }
    self.fixpoint_loop(scope, |this, scope| {
      if let Some(cond) = &s.condition {
        let (then_refine, _) = this.condition_refinements(&cond.node, scope);
        this.apply_refinements(&then_refine);
      }
      this.visit_statement(&s.statement.node, scope)?;
      if let Some(step) = &s.step {
        this.eval(&step.node, scope)?;
      }
      Ok(())
    })
  }

  /// Iterate the loop body, widening ranges touched each pass, until they
  /// stabilize or `loop_iteration_cap` is hit (property 5, §8: terminates
  /// in finitely many steps because widening is monotone towards `±∞`).
  fn fixpoint_loop(&mut self, scope: ScopeId, mut step: impl FnMut(&mut Self, ScopeId) -> Result<()>) -> Result<()> {
    let mut stable = false;
    for _ in 0..self.options.loop_iteration_cap {
      let before = self.ranges.snapshot();
      step(self, scope)?;
      let mut all_symbols: Vec<SymbolId> = before.entries.keys().copied().collect();
      for sym in self.ranges.entries.keys() {
        if !all_symbols.contains(sym) { all_symbols.push(*sym); }
      }
      let mut changed = false;
      for sym in all_symbols {
        let prev = before.get(sym).unwrap_or_else(|| Range::full(&mut self.iv));
        let cur = self.ranges.get(sym).unwrap_or_else(|| Range::full(&mut self.iv));
        let joined = prev.union(&mut self.iv, &cur);
        let history: Vec<Range> = self.ranges.history(sym).to_vec();
        let widened = range::widen(&mut self.iv, &joined, &history);
        if widened != prev { changed = true; }
        self.ranges.set(sym, widened);
      }
      if !changed { stable = true; break; }
    }
    if !stable {
      warn_diag!("loop in scope {scope:?} did not reach a fixed point within the iteration cap; widening to full range");
      let keys: Vec<SymbolId> = self.ranges.entries.keys().copied().collect();
      for sym in keys {
        self.ranges.set(sym, Range::full(&mut self.iv));
      }
    }
    Ok(())
  }

  fn join(&mut self, a: &VersionedMap, b: &VersionedMap) -> VersionedMap {
    let mut out = VersionedMap::new();
    let mut keys: Vec<SymbolId> = a.entries.keys().copied().collect();
    for k in b.entries.keys() {
      if !keys.contains(k) { keys.push(*k); }
    }
    for sym in keys {
      let ra = a.get(sym).unwrap_or_else(|| Range::full(&mut self.iv));
      let rb = b.get(sym).unwrap_or_else(|| Range::full(&mut self.iv));
      out.set(sym, ra.union(&mut self.iv, &rb));
    }
    out
  }

  /// Per spec §4.2's branch-refinement table. Only identifier-vs-expression
  /// comparisons are refined; anything else is left untouched on both
  /// sides (conservative). `==`/`!=` are asymmetric by construction: an
  /// interval domain cannot express "everything except one point", so only
  /// the side that narrows to intersection is refined (§9 Open Question).
  fn condition_refinements(&mut self, cond: &Expression, scope: ScopeId) -> (Vec<(SymbolId, Range)>, Vec<(SymbolId, Range)>) {
    let Expression::BinaryOperator(bin) = cond else { return (vec![], vec![]) };
    let BinaryOperatorExpression { operator, lhs, rhs } = &bin.node;
    let lhs_sym = self.as_symbol(&lhs.node, scope);
    let rhs_sym = self.as_symbol(&rhs.node, scope);
    let lhs_range = self.eval(&lhs.node, scope).unwrap_or_else(|_| Range::full(&mut self.iv));
    let rhs_range = self.eval(&rhs.node, scope).unwrap_or_else(|_| Range::full(&mut self.iv));

    let mut then_refine = Vec::new();
    let mut else_refine = Vec::new();

    if let Some(sym) = lhs_sym {
      if let Some((then_r, else_r)) = self.refine_for(operator.node, &lhs_range, &rhs_range) {
        then_refine.push((sym, then_r));
        else_refine.push((sym, else_r));
      }
    }
    if let Some(sym) = rhs_sym {
      if let Some(mirrored) = mirror_operator(operator.node) {
        if let Some((then_r, else_r)) = self.refine_for(mirrored, &rhs_range, &lhs_range) {
          then_refine.push((sym, then_r));
          else_refine.push((sym, else_r));
        }
      }
    }
    (then_refine, else_refine)
  }

  /// Refinement of `x OP other` into `(then-range-of-x, else-range-of-x)`.
  fn refine_for(&mut self, op: BinaryOperator, x: &Range, other: &Range) -> Option<(Range, Range)> {
    let iv = &mut self.iv;
    match op {
      BinaryOperator::Less => {
        let one = iv.integer(1);
        let then_upper = iv.evaluate(&iv.sub(other.upper.clone(), one));
        let then = Range::new(x.lower.clone(), then_upper).intersect_with(iv, x);
        let els = Range::new(other.lower.clone(), x.upper.clone()).intersect_with(iv, x);
        Some((then, els))
      }
      BinaryOperator::LessOrEqual => {
        let then = Range::new(x.lower.clone(), other.upper.clone()).intersect_with(iv, x);
        let one = iv.integer(1);
        let else_lower = iv.evaluate(&iv.add(other.lower.clone(), one));
        let els = Range::new(else_lower, x.upper.clone()).intersect_with(iv, x);
        Some((then, els))
      }
      BinaryOperator::Greater => {
        let one = iv.integer(1);
        let then_lower = iv.evaluate(&iv.add(other.lower.clone(), one));
        let then = Range::new(then_lower, x.upper.clone()).intersect_with(iv, x);
        let els = Range::new(x.lower.clone(), other.upper.clone()).intersect_with(iv, x);
        Some((then, els))
      }
      BinaryOperator::GreaterOrEqual => {
        let then = Range::new(other.lower.clone(), x.upper.clone()).intersect_with(iv, x);
        let one = iv.integer(1);
        let else_upper = iv.evaluate(&iv.sub(other.lower.clone(), one));
        let els = Range::new(x.lower.clone(), else_upper).intersect_with(iv, x);
        Some((then, els))
      }
      BinaryOperator::Equals => {
        let then = x.intersect_with(iv, other);
        Some((then, x.clone()))
      }
      BinaryOperator::NotEquals => {
        let els = x.intersect_with(iv, other);
        Some((x.clone(), els))
      }
      _ => None,
    }
  }

  fn apply_refinements(&mut self, refinements: &[(SymbolId, Range)]) {
    for (sym, range) in refinements {
      self.ranges.set(*sym, range.clone());
    }
  }

  fn as_symbol(&self, e: &Expression, scope: ScopeId) -> Option<SymbolId> {
    match e {
      Expression::Identifier(id) => self.table.lookup(&id.node.name, scope),
      _ => None,
    }
  }

  /// Evaluate an expression's resulting range, threading assignments and
  /// array accesses through to update flow state (§4.2: "statements that
  /// are not themselves control flow update the map in place").
  fn eval(&mut self, e: &Expression, scope: ScopeId) -> Result<Range> {
    match e {
      Expression::Identifier(id) => self.eval_identifier(&id.node, scope),
      Expression::Constant(c) => Ok(self.eval_constant(&c.node)),
      Expression::UnaryOperator(u) => self.eval_unary(&u.node, scope),
      Expression::BinaryOperator(b) => self.eval_binary(&b.node, scope),
      Expression::Cast(c) => self.eval(&c.node.expression.node, scope),
      Expression::Conditional(c) => {
        let (then_refine, else_refine) = self.condition_refinements(&c.node.condition.node, scope);
        let entry = self.ranges.snapshot();
        self.apply_refinements(&then_refine);
        let then_v = self.eval(&c.node.then_expression.node, scope)?;
        self.ranges = entry;
        self.apply_refinements(&else_refine);
        let else_v = self.eval(&c.node.else_expression.node, scope)?;
        Ok(then_v.union(&mut self.iv, &else_v))
      }
      Expression::Call(c) => {
        for arg in &c.node.arguments {
          self.eval(&arg.node, scope)?;
        }
        Ok(Range::full(&mut self.iv))
      }
      Expression::Comma(exprs) => {
        let mut last = Range::full(&mut self.iv);
        for e in &exprs.node {
          last = self.eval(&e.node, scope)?;
        }
        Ok(last)
      }
      _ => Ok(Range::full(&mut self.iv)),
    }
  }

  fn eval_identifier(&mut self, id: &Identifier, scope: ScopeId) -> Result<Range> {
    let sym = self.table.lookup(&id.name, scope)
      .ok_or_else(|| HarnessError::NoArgumentNames { func: id.name.clone() })?;
    Ok(self.ranges.get(sym).unwrap_or_else(|| Range::full(&mut self.iv)))
  }

  fn eval_constant(&mut self, c: &Constant) -> Range {
    match c {
      Constant::Integer(i) => {
        let v = i.number.parse::<i64>().unwrap_or(0);
        Range::constant(&mut self.iv, v)
      }
      Constant::Character(_) => Range::full(&mut self.iv),
      Constant::Float(f) => {
        if self.options.truncate_floats {
          let v = f.number.parse::<f64>().unwrap_or(0.0) as i64;
          Range::constant(&mut self.iv, v)
        } else {
          Range::full(&mut self.iv)
        }
      }
    }
  }

  fn eval_unary(&mut self, u: &UnaryOperatorExpression, scope: ScopeId) -> Result<Range> {
    let operand = self.eval(&u.operand.node, scope)?;
    match u.operator.node {
      UnaryOperator::Minus => Ok(operand.negate(&mut self.iv)),
      UnaryOperator::Plus => Ok(operand),
      UnaryOperator::PreIncrement | UnaryOperator::PostIncrement => {
        self.bump(&u.operand.node, scope, 1)
      }
      UnaryOperator::PreDecrement | UnaryOperator::PostDecrement => {
        self.bump(&u.operand.node, scope, -1)
      }
      UnaryOperator::Indirection => Ok(Range::full(&mut self.iv)),
      _ => Ok(Range::full(&mut self.iv)),
    }
  }

  fn bump(&mut self, target: &Expression, scope: ScopeId, delta: i64) -> Result<Range> {
    let before = self.eval(target, scope)?;
    let d = self.iv.integer(delta);
    let after = Range::new(
      self.iv.evaluate(&self.iv.add(before.lower.clone(), d.clone())),
      self.iv.evaluate(&self.iv.add(before.upper.clone(), d.clone())),
    );
    if let Some(sym) = self.as_symbol(target, scope) {
      self.ranges.set(sym, after.clone());
    }
    Ok(after)
  }

  fn eval_binary(&mut self, b: &BinaryOperatorExpression, scope: ScopeId) -> Result<Range> {
    match b.operator.node {
      BinaryOperator::Assign => {
        let value = self.eval(&b.rhs.node, scope)?;
        if let Some(sym) = self.as_symbol(&b.lhs.node, scope) {
          self.ranges.set(sym, value.clone());
        } else {
          self.note_index_write(&b.lhs.node, scope);
        }
        Ok(value)
      }
      op if compound_base(op).is_some() => {
        let base = compound_base(op).unwrap();
        let lhs = self.eval(&b.lhs.node, scope)?;
        let rhs = self.eval(&b.rhs.node, scope)?;
        let result = self.apply_arith(base, &lhs, &rhs);
        if let Some(sym) = self.as_symbol(&b.lhs.node, scope) {
          self.ranges.set(sym, result.clone());
        }
        Ok(result)
      }
      BinaryOperator::Index => {
        self.note_array_access(b, scope);
        Ok(Range::full(&mut self.iv))
      }
      BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => {
        self.eval(&b.lhs.node, scope)?;
        self.eval(&b.rhs.node, scope)?;
        Ok(Range::new(self.iv.integer(0), self.iv.integer(1)))
      }
      BinaryOperator::Less | BinaryOperator::LessOrEqual | BinaryOperator::Greater
      | BinaryOperator::GreaterOrEqual | BinaryOperator::Equals | BinaryOperator::NotEquals => {
        self.eval(&b.lhs.node, scope)?;
        self.eval(&b.rhs.node, scope)?;
        Ok(Range::new(self.iv.integer(0), self.iv.integer(1)))
      }
      _ => {
        let lhs = self.eval(&b.lhs.node, scope)?;
        let rhs = self.eval(&b.rhs.node, scope)?;
        Ok(self.apply_arith(b.operator.node, &lhs, &rhs))
      }
    }
  }

  fn apply_arith(&mut self, op: BinaryOperator, lhs: &Range, rhs: &Range) -> Range {
    match op {
      BinaryOperator::Plus => lhs.add(&mut self.iv, rhs),
      BinaryOperator::Minus => lhs.sub(&mut self.iv, rhs),
      BinaryOperator::Multiply => lhs.mul(&mut self.iv, rhs),
      BinaryOperator::Divide if rhs.as_const_nonzero().is_some() => {
        // Division only narrows cleanly for a known nonzero constant
        // divisor; otherwise fall back to the conservative full range.
        let d = rhs.as_const_nonzero().unwrap();
        let lo = lhs.lower.as_integer().map(|v| v / d);
        let hi = lhs.upper.as_integer().map(|v| v / d);
        match (lo, hi) {
          (Some(a), Some(b)) => Range::new(self.iv.integer(a.min(b)), self.iv.integer(a.max(b))),
          _ => Range::full(&mut self.iv),
        }
      }
      _ => Range::full(&mut self.iv),
    }
  }

  /// Record every index of a (possibly multi-dimensional) access
  /// `a[i][j]...`: walks from the outermost `Index` down to the base
  /// identifier collecting one range per `[...]`, then records them against
  /// the base symbol in declaration order (dimension 0 = the leftmost,
  /// innermost index, matching [`ArrayInfo::index_ranges`]'s doc).
  fn note_array_access(&mut self, outer: &BinaryOperatorExpression, scope: ScopeId) {
    let mut indices = vec![self.eval(&outer.rhs.node, scope).unwrap_or_else(|_| Range::full(&mut self.iv))];
    let mut cur = &outer.lhs.node;
    while let Expression::BinaryOperator(inner) = cur {
      if inner.node.operator.node != BinaryOperator::Index { break; }
      indices.push(self.eval(&inner.node.rhs.node, scope).unwrap_or_else(|_| Range::full(&mut self.iv)));
      cur = &inner.node.lhs.node;
    }
    let Expression::Identifier(id) = cur else { return };
    let Some(sym) = self.table.lookup(&id.name, scope) else { return };
    indices.reverse();
    for (dim, idx) in indices.iter().enumerate() {
      let entry = self.arrays.entry(sym).or_default();
      entry.record_access(&mut self.iv, dim, idx);
    }
  }

  fn note_index_write(&mut self, lhs: &Expression, scope: ScopeId) {
    if let Expression::BinaryOperator(inner) = lhs {
      if inner.node.operator.node == BinaryOperator::Index {
        self.note_array_access(&inner.node, scope);
      }
    }
  }
}

impl Range {
  fn as_const_nonzero(&self) -> Option<i64> {
    match (self.lower.as_integer(), self.upper.as_integer()) {
      (Some(a), Some(b)) if a == b && a != 0 => Some(a),
      _ => None,
    }
  }
}

fn compound_base(op: BinaryOperator) -> Option<BinaryOperator> {
  match op {
    BinaryOperator::AssignPlus => Some(BinaryOperator::Plus),
    BinaryOperator::AssignMinus => Some(BinaryOperator::Minus),
    BinaryOperator::AssignMultiply => Some(BinaryOperator::Multiply),
    BinaryOperator::AssignDivide => Some(BinaryOperator::Divide),
    _ => None,
  }
}

fn mirror_operator(op: BinaryOperator) -> Option<BinaryOperator> {
  match op {
    BinaryOperator::Less => Some(BinaryOperator::Greater),
    BinaryOperator::LessOrEqual => Some(BinaryOperator::GreaterOrEqual),
    BinaryOperator::Greater => Some(BinaryOperator::Less),
    BinaryOperator::GreaterOrEqual => Some(BinaryOperator::LessOrEqual),
    BinaryOperator::Equals => Some(BinaryOperator::Equals),
    BinaryOperator::NotEquals => Some(BinaryOperator::NotEquals),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::{TypeTag, GLOBAL_SCOPE};

  fn parse_function(src: &str) -> (SymbolTable, lang_c::ast::FunctionDefinition, ScopeId, SymbolId) {
    use lang_c::driver::{parse_preprocessed, Config};
    let config = Config::default();
    let tu = parse_preprocessed(&config, src.to_string()).expect("parse").unit;
    let bound = crate::binder::bind(&tu);
    let func = bound.functions.into_iter().next().expect("one function");
    let table = bound.table;
    let def = tu.0.into_iter().find_map(|ext| match ext.node {
      lang_c::ast::ExternalDeclaration::FunctionDefinition(d) => Some(d.node),
      _ => None,
    }).expect("function definition");
    let param = func.params[0];
    (table, def, func.scope, param)
  }

  #[test]
  fn parameter_narrows_after_if_guard() {
    let src = "int f(int n) { if (n < 0) { n = 0; } return n; }".to_string();
    let (table, def, scope, n) = parse_function(&src);
    let mut ra = RangeAnalysis::new(&table, AnalysisOptions::default());
    ra.seed_param(n);
    ra.analyze_body(&def.statement.node, scope).unwrap();
    let r = ra.range_of(n);
    assert_eq!(r.lower.as_integer(), Some(0));
  }

  #[test]
  fn array_index_marks_pointer_as_array() {
    let src = "int f(int *a, int i) { return a[i]; }".to_string();
    let (table, def, scope, a) = parse_function(&src);
    assert_eq!(table.tag(a), TypeTag::Pointer);
    let mut ra = RangeAnalysis::new(&table, AnalysisOptions::default());
    for p in [a] { ra.seed_param(p); }
    ra.analyze_body(&def.statement.node, scope).unwrap();
    assert!(ra.array_info(a).map(|info| info.pointer_is_array).unwrap_or(false));
  }
}
