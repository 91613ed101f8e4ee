//! The abstract-value algebra (spec §3, §4.1): integers, symbols, and n-ary
//! arithmetic expressions over them, with evaluation and simplification.
//!
//! Per the rewrite's §9 design note, nodes are interned by canonical form in
//! an [`AvInterner`] rather than cloned aggressively the way the C++
//! original's `AbstractValue::clone()` does; once simplified, structurally
//! equal values share the same handle and compare by pointer.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::symbol::SymbolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
  Add,
  Sub,
  Mul,
  Div,
  Shl,
  Shr,
  Min,
  Max,
}

impl Op {
  /// Whether repeated application should flatten (`Add`/`Mul` are
  /// associative in the fragment we evaluate; the others are kept binary).
  fn flattens(self) -> bool {
    matches!(self, Op::Add | Op::Mul)
  }

  fn identity(self) -> Option<i64> {
    match self {
      Op::Add | Op::Sub => Some(0),
      Op::Mul | Op::Div => Some(1),
      _ => None,
    }
  }
}

/// The structural shape of a value. Interned by [`AvInterner`]; use [`Av`]
/// (the interned handle) everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AvKind {
  Integer(i64),
  Symbol(SymbolId),
  NAry(Op, SmallVec<[Av; 4]>),
  Empty,
}

/// An interned [`AvKind`]. Cheap to clone (`Rc` bump); after going through
/// [`AvInterner::intern`], two structurally-equal values are the same `Av`
/// and compare by pointer.
#[derive(Debug, Clone)]
pub struct Av(pub(crate) Rc<AvKind>);

impl PartialEq for Av {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
  }
}
impl Eq for Av {}

impl std::hash::Hash for Av {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.0.hash(state);
  }
}

/// Canonical ordering used to sort `NAry` terms (§4.1 "sorts terms
/// canonically"): by kind first (Integer < Symbol < NAry < Empty), then by
/// value within a kind. Gives simplify() a deterministic output regardless
/// of the order terms arrived in.
impl PartialOrd for Av {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for Av {
  fn cmp(&self, other: &Self) -> Ordering {
    fn rank(k: &AvKind) -> u8 {
      match k { AvKind::Integer(_) => 0, AvKind::Symbol(_) => 1, AvKind::NAry(..) => 2, AvKind::Empty => 3 }
    }
    match rank(&self.0).cmp(&rank(&other.0)) {
      Ordering::Equal => match (&*self.0, &*other.0) {
        (AvKind::Integer(a), AvKind::Integer(b)) => a.cmp(b),
        (AvKind::Symbol(a), AvKind::Symbol(b)) => a.cmp(b),
        (AvKind::NAry(oa, ta), AvKind::NAry(ob, tb)) => oa.cmp(ob).then_with(|| ta.iter().cmp(tb.iter())),
        _ => Ordering::Equal,
      },
      other => other,
    }
  }
}

impl fmt::Display for Av {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &*self.0 {
      AvKind::Integer(i) => write!(f, "{i}"),
      AvKind::Symbol(s) => write!(f, "{s}"),
      AvKind::Empty => write!(f, "<empty>"),
      AvKind::NAry(op, terms) => {
        let sym = match op {
          Op::Add => "+", Op::Sub => "-", Op::Mul => "*", Op::Div => "/",
          Op::Shl => "<<", Op::Shr => ">>", Op::Min => "min", Op::Max => "max",
        };
        write!(f, "(")?;
        for (i, t) in terms.iter().enumerate() {
          if i > 0 { write!(f, " {sym} ")?; }
          write!(f, "{t}")?;
        }
        write!(f, ")")
      }
    }
  }
}

impl Av {
  pub fn is_empty(&self) -> bool { matches!(&*self.0, AvKind::Empty) }
  pub fn is_integer(&self) -> bool { matches!(&*self.0, AvKind::Integer(_)) }
  pub fn is_symbol(&self) -> bool { matches!(&*self.0, AvKind::Symbol(_)) }
  pub fn is_nary(&self) -> bool { matches!(&*self.0, AvKind::NAry(..)) }

  pub fn as_integer(&self) -> Option<i64> {
    match &*self.0 { AvKind::Integer(i) => Some(*i), _ => None }
  }

  pub fn as_symbol(&self) -> Option<SymbolId> {
    match &*self.0 { AvKind::Symbol(s) => Some(*s), _ => None }
  }

  pub fn as_nary(&self) -> Option<(Op, &[Av])> {
    match &*self.0 { AvKind::NAry(op, terms) => Some((*op, terms)), _ => None }
  }

  /// Symbols referenced anywhere in this expression tree (`symbolDep()`).
  pub fn symbol_dep(&self) -> BTreeSet<SymbolId> {
    let mut out = BTreeSet::new();
    self.symbol_dep_into(&mut out);
    out
  }

  fn symbol_dep_into(&self, out: &mut BTreeSet<SymbolId>) {
    match &*self.0 {
      AvKind::Symbol(s) => { out.insert(*s); }
      AvKind::NAry(_, terms) => for t in terms { t.symbol_dep_into(out); },
      AvKind::Integer(_) | AvKind::Empty => {}
    }
  }
}

/// Owns the canonical-form cache. All [`Av`] construction goes through here
/// so that simplification and equality checks operate on interned handles.
#[derive(Default)]
pub struct AvInterner {
  cache: HashMap<AvKind, Av>,
}

impl AvInterner {
  pub fn new() -> Self { AvInterner::default() }

  pub fn intern(&mut self, kind: AvKind) -> Av {
    if let Some(av) = self.cache.get(&kind) {
      return av.clone();
    }
    let av = Av(Rc::new(kind.clone()));
    self.cache.insert(kind, av.clone());
    av
  }

  pub fn integer(&mut self, i: i64) -> Av { self.intern(AvKind::Integer(i)) }
  pub fn symbol(&mut self, s: SymbolId) -> Av { self.intern(AvKind::Symbol(s)) }
  pub fn empty(&mut self) -> Av { self.intern(AvKind::Empty) }

  pub fn nary(&mut self, op: Op, terms: SmallVec<[Av; 4]>) -> Av {
    self.intern(AvKind::NAry(op, terms))
  }

  pub fn binary(&mut self, op: Op, a: Av, b: Av) -> Av {
    let mut terms = SmallVec::new();
    terms.push(a);
    terms.push(b);
    self.nary(op, terms)
  }

  pub fn add(&mut self, a: Av, b: Av) -> Av { self.binary(Op::Add, a, b) }
  pub fn sub(&mut self, a: Av, b: Av) -> Av { self.binary(Op::Sub, a, b) }
  pub fn mul(&mut self, a: Av, b: Av) -> Av { self.binary(Op::Mul, a, b) }
  pub fn div(&mut self, a: Av, b: Av) -> Av { self.binary(Op::Div, a, b) }
  pub fn shl(&mut self, a: Av, b: Av) -> Av { self.binary(Op::Shl, a, b) }
  pub fn shr(&mut self, a: Av, b: Av) -> Av { self.binary(Op::Shr, a, b) }
  pub fn min(&mut self, a: Av, b: Av) -> Av { self.binary(Op::Min, a, b) }
  pub fn max(&mut self, a: Av, b: Av) -> Av { self.binary(Op::Max, a, b) }
  pub fn neg(&mut self, a: Av) -> Av {
    let zero = self.integer(0);
    self.sub(zero, a)
  }

  /// Reduce constant subtrees. Integer division by zero and shifts by a
  /// non-integer term surface [`AvKind::Empty`] (§4.1 "Failure").
  pub fn evaluate(&mut self, v: &Av) -> Av {
    match &*v.0 {
      AvKind::Integer(_) | AvKind::Symbol(_) | AvKind::Empty => v.clone(),
      AvKind::NAry(op, terms) => {
        let terms: SmallVec<[Av; 4]> = terms.iter().map(|t| self.evaluate(t)).collect();
        if terms.iter().any(|t| t.is_empty()) {
          return self.empty();
        }
        // If every term is a literal integer, fold.
        if terms.iter().all(|t| t.is_integer()) {
          if let Some(folded) = fold_integers(*op, &terms) {
            return self.integer(folded);
          }
          return self.empty();
        }
        self.simplify_kind(*op, terms)
      }
    }
  }

  /// Distribute `Mul` over `Add`/`Sub` (§4.1 "develop is required before any
  /// collect-like-terms pass").
  pub fn develop(&mut self, v: &Av) -> Av {
    match &*v.0 {
      AvKind::Integer(_) | AvKind::Symbol(_) | AvKind::Empty => v.clone(),
      AvKind::NAry(Op::Mul, terms) if terms.len() == 2 => {
        let l = self.develop(&terms[0]);
        let r = self.develop(&terms[1]);
        if let Some((add_like, add_terms)) = add_like(&r) {
          let developed: SmallVec<[Av; 4]> = add_terms.iter().map(|t| {
            let prod = self.mul(l.clone(), t.clone());
            self.develop(&prod)
          }).collect();
          self.nary(add_like, developed)
        } else if let Some((add_like, add_terms)) = add_like(&l) {
          let developed: SmallVec<[Av; 4]> = add_terms.iter().map(|t| {
            let prod = self.mul(t.clone(), r.clone());
            self.develop(&prod)
          }).collect();
          self.nary(add_like, developed)
        } else {
          self.mul(l, r)
        }
      }
      AvKind::NAry(op, terms) => {
        let developed: SmallVec<[Av; 4]> = terms.iter().map(|t| self.develop(t)).collect();
        self.nary(*op, developed)
      }
    }
  }

  /// Flatten same-op nests, fold identities, sort terms canonically (§4.1).
  /// Idempotent (property 3, §8).
  pub fn simplify(&mut self, v: &Av) -> Av {
    match &*v.0 {
      AvKind::Integer(_) | AvKind::Symbol(_) | AvKind::Empty => v.clone(),
      AvKind::NAry(op, terms) => {
        let simplified: SmallVec<[Av; 4]> = terms.iter().map(|t| self.simplify(t)).collect();
        self.simplify_kind(*op, simplified)
      }
    }
  }

  fn simplify_kind(&mut self, op: Op, terms: SmallVec<[Av; 4]>) -> Av {
    // Flatten nested same-op applications for associative ops.
    let mut flat: SmallVec<[Av; 4]> = SmallVec::new();
    for t in terms {
      if op.flattens() {
        if let AvKind::NAry(inner_op, inner_terms) = &*t.0 {
          if *inner_op == op {
            flat.extend(inner_terms.iter().cloned());
            continue;
          }
        }
      }
      flat.push(t);
    }

    // Fold the identity element out (0 for Add/Sub, 1 for Mul/Div), unless
    // doing so would empty the term list.
    if let Some(identity) = op.identity() {
      let kept: SmallVec<[Av; 4]> = flat.iter().cloned()
        .filter(|t| t.as_integer() != Some(identity))
        .collect();
      if !kept.is_empty() {
        flat = kept;
      } else {
        return self.integer(identity);
      }
    }

    // x * 0 = 0 for any surviving terms.
    if op == Op::Mul && flat.iter().any(|t| t.as_integer() == Some(0)) {
      return self.integer(0);
    }

    // min(a,a) = a, max(a,a) = a.
    if matches!(op, Op::Min | Op::Max) && flat.len() == 2 && flat[0] == flat[1] {
      return flat[0].clone();
    }

    if flat.len() == 1 && op.flattens() {
      return flat[0].clone();
    }

    flat.sort();
    self.nary(op, flat)
  }
}

fn add_like(v: &Av) -> Option<(Op, SmallVec<[Av; 4]>)> {
  match &*v.0 {
    AvKind::NAry(op @ (Op::Add | Op::Sub), terms) => Some((*op, terms.clone())),
    _ => None,
  }
}

fn fold_integers(op: Op, terms: &[Av]) -> Option<i64> {
  let ints: Vec<i64> = terms.iter().map(|t| t.as_integer()).collect::<Option<_>>()?;
  match op {
    Op::Add => Some(ints.iter().sum()),
    Op::Sub => {
      let mut it = ints.iter();
      let first = *it.next()?;
      Some(it.fold(first, |acc, v| acc - v))
    }
    Op::Mul => Some(ints.iter().product()),
    Op::Div => {
      let mut it = ints.iter();
      let first = *it.next()?;
      it.try_fold(first, |acc, v| if *v == 0 { None } else { Some(acc / v) })
    }
    Op::Shl => {
      if ints.len() != 2 || ints[1] < 0 || ints[1] >= 64 { return None; }
      Some(ints[0] << ints[1])
    }
    Op::Shr => {
      if ints.len() != 2 || ints[1] < 0 || ints[1] >= 64 { return None; }
      Some(ints[0] >> ints[1])
    }
    Op::Min => ints.iter().copied().min(),
    Op::Max => ints.iter().copied().max(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sym(n: u32) -> SymbolId { SymbolId(n) }

  #[test]
  fn add_is_commutative_and_associative_after_evaluate() {
    let mut iv = AvInterner::new();
    let x = iv.symbol(sym(0));
    let y = iv.symbol(sym(1));
    let xy = iv.add(x.clone(), y.clone());
    let yx = iv.add(y.clone(), x.clone());
    assert_eq!(iv.evaluate(&iv.simplify(&xy)), iv.evaluate(&iv.simplify(&yx)));

    let z = iv.symbol(sym(2));
    let xy_z = iv.add(xy.clone(), z.clone());
    let x_yz = iv.add(x.clone(), iv.add(y.clone(), z.clone()));
    let a = iv.simplify(&iv.evaluate(&xy_z));
    let b = iv.simplify(&iv.evaluate(&x_yz));
    assert_eq!(a, b);
  }

  #[test]
  fn develop_distributes_multiplication() {
    let mut iv = AvInterner::new();
    let x = iv.symbol(sym(0));
    let y = iv.symbol(sym(1));
    let z = iv.symbol(sym(2));
    let y_plus_z = iv.add(y, z);
    let lhs = iv.mul(x.clone(), y_plus_z);
    let developed = iv.develop(&lhs);
    // x*(y+z) should become x*y + x*z, not stay a bare Mul node.
    assert!(matches!(&*developed.0, AvKind::NAry(Op::Add, ts) if ts.len() == 2));
  }

  #[test]
  fn simplify_is_idempotent() {
    let mut iv = AvInterner::new();
    let x = iv.symbol(sym(0));
    let zero = iv.integer(0);
    let expr = iv.add(x.clone(), zero);
    let once = iv.simplify(&expr);
    let twice = iv.simplify(&once);
    assert_eq!(once, twice);
    assert_eq!(once, x);
  }

  #[test]
  fn identities_fold() {
    let mut iv = AvInterner::new();
    let x = iv.symbol(sym(0));
    let one = iv.integer(1);
    let zero = iv.integer(0);

    let x_times_one = iv.mul(x.clone(), one);
    assert_eq!(iv.simplify(&x_times_one), x);

    let x_times_zero = iv.mul(x.clone(), zero.clone());
    assert_eq!(iv.simplify(&x_times_zero), zero);

    let min_aa = iv.min(x.clone(), x.clone());
    assert_eq!(iv.simplify(&min_aa), x);
  }

  #[test]
  fn division_by_zero_is_empty() {
    let mut iv = AvInterner::new();
    let ten = iv.integer(10);
    let zero = iv.integer(0);
    let div = iv.div(ten, zero);
    assert!(iv.evaluate(&div).is_empty());
  }

  #[test]
  fn symbol_dep_collects_all_referenced_symbols() {
    let mut iv = AvInterner::new();
    let x = iv.symbol(sym(0));
    let y = iv.symbol(sym(1));
    let expr = iv.add(iv.mul(x.clone(), y.clone()), iv.integer(3));
    let deps = expr.symbol_dep();
    assert!(deps.contains(&sym(0)));
    assert!(deps.contains(&sym(1)));
    assert_eq!(deps.len(), 2);
  }
}
