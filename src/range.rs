//! Interval `[lower, upper]` over [`Av`] (spec §3, §4.2).

use crate::value::{Av, AvInterner};

/// `±∞` is represented exactly as `i64::MIN`/`i64::MAX`, matching the C++
/// original's use of `INT_MIN`/`INT_MAX` as sentinels (§4.2, §9).
pub const NEG_INF: i64 = i64::MIN;
pub const POS_INF: i64 = i64::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
  pub lower: Av,
  pub upper: Av,
}

impl Range {
  pub fn new(lower: Av, upper: Av) -> Self { Range { lower, upper } }

  pub fn constant(iv: &mut AvInterner, v: i64) -> Self {
    let av = iv.integer(v);
    Range::new(av.clone(), av)
  }

  pub fn full(iv: &mut AvInterner) -> Self {
    Range::new(iv.integer(NEG_INF), iv.integer(POS_INF))
  }

  pub fn is_const(&self) -> bool {
    self.lower == self.upper && self.lower.is_integer()
  }

  pub fn is_empty(&self) -> bool {
    self.lower.is_empty() || self.upper.is_empty()
  }

  /// `[a,b] + [c,d] = [a+c, b+d]`.
  pub fn add(&self, iv: &mut AvInterner, other: &Range) -> Range {
    let lower = iv.evaluate(&iv.add(self.lower.clone(), other.lower.clone()));
    let upper = iv.evaluate(&iv.add(self.upper.clone(), other.upper.clone()));
    Range::new(lower, upper)
  }

  /// `-[a,b] = [-b,-a]`.
  pub fn negate(&self, iv: &mut AvInterner) -> Range {
    let lower = iv.evaluate(&iv.neg(self.upper.clone()));
    let upper = iv.evaluate(&iv.neg(self.lower.clone()));
    Range::new(lower, upper)
  }

  pub fn sub(&self, iv: &mut AvInterner, other: &Range) -> Range {
    self.add(iv, &other.negate(iv))
  }

  /// `[a,b] * [c,d] = [min(ac,ad,bc,bd), max(ac,ad,bc,bd)]`. Symbolic
  /// endpoints are combined with `Min`/`Max` rather than forced to evaluate
  /// (§4.2: "do not attempt to evaluate").
  pub fn mul(&self, iv: &mut AvInterner, other: &Range) -> Range {
    let ac = iv.evaluate(&iv.mul(self.lower.clone(), other.lower.clone()));
    let ad = iv.evaluate(&iv.mul(self.lower.clone(), other.upper.clone()));
    let bc = iv.evaluate(&iv.mul(self.upper.clone(), other.lower.clone()));
    let bd = iv.evaluate(&iv.mul(self.upper.clone(), other.upper.clone()));
    let products = [ac, ad, bc, bd];
    let lower = fold_extreme(iv, &products, true);
    let upper = fold_extreme(iv, &products, false);
    Range::new(lower, upper)
  }

  /// `[min(l1,l2), max(u1,u2)]`.
  pub fn union(&self, iv: &mut AvInterner, other: &Range) -> Range {
    let lower = iv.evaluate(&iv.min(self.lower.clone(), other.lower.clone()));
    let upper = iv.evaluate(&iv.max(self.upper.clone(), other.upper.clone()));
    Range::new(lower, upper)
  }

  /// `[max(l1,l2), min(u1,u2)]`, `Empty` if provably crossed.
  pub fn intersect_with(&self, iv: &mut AvInterner, other: &Range) -> Range {
    let lower = iv.evaluate(&iv.max(self.lower.clone(), other.lower.clone()));
    let upper = iv.evaluate(&iv.min(self.upper.clone(), other.upper.clone()));
    if let (Some(l), Some(u)) = (lower.as_integer(), upper.as_integer()) {
      if l > u {
        let empty = iv.empty();
        return Range::new(empty.clone(), empty);
      }
    }
    Range::new(lower, upper)
  }

  /// Whether `self ⊆ other` — used by property 4 (§8) and as a narrowing
  /// check elsewhere. Conservative: only decides when both endpoints are
  /// literal integers; a symbolic endpoint is assumed compatible.
  pub fn subset_of(&self, other: &Range) -> bool {
    let lower_ok = match (self.lower.as_integer(), other.lower.as_integer()) {
      (Some(a), Some(b)) => a >= b,
      _ => true,
    };
    let upper_ok = match (self.upper.as_integer(), other.upper.as_integer()) {
      (Some(a), Some(b)) => a <= b,
      _ => true,
    };
    lower_ok && upper_ok
  }
}

fn fold_extreme(iv: &mut AvInterner, values: &[Av], take_min: bool) -> Av {
  let mut acc = values[0].clone();
  for v in &values[1..] {
    acc = if take_min { iv.min(acc, v.clone()) } else { iv.max(acc, v.clone()) };
    acc = iv.evaluate(&acc);
  }
  iv.simplify(&acc)
}

/// Widening accelerator (§4.2, §9): inspects the last three history entries
/// for a symbol. If the lower bound has been strictly decreasing across
/// them, widen it to `-∞`; if the upper bound has been strictly growing,
/// widen it to `+∞`.
pub fn lower_is_decreasing(history: &[Range]) -> bool {
  let tail = last_three(history);
  tail.windows(2).all(|w| match (w[0].lower.as_integer(), w[1].lower.as_integer()) {
    (Some(a), Some(b)) => b < a,
    _ => false,
  }) && tail.len() >= 2
}

pub fn upper_is_growing(history: &[Range]) -> bool {
  let tail = last_three(history);
  tail.windows(2).all(|w| match (w[0].upper.as_integer(), w[1].upper.as_integer()) {
    (Some(a), Some(b)) => b > a,
    _ => false,
  }) && tail.len() >= 2
}

fn last_three(history: &[Range]) -> &[Range] {
  let n = history.len();
  &history[n.saturating_sub(3)..]
}

/// Widen `current` relative to `previous` using the lower/upper growth
/// history. Terminates in finite steps (property 5, §8): once both bounds
/// hit `±∞` further widening is a no-op, so any strictly-growing/shrinking
/// chain reaches the fixed point `[-∞, +∞]` after at most two widenings.
pub fn widen(iv: &mut AvInterner, current: &Range, history: &[Range]) -> Range {
  let lower = if lower_is_decreasing(history) { iv.integer(NEG_INF) } else { current.lower.clone() };
  let upper = if upper_is_growing(history) { iv.integer(POS_INF) } else { current.upper.clone() };
  Range::new(lower, upper)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn union_contains_both_operands() {
    let mut iv = AvInterner::new();
    let r1 = Range::new(iv.integer(0), iv.integer(5));
    let r2 = Range::new(iv.integer(3), iv.integer(10));
    let u = r1.union(&mut iv, &r2);
    assert!(r1.subset_of(&u));
    assert!(r2.subset_of(&u));
  }

  #[test]
  fn intersection_is_subset_of_operand() {
    let mut iv = AvInterner::new();
    let r1 = Range::new(iv.integer(0), iv.integer(5));
    let r2 = Range::new(iv.integer(3), iv.integer(10));
    let i = r1.intersect_with(&mut iv, &r2);
    assert!(i.subset_of(&r1));
  }

  #[test]
  fn crossed_intersection_is_empty() {
    let mut iv = AvInterner::new();
    let r1 = Range::new(iv.integer(0), iv.integer(2));
    let r2 = Range::new(iv.integer(5), iv.integer(10));
    let i = r1.intersect_with(&mut iv, &r2);
    assert!(i.is_empty());
  }

  #[test]
  fn widening_reaches_infinity_in_finite_steps() {
    let mut iv = AvInterner::new();
    let mut history = vec![Range::new(iv.integer(0), iv.integer(0))];
    let mut current = Range::new(iv.integer(0), iv.integer(1));
    for i in 1..6 {
      history.push(current.clone());
      current = Range::new(iv.integer(0), iv.integer(i + 1));
    }
    let widened = widen(&mut iv, &current, &history);
    assert_eq!(widened.upper.as_integer(), Some(POS_INF));
  }
}
