//! Classifies each parameter's *dependent type* (spec §4.3): the shape the
//! harness must generate a value as. Grounded on
//! `original_source/DependentTypesGenerator.{h,cpp}`'s per-symbol
//! classification, iterating in a stable, sorted order so repeated runs
//! emit byte-identical harnesses (determinism is not asserted by the
//! original but is a reasonable ambient property for generated code).

use std::collections::HashMap;

use crate::range::Range;
use crate::range_analysis::RangeAnalysis;
use crate::symbol::{SymbolId, SymbolTable, TypeTag};
use crate::type_name::strip_pointer_markers;

/// What kind of value a parameter needs at the call site (§4.3).
#[derive(Debug, Clone)]
pub enum DependentType {
  /// A scalar whose range collapsed to a single value.
  Const { base_type: String, value: i64 },
  /// A scalar that varies within `[lower, upper]`.
  Range { base_type: String, range: Range },
  /// A pointer used as an array somewhere in the body; `element_type` is
  /// the base type with pointer markers stripped (§4.4).
  Vector { element_type: String, dims: Vec<Range> },
  /// Anything this analysis does not model precisely (structs, function
  /// pointers, `...`): the harness falls back to a zero-initialized value
  /// of the spelled type.
  BuiltIn { spelled_type: String },
}

pub struct TypedParam {
  pub symbol: SymbolId,
  pub name: String,
  pub ty: DependentType,
}

/// Classify every parameter of one function, sorted by name for
/// deterministic emission order. `sizes` is the dependence graph's
/// bottom-up minimum-dimension-size result (§4.5); when an array symbol
/// has no entry there (never indexed, only ever passed through) its raw
/// accumulated index ranges are used instead.
pub fn classify_params(
  table: &SymbolTable,
  ra: &RangeAnalysis,
  params: &[SymbolId],
  sizes: &HashMap<SymbolId, Vec<Range>>,
) -> Vec<TypedParam> {
  let mut out: Vec<TypedParam> = params.iter().map(|&sym| {
    let name = table.name(sym).to_string();
    let ty = classify_one(table, ra, sym, sizes);
    TypedParam { symbol: sym, name, ty }
  }).collect();
  out.sort_by(|a, b| a.name.cmp(&b.name));
  out
}

fn classify_one(table: &SymbolTable, ra: &RangeAnalysis, sym: SymbolId, sizes: &HashMap<SymbolId, Vec<Range>>) -> DependentType {
  let data = table.data(sym);
  let base_type = strip_pointer_markers(&data.spelled_type);

  match data.tag {
    TypeTag::Pointer | TypeTag::Array => {
      if let Some(info) = ra.array_info(sym) {
        if info.pointer_is_array {
          let dims = sizes.get(&sym).cloned().unwrap_or_else(|| info.index_ranges.clone());
          return DependentType::Vector { element_type: base_type, dims };
        }
      }
      DependentType::BuiltIn { spelled_type: data.spelled_type.clone() }
    }
    TypeTag::Function => DependentType::BuiltIn { spelled_type: data.spelled_type.clone() },
    TypeTag::Scalar => {
      let range = ra.range_of(sym);
      match (range.lower.as_integer(), range.upper.as_integer()) {
        (Some(l), Some(u)) if l == u => DependentType::Const { base_type, value: l },
        // An unresolved `±∞` endpoint is left as-is; harness emission
        // (§4.4, §6) clamps it to the configured array-size bound.
        _ => DependentType::Range { base_type, range },
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AnalysisOptions;

  #[test]
  fn unseeded_scalar_param_stays_an_unbounded_range() {
    let mut table = SymbolTable::new();
    let sym = table.declare("n", crate::symbol::GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let mut ra = RangeAnalysis::new(&table, AnalysisOptions::default());
    ra.seed_param(sym);
    let params = classify_params(&table, &ra, &[sym], &HashMap::new());
    assert_eq!(params.len(), 1);
    assert!(matches!(params[0].ty, DependentType::Range { .. }));
  }

  #[test]
  fn sorted_by_name_for_determinism() {
    let mut table = SymbolTable::new();
    let b = table.declare("b", crate::symbol::GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let a = table.declare("a", crate::symbol::GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let mut ra = RangeAnalysis::new(&table, AnalysisOptions::default());
    ra.seed_param(b);
    ra.seed_param(a);
    let params = classify_params(&table, &ra, &[b, a], &HashMap::new());
    assert_eq!(params[0].name, "a");
    assert_eq!(params[1].name, "b");
  }
}
