//! Stable identities for named C entities.
//!
//! `lang_c` only parses; it does not resolve identifiers to declarations.
//! This module plays the role of the "pre-existing front-end collaborator"
//! that spec §6 otherwise treats as external: a minimal scope/symbol binder
//! over the parsed AST, modeled on `mmcc`'s `Symbol`/`Interner` pair
//! (`types/entity.rs`).

use std::fmt;
use hashbrown::HashMap;

/// What kind of entity a [`Symbol`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
  Scalar,
  Pointer,
  Array,
  Function,
}

/// Opaque stable identity for a named entity, unique within one analyzed
/// translation unit. Indexes into [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Identity for a lexical scope (function body, block, or the global scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

pub const GLOBAL_SCOPE: ScopeId = ScopeId(0);

#[derive(Debug, Clone)]
pub struct SymbolData {
  pub name: String,
  pub scope: ScopeId,
  pub tag: TypeTag,
  /// Spelled C type, e.g. `"int"`, `"int *"`. Stripped of `*` on use by
  /// [`crate::type_name`] when building dependent types.
  pub spelled_type: String,
  /// Number of derived pointer/array levels, used to tell `int*` (array
  /// candidate) apart from `int` at a glance.
  pub pointer_depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScopeData {
  parent: Option<ScopeId>,
}

/// Owns every [`Symbol`] and [`ScopeId`] discovered while binding one
/// translation unit. Symbols never alias: `SymbolTable::declare` always
/// returns a fresh id even when two scopes shadow the same name.
#[derive(Debug, Default)]
pub struct SymbolTable {
  symbols: Vec<SymbolData>,
  scopes: Vec<ScopeData>,
  // name -> stack of (scope, symbol) to support shadowing during lookup.
  by_name: HashMap<String, Vec<(ScopeId, SymbolId)>>,
}

impl SymbolTable {
  pub fn new() -> Self {
    let mut table = SymbolTable { symbols: Vec::new(), scopes: Vec::new(), by_name: HashMap::new() };
    let global = table.new_scope(None);
    debug_assert_eq!(global, GLOBAL_SCOPE);
    table
  }

  pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
    let id = ScopeId(self.scopes.len() as u32);
    self.scopes.push(ScopeData { parent });
    id
  }

  pub fn declare(&mut self, name: &str, scope: ScopeId, tag: TypeTag, spelled_type: String, pointer_depth: u32) -> SymbolId {
    let id = SymbolId(self.symbols.len() as u32);
    self.symbols.push(SymbolData { name: name.to_string(), scope, tag, spelled_type, pointer_depth });
    self.by_name.entry(name.to_string()).or_default().push((scope, id));
    id
  }

  /// Resolve a simple identifier starting from `scope`, walking up the
  /// enclosing-scope chain. Matches spec §7's assertion that, for
  /// well-formed code, symbol lookup from range analysis must succeed.
  pub fn lookup(&self, name: &str, scope: ScopeId) -> Option<SymbolId> {
    let candidates = self.by_name.get(name)?;
    let mut cur = Some(scope);
    while let Some(s) = cur {
      if let Some((_, sym)) = candidates.iter().rev().find(|(cs, _)| *cs == s) {
        return Some(*sym);
      }
      cur = self.scopes[s.0 as usize].parent;
    }
    None
  }

  pub fn data(&self, id: SymbolId) -> &SymbolData {
    &self.symbols[id.0 as usize]
  }

  pub fn name(&self, id: SymbolId) -> &str {
    &self.symbols[id.0 as usize].name
  }

  pub fn tag(&self, id: SymbolId) -> TypeTag {
    self.symbols[id.0 as usize].tag
  }

  pub fn is_in_scope(&self, id: SymbolId, scope: ScopeId) -> bool {
    let mut cur = Some(self.symbols[id.0 as usize].scope);
    while let Some(s) = cur {
      if s == scope { return true; }
      cur = self.scopes[s.0 as usize].parent;
    }
    false
  }

  pub fn iter(&self) -> impl Iterator<Item = SymbolId> + '_ {
    (0..self.symbols.len()).map(|i| SymbolId(i as u32))
  }
}

impl fmt::Display for SymbolId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "sym#{}", self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shadowing_resolves_to_innermost_scope() {
    let mut table = SymbolTable::new();
    let outer_x = table.declare("x", GLOBAL_SCOPE, TypeTag::Scalar, "int".into(), 0);
    let inner = table.new_scope(Some(GLOBAL_SCOPE));
    let inner_x = table.declare("x", inner, TypeTag::Scalar, "int".into(), 0);

    assert_eq!(table.lookup("x", inner), Some(inner_x));
    assert_eq!(table.lookup("x", GLOBAL_SCOPE), Some(outer_x));
  }

  #[test]
  fn unknown_name_fails_lookup() {
    let table = SymbolTable::new();
    assert_eq!(table.lookup("nope", GLOBAL_SCOPE), None);
  }
}
