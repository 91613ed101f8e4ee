//! Spell a C declaration's type back out as a string for harness emission
//! (spec §4.4, §6). Grounded on `original_source/TypeNameSpeller.h`'s
//! per-type-kind visitor; `*` is stripped from the result per §4.4 (pointer
//! parameters become value-typed scalars/arrays in the generated harness).

use lang_c::ast::{DeclarationSpecifier, TypeSpecifier};
use lang_c::span::Node;

/// Spell the base type named by a declaration's specifiers, ignoring any
/// derived pointer/array levels (those are handled separately by the
/// binder, which records `pointer_depth`).
pub fn spell_base_type(specifiers: &[Node<DeclarationSpecifier>]) -> String {
  let mut words: Vec<&'static str> = Vec::new();
  for spec in specifiers {
    if let DeclarationSpecifier::TypeSpecifier(ty) = &spec.node {
      if let Some(w) = spell_type_specifier(&ty.node) {
        words.push(w);
      }
    }
  }
  if words.is_empty() {
    "int".to_string() // implicit-int, matches common pre-C99 harness sources
  } else {
    words.join(" ")
  }
}

fn spell_type_specifier(ty: &TypeSpecifier) -> Option<&'static str> {
  match ty {
    TypeSpecifier::Void => Some("void"),
    TypeSpecifier::Char => Some("char"),
    TypeSpecifier::Short => Some("short"),
    TypeSpecifier::Int => Some("int"),
    TypeSpecifier::Long => Some("long"),
    TypeSpecifier::Float => Some("float"),
    TypeSpecifier::Double => Some("double"),
    TypeSpecifier::Signed => Some("signed"),
    TypeSpecifier::Unsigned => Some("unsigned"),
    TypeSpecifier::Bool => Some("_Bool"),
    // Struct/union/enum/typedef names and anything else beyond basic
    // scalars are out of scope (spec §1 Non-goals); fall back to `int` so
    // the harness still compiles, rather than failing the whole function.
    _ => None,
  }
}

/// Strip pointer markers from a spelled type, matching
/// `DependentType::DependentType`'s `baseType_.erase(remove('*'))` (§4.4).
pub fn strip_pointer_markers(spelled: &str) -> String {
  spelled.chars().filter(|c| *c != '*').collect::<String>().trim().to_string()
}

/// Render `base_type` with `pointer_depth` trailing `*`s, the form used
/// when the symbol table records a declarator's full spelling.
pub fn with_pointer_depth(base_type: &str, pointer_depth: u32) -> String {
  let mut s = base_type.to_string();
  for _ in 0..pointer_depth {
    s.push('*');
  }
  s
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_stars() {
    assert_eq!(strip_pointer_markers("int * *"), "int");
  }

  #[test]
  fn builds_pointer_spelling() {
    assert_eq!(with_pointer_depth("int", 2), "int**");
  }
}
