//! Minimal scope/symbol resolution over a parsed `lang_c` translation unit.
//!
//! `lang_c` only parses; it has no binder of its own. This plays the role
//! spec §6 assigns to "a pre-existing front-end collaborator" that supplies
//! symbols with type info and a scope chain. Scoping is deliberately
//! flattened to two levels — global and per-function — rather than full C
//! block scoping: every local declared anywhere in a function body (however
//! deeply nested in `if`/`while`/`for`/compound statements) is declared into
//! that function's single scope. Harness-target functions are simple test
//! bodies without block-local shadowing, and spec §3's `Symbol` contract
//! ("an enclosing scope") does not require block granularity — see
//! DESIGN.md for the explicit call-out of this simplification.

use lang_c::ast::{
  BlockItem, Declaration, Declarator, DeclaratorKind, DerivedDeclarator, DoWhileStatement,
  ExternalDeclaration, ForStatement, FunctionDefinition, IfStatement, Statement,
  TranslationUnit, WhileStatement,
};

use crate::symbol::{ScopeId, SymbolId, SymbolTable, TypeTag, GLOBAL_SCOPE};
use crate::type_name::spell_base_type;

/// One function definition found in the translation unit, already bound:
/// its own symbol, its function-body scope, and its parameters in order.
pub struct BoundFunction {
  pub symbol: SymbolId,
  pub name: String,
  pub scope: ScopeId,
  pub params: Vec<SymbolId>,
}

pub struct BoundProgram {
  pub table: SymbolTable,
  pub functions: Vec<BoundFunction>,
}

/// Bind every global and function in `tu`, declaring symbols eagerly so
/// that later passes (`RangeAnalysis`, `FunctionGenerator`) can resolve
/// identifiers purely by `SymbolTable::lookup(name, scope)`.
pub fn bind(tu: &TranslationUnit) -> BoundProgram {
  let mut table = SymbolTable::new();
  let mut functions = Vec::new();

  for ext in &tu.0 {
    match &ext.node {
      ExternalDeclaration::Declaration(decl) => {
        declare_all(&mut table, &decl.node, GLOBAL_SCOPE);
      }
      ExternalDeclaration::FunctionDefinition(def) => {
        if let Some(bound) = bind_function(&mut table, &def.node) {
          functions.push(bound);
        }
      }
      ExternalDeclaration::StaticAssert(_) => {}
    }
  }

  BoundProgram { table, functions }
}

fn bind_function(table: &mut SymbolTable, def: &FunctionDefinition) -> Option<BoundFunction> {
  let name = declarator_name(&def.declarator.node)?;
  let base_type = spell_base_type(&def.specifiers);
  let symbol = table.declare(&name, GLOBAL_SCOPE, TypeTag::Function, base_type, 0);
  let scope = table.new_scope(Some(GLOBAL_SCOPE));

  let mut params = Vec::new();
  for derived in &def.declarator.node.derived {
    if let DerivedDeclarator::Function(fd) = &derived.node {
      for param in &fd.node.parameters {
        if let Some(decl) = &param.node.declarator {
          if let Some(pname) = declarator_name(&decl.node) {
            let base = spell_base_type(&param.node.specifiers);
            let depth = pointer_depth(&decl.node);
            let tag = classify(&decl.node, depth);
            let sym = table.declare(&pname, scope, tag, base, depth);
            params.push(sym);
          }
        }
      }
    }
  }

  declare_locals_stmt(table, &def.statement.node, scope);

  Some(BoundFunction { symbol, name, scope, params })
}

fn declare_all(table: &mut SymbolTable, decl: &Declaration, scope: ScopeId) {
  let base = spell_base_type(&decl.specifiers);
  for init in &decl.declarators {
    let d = &init.node.declarator.node;
    if let Some(name) = declarator_name(d) {
      let depth = pointer_depth(d);
      let tag = classify(d, depth);
      table.declare(&name, scope, tag, base.clone(), depth);
    }
  }
}

fn declare_locals_block_item(table: &mut SymbolTable, item: &BlockItem, scope: ScopeId) {
  match item {
    BlockItem::Declaration(decl) => declare_all(table, &decl.node, scope),
    BlockItem::Statement(stmt) => declare_locals_stmt(table, &stmt.node, scope),
    BlockItem::StaticAssert(_) => {}
  }
}

fn declare_locals_stmt(table: &mut SymbolTable, stmt: &Statement, scope: ScopeId) {
  match stmt {
    Statement::Compound(items) => {
      for item in items {
        declare_locals_block_item(table, &item.node, scope);
      }
    }
    Statement::If(inner) => declare_locals_if(table, &inner.node, scope),
    Statement::While(inner) => declare_locals_while(table, &inner.node, scope),
    Statement::DoWhile(inner) => declare_locals_dowhile(table, &inner.node, scope),
    Statement::For(inner) => declare_locals_for(table, &inner.node, scope),
    Statement::Labeled(inner) => declare_locals_stmt(table, &inner.node.statement.node, scope),
    _ => {}
  }
}

fn declare_locals_if(table: &mut SymbolTable, s: &IfStatement, scope: ScopeId) {
  declare_locals_stmt(table, &s.then_statement.node, scope);
  if let Some(els) = &s.else_statement {
    declare_locals_stmt(table, &els.node, scope);
  }
}

fn declare_locals_while(table: &mut SymbolTable, s: &WhileStatement, scope: ScopeId) {
  declare_locals_stmt(table, &s.statement.node, scope);
}

fn declare_locals_dowhile(table: &mut SymbolTable, s: &DoWhileStatement, scope: ScopeId) {
  declare_locals_stmt(table, &s.statement.node, scope);
}

fn declare_locals_for(table: &mut SymbolTable, s: &ForStatement, scope: ScopeId) {
  use lang_c::ast::ForInitializer;
  if let ForInitializer::Declaration(decl) = &s.initializer.node {
    declare_all(table, &decl.node, scope);
  }
  declare_locals_stmt(table, &s.statement.node, scope);
}

pub fn declarator_name(d: &Declarator) -> Option<String> {
  match &d.kind.node {
    DeclaratorKind::Identifier(id) => Some(id.node.name.clone()),
    DeclaratorKind::Declarator(inner) => declarator_name(&inner.node),
    DeclaratorKind::Abstract => None,
  }
}

/// Count leading `*` levels on a declarator (pointer-ness), ignoring
/// array/function derivation. Good enough for the scalar/pointer/array/
/// function classification spec §3 asks for.
pub fn pointer_depth(d: &Declarator) -> u32 {
  d.derived.iter().filter(|der| matches!(der.node, DerivedDeclarator::Pointer(_))).count() as u32
}

fn classify(d: &Declarator, depth: u32) -> TypeTag {
  let has_function = d.derived.iter().any(|der| {
    matches!(der.node, DerivedDeclarator::Function(_) | DerivedDeclarator::KRFunction(_))
  });
  let has_array = d.derived.iter().any(|der| matches!(der.node, DerivedDeclarator::Array(_)));
  if has_function {
    TypeTag::Function
  } else if has_array {
    TypeTag::Array
  } else if depth > 0 {
    TypeTag::Pointer
  } else {
    TypeTag::Scalar
  }
}
