//! `harnessgen`: synthesizes self-contained C fuzzing harnesses for a
//! chosen function of a C translation unit, driven by range analysis,
//! dependent-type assignment, and dependence-graph constraint propagation
//! (spec §1, §2). Grounded on `original_source/Runner.cpp`'s top-level
//! per-function pipeline: parse once, then for each selected function run
//! range analysis -> dependent types -> dependence graph -> harness emit,
//! logging and skipping a function on a [`HarnessError`] rather than
//! aborting the whole run (§7).

pub mod binder;
pub mod config;
pub mod dependent_types;
pub mod diagnostic;
pub mod function_generator;
pub mod graph;
pub mod harness;
pub mod range;
pub mod range_analysis;
pub mod symbol;
pub mod type_name;
pub mod value;

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use lang_c::ast::TranslationUnit;
use lang_c::driver::{parse, parse_preprocessed, Config as ParseConfig};

use crate::binder::BoundFunction;
use crate::config::{AnalysisOptions, HarnessOptions};
use crate::diagnostic::{HarnessError, Result};
use crate::function_generator::FunctionGenerator;
use crate::harness::HarnessEmitter;
use crate::range_analysis::RangeAnalysis;

/// One function's outcome: the path to its emitted harness, or the fatal
/// error that caused it to be skipped (§7).
pub struct FunctionOutcome {
  pub function: String,
  pub result: Result<std::path::PathBuf>,
}

/// Parse `src_path` by shelling out to the system preprocessor (lang_c's
/// default), then analyze and emit a harness for every function matching
/// `target_function` (or every function, if `None`). This is what the CLI
/// uses; see [`analyze_and_emit_preprocessed`] for driving the same
/// pipeline over already-preprocessed source text.
pub fn analyze_and_emit(
  src_path: &Path,
  target_function: Option<&str>,
  analysis: &AnalysisOptions,
  harness: &HarnessOptions,
) -> Result<Vec<FunctionOutcome>> {
  let config = ParseConfig::default();
  let parsed = parse(&config, src_path).map_err(|e| HarnessError::Parse {
    path: src_path.display().to_string(),
    message: e.to_string(),
  })?;
  Ok(run_pipeline(&parsed.unit, src_path, target_function, analysis, harness))
}

/// Same pipeline as [`analyze_and_emit`], but over source text that has
/// already been preprocessed (no system preprocessor invocation) — used by
/// tests and by callers that run their own preprocessing step.
pub fn analyze_and_emit_preprocessed(
  source: &str,
  src_path: &Path,
  target_function: Option<&str>,
  analysis: &AnalysisOptions,
  harness: &HarnessOptions,
) -> Result<Vec<FunctionOutcome>> {
  let config = ParseConfig::default();
  let parsed = parse_preprocessed(&config, source.to_string()).map_err(|e| HarnessError::Parse {
    path: src_path.display().to_string(),
    message: e.to_string(),
  })?;
  Ok(run_pipeline(&parsed.unit, src_path, target_function, analysis, harness))
}

fn run_pipeline(
  unit: &TranslationUnit,
  src_path: &Path,
  target_function: Option<&str>,
  analysis: &AnalysisOptions,
  harness: &HarnessOptions,
) -> Vec<FunctionOutcome> {
  let bound = binder::bind(unit);
  let defined: HashSet<_> = bound.functions.iter().map(|f| f.symbol).collect();

  let defs_by_name: std::collections::HashMap<String, lang_c::ast::FunctionDefinition> = unit.0.iter()
    .filter_map(|ext| match &ext.node {
      lang_c::ast::ExternalDeclaration::FunctionDefinition(d) => {
        binder::declarator_name(&d.node.declarator.node).map(|name| (name, d.node.clone()))
      }
      _ => None,
    })
    .collect();

  let mut outcomes = Vec::new();
  for func in &bound.functions {
    if let Some(name) = target_function {
      if func.name != name { continue; }
    }
    let Some(def) = defs_by_name.get(&func.name) else { continue };
    let start = Instant::now();
    let result = process_function(src_path, func, def, &bound.table, &defined, analysis, harness, start);
    outcomes.push(FunctionOutcome { function: func.name.clone(), result });
  }

  if outcomes.is_empty() {
    if let Some(name) = target_function {
      log::warn!("no function named `{name}` found in {}", src_path.display());
    }
  }

  outcomes
}

fn process_function(
  src_path: &Path,
  func: &BoundFunction,
  def: &lang_c::ast::FunctionDefinition,
  table: &symbol::SymbolTable,
  defined: &HashSet<symbol::SymbolId>,
  analysis: &AnalysisOptions,
  harness: &HarnessOptions,
  start: Instant,
) -> Result<std::path::PathBuf> {
  let mut ra = RangeAnalysis::new(table, analysis.clone());
  for &p in &func.params {
    ra.seed_param(p);
  }
  ra.analyze_body(&def.statement.node, func.scope)?;

  let mut fgen = FunctionGenerator::new(table);
  fgen.build(&def.statement.node, func.scope, &func.params, &ra, defined);

  let emitter = HarnessEmitter::new(table, harness);
  if analysis.write_constraints {
    emitter.write_dot(src_path, &func.name, "init", fgen.graph())?;
  }

  let mut graph_iv = value::AvInterner::new();
  let sizes = fgen.propagate(&mut graph_iv, &func.name, &ra)?;

  if analysis.write_constraints {
    emitter.write_dot(src_path, &func.name, "bottomup", fgen.graph())?;
  }

  let stubs: Vec<String> = func_stub_declarations(&fgen);
  let params = dependent_types::classify_params(table, &ra, &func.params, &sizes);
  let out_path = emitter.emit(src_path, &func.name, &params, &stubs)?;

  if analysis.generate_csv {
    let csv_path = src_path.with_file_name("harnessgen_timings.csv");
    let array_count = params.iter().filter(|p| matches!(p.ty, dependent_types::DependentType::Vector { .. })).count();
    emitter.append_csv_row(&csv_path, &func.name, params.len(), array_count, start.elapsed().as_micros())?;
  }

  Ok(out_path)
}

/// Stub bodies for callees with no visible definition (§4.6 item 4). No
/// range is ever derived for an uncompleted call's return value (this
/// rewrite does not model call-site return ranges), so every stub takes
/// the fallback path: `rand()` truncated to the declared `int` width.
fn func_stub_declarations(fgen: &FunctionGenerator) -> Vec<String> {
  fgen.uncompleted_function_names().into_iter()
    .map(|name| format!("static int {name}() {{ return rand(); }}"))
    .collect()
}
