//! End-to-end scenarios run through the public pipeline entry point
//! (spec §8): parse a small function body, emit its harness, and check the
//! generated C text reflects what the three analyses should have found.

use std::fs;

use harnessgen::config::{AnalysisOptions, HarnessOptions};

fn run(source: &str, function: &str) -> String {
  let dir = tempfile::tempdir().expect("tempdir");
  let src_path = dir.path().join("source.c");
  fs::write(&src_path, source).unwrap();

  let outcomes = harnessgen::analyze_and_emit_preprocessed(
    source,
    &src_path,
    Some(function),
    &AnalysisOptions::default(),
    &HarnessOptions::default(),
  ).expect("pipeline should run");

  assert_eq!(outcomes.len(), 1, "expected exactly one matching function");
  let path = outcomes[0].result.as_ref().expect("harness should be emitted").clone();
  fs::read_to_string(path).expect("harness should be readable")
}

#[test]
fn scalar_parameter_narrowed_by_guard_becomes_a_tight_range() {
  let harness = run(
    "int f(int n) { if (n < 0) { n = 0; } if (n > 100) { n = 100; } return n; }",
    "f",
  );
  assert!(harness.contains("f(n);"));
  assert!(harness.contains("0 + rand() % (100 - 0 + 1)"));
}

#[test]
fn constant_assignment_collapses_to_a_literal() {
  let harness = run("int f(int n) { n = 42; return n; }", "f");
  assert!(harness.contains("int n = 42;"));
}

#[test]
fn loop_bound_drives_array_allocation_size() {
  let harness = run(
    "int f(int *a, int count) { int i; int sum = 0; for (i = 0; i < 10; i++) { sum += a[i]; } return sum; }",
    "f",
  );
  assert!(harness.contains("int a_dim0 = 10;"));
  assert!(harness.contains("malloc(sizeof(int) * (a_dim0))"));
}

#[test]
fn multi_dimensional_array_gets_one_size_variable_per_dimension() {
  let harness = run(
    "int f(int *a, int n, int m) { int i; int j; int sum = 0; \
     for (i = 0; i < n; i++) { for (j = 0; j < m; j++) { sum += a[i][j]; } } return sum; }",
    "f",
  );
  assert!(harness.contains("int a_dim0"));
  assert!(harness.contains("int a_dim1"));
  assert!(harness.contains("malloc(sizeof(int) * (a_dim0 * a_dim1))"));
}

#[test]
fn invalid_rand_is_reset_per_test_and_guards_the_call_loop() {
  let harness = run("int f(int n) { return n; }", "f");
  assert!(harness.contains("static int INVALID_RAND = 0;"));
  assert!(harness.contains("INVALID_RAND = 0;"));
  assert!(harness.contains("if (INVALID_RAND != 1) {"));
}

#[test]
fn undefined_callee_gets_a_stub_definition() {
  let harness = run("int f(int n) { return helper(n) + 1; }", "f");
  assert!(harness.contains("static int helper() { return rand(); }"));
}

#[test]
fn pointer_never_indexed_is_not_treated_as_an_array() {
  let harness = run("int f(int *p) { return *p; }", "f");
  assert!(!harness.contains("malloc"));
}

#[test]
fn selecting_one_function_skips_the_others() {
  let source = "int f(int n) { return n; } int g(int n) { return n * 2; }";
  let dir = tempfile::tempdir().unwrap();
  let src_path = dir.path().join("source.c");
  fs::write(&src_path, source).unwrap();
  let outcomes = harnessgen::analyze_and_emit_preprocessed(
    source, &src_path, Some("g"), &AnalysisOptions::default(), &HarnessOptions::default(),
  ).unwrap();
  assert_eq!(outcomes.len(), 1);
  assert_eq!(outcomes[0].function, "g");
}
