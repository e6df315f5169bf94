//! Multi-dispatch: overloads by parameter types, operators by position,
//! nil widening, and scope shadowing.

use moose::{NoPrint, Object, Runner};
use pretty_assertions::assert_eq;

fn run_ok(source: &str) -> moose::Globals {
    let runner = Runner::new(source, "test.moose").unwrap();
    runner.run(&mut NoPrint).unwrap()
}

fn compile_errors(source: &str) -> moose::CompileErrors {
    Runner::new(source, "test.moose").expect_err("expected compile errors")
}

#[test]
fn overloads_dispatch_on_parameter_types() {
    let globals = run_ok(
        "func f(a: Int) -> Int { return 1 }\nfunc f(a: Float) -> Int { return 2 }\nfunc f(a: Int, b: Int) -> Int { return 3 }\nx = f(0)\ny = f(0.0)\nz = f(0, 0)",
    );
    assert_eq!(globals.get("x"), Some(&Object::Int(1)));
    assert_eq!(globals.get("y"), Some(&Object::Int(2)));
    assert_eq!(globals.get("z"), Some(&Object::Int(3)));
}

#[test]
fn nil_argument_with_two_candidates_is_ambiguous() {
    let errors = compile_errors(
        "func f(a: Int) -> Int { return 1 }\nfunc f(a: Float) -> Int { return 2 }\nx = f(nil)",
    );
    assert!(
        errors.errors.iter().any(|e| e.message.contains("ambiguous")),
        "unexpected errors: {errors}"
    );
}

#[test]
fn nil_argument_with_one_candidate_binds_a_typed_nil() {
    let globals = run_ok(
        "func f(a: Int) -> Int {\n  if a == nil { return -1 }\n  return a\n}\nx = f(nil)\ny = f(5)",
    );
    assert_eq!(globals.get("x"), Some(&Object::Int(-1)));
    assert_eq!(globals.get("y"), Some(&Object::Int(5)));
}

#[test]
fn exact_duplicate_signature_is_rejected() {
    let errors = compile_errors(
        "func f(a: Int) -> Int { return 1 }\nfunc f(a: Int) -> Float { return 2.0 }",
    );
    assert!(
        errors.errors.iter().any(|e| e.message.contains("collides")),
        "unexpected errors: {errors}"
    );
}

#[test]
fn inner_scope_shadows_outer_overload() {
    let globals = run_ok(
        "func f(a: Int) -> Int { return 1 }\nfunc g() -> Int {\n  func f(a: Int) -> Int { return 2 }\n  return f(0)\n}\nx = g()\ny = f(0)",
    );
    assert_eq!(globals.get("x"), Some(&Object::Int(2)));
    assert_eq!(globals.get("y"), Some(&Object::Int(1)));
}

#[test]
fn operators_dispatch_on_position() {
    let globals = run_ok(
        "prefix ~(a: Int) -> Int { return 0 - a }\npostfix ++(a: Int) -> Int { return a + 1 }\nx = ~3\ny = 5++",
    );
    assert_eq!(globals.get("x"), Some(&Object::Int(-3)));
    assert_eq!(globals.get("y"), Some(&Object::Int(6)));
}

#[test]
fn same_symbol_can_be_prefix_and_infix() {
    let globals = run_ok("a = 5 - 2\nb = -5");
    assert_eq!(globals.get("a"), Some(&Object::Int(3)));
    assert_eq!(globals.get("b"), Some(&Object::Int(-5)));
}

#[test]
fn user_operators_work_on_class_instances() {
    let globals = run_ok(
        "class V { x: Int }\ninfix +(a: V, b: V) -> V { return V(a.x + b.x) }\nv = V(1) + V(2)\nr = v.x",
    );
    assert_eq!(globals.get("r"), Some(&Object::Int(3)));
}

#[test]
fn string_concat_and_comparisons() {
    let globals = run_ok(
        "s = \"foo\" + \"bar\"\nt = s == \"foobar\"\nu = \"a\" != \"b\"\nv = 1 < 2 && 3 >= 3",
    );
    assert_eq!(globals.get("s"), Some(&Object::Str("foobar".to_owned())));
    assert_eq!(globals.get("t"), Some(&Object::Bool(true)));
    assert_eq!(globals.get("u"), Some(&Object::Bool(true)));
    assert_eq!(globals.get("v"), Some(&Object::Bool(true)));
}

#[test]
fn widened_and_narrowed_overloads_may_coexist() {
    // Adding both is fine; only calls that match a single candidate
    // resolve. A superclass argument picks the superclass overload.
    let globals = run_ok(
        "class A { x: Int }\nclass B < A { y: Int }\nfunc f(a: A) -> Int { return 1 }\nfunc f(b: B) -> Int { return 2 }\na = A(0)\nx = f(a)",
    );
    assert_eq!(globals.get("x"), Some(&Object::Int(1)));
}

#[test]
fn subclass_argument_matching_both_overloads_is_ambiguous() {
    // There is no most-specific tie-break: a B fits both f(A) and f(B).
    let errors = compile_errors(
        "class A { x: Int }\nclass B < A { y: Int }\nfunc f(a: A) -> Int { return 1 }\nfunc f(b: B) -> Int { return 2 }\nb = B(0, 0)\ny = f(b)",
    );
    assert!(
        errors.errors.iter().any(|e| e.message.contains("ambiguous")),
        "unexpected errors: {errors}"
    );
}

#[test]
fn mutable_parameters_allow_local_reassignment() {
    let globals = run_ok(
        "func inc(mut a: Int) -> Int {\n  a = a + 1\n  return a\n}\nx = 10\ny = inc(x)\nz = x",
    );
    assert_eq!(globals.get("y"), Some(&Object::Int(11)));
    assert_eq!(globals.get("z"), Some(&Object::Int(10)));
}
