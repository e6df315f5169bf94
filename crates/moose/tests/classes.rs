//! Classes: construction, methods, inheritance, overriding, `me`, `is`
//! and member shadowing under the closed scope.

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
fn methods_bind_to_their_instance() {
    let globals = run_ok(
        "class P {\n  x: Int\n  y: Int\n  func sum() -> Int { return me.x + me.y }\n}\np = P(1, 2)\nq = P(10, 20)\na = p.sum()\nb = q.sum()",
    );
    assert_eq!(globals.get("a"), Some(&Object::Int(3)));
    assert_eq!(globals.get("b"), Some(&Object::Int(30)));
}

#[test]
fn methods_reach_properties_without_me() {
    let globals = run_ok(
        "class C {\n  mut n: Int\n  func bump() { n = n + 1 }\n}\nc = C(1)\nc.bump()\nc.bump()\nv = c.n",
    );
    assert_eq!(globals.get("v"), Some(&Object::Int(3)));
}

#[test]
fn field_writes_go_through_the_dereferer() {
    let globals = run_ok(
        "class C { mut n: Int }\nc = C(5)\nc.n = 42\nv = c.n",
    );
    assert_eq!(globals.get("v"), Some(&Object::Int(42)));
}

#[test]
fn inherited_methods_work_on_subclass_instances() {
    let globals = run_ok(
        "class A {\n  x: Int\n  func getx() -> Int { return x }\n}\nclass B < A { y: Int }\nb = B(7, 8)\nv = b.getx()",
    );
    assert_eq!(globals.get("v"), Some(&Object::Int(7)));
}

#[test]
fn overriding_keeps_the_parent_return_type() {
    let globals = run_ok(
        "class A {\n  x: Int\n  func describe() -> Int { return 1 }\n}\nclass B < A {\n  y: Int\n  func describe() -> Int { return 2 }\n}\nb = B(0, 0)\nv = b.describe()\na = A(0)\nw = a.describe()",
    );
    assert_eq!(globals.get("v"), Some(&Object::Int(2)));
    assert_eq!(globals.get("w"), Some(&Object::Int(1)));
}

#[test]
fn widening_an_override_return_type_is_rejected() {
    let errors = compile_errors(
        "class A { func f() -> Int { return 1 } }\nclass B < A { func f() -> Float { return 1.0 } }",
    );
    assert!(
        errors
            .errors
            .iter()
            .any(|e| e.message.contains("changes the return type")),
        "unexpected errors: {errors}"
    );
}

#[test]
fn duplicate_property_in_chain_is_rejected() {
    let errors = compile_errors("class A { x: Int }\nclass B < A { x: Int }");
    assert!(
        errors
            .errors
            .iter()
            .any(|e| e.message.contains("already defined in superclass")),
        "unexpected errors: {errors}"
    );
}

#[test]
fn inheritance_cycles_are_rejected() {
    let errors = compile_errors("class A < B { }\nclass B < A { }");
    assert!(
        errors.errors.iter().any(|e| e.message.contains("cycle")),
        "unexpected errors: {errors}"
    );
}

#[test]
fn unknown_superclass_is_rejected() {
    let errors = compile_errors("class B < Missing { x: Int }");
    assert!(
        errors
            .errors
            .iter()
            .any(|e| e.message.contains("unknown superclass")),
        "unexpected errors: {errors}"
    );
}

#[test]
fn member_access_hides_enclosing_scope() {
    let globals = run_ok(
        "x = 5\nclass A { x: Int }\na = A(7)\ny = a.x",
    );
    assert_eq!(globals.get("y"), Some(&Object::Int(7)));
    assert_eq!(globals.get("x"), Some(&Object::Int(5)));
}

#[test]
fn member_call_arguments_see_enclosing_scopes() {
    let globals = run_ok(
        "class A {\n  x: Int\n  func add(v: Int) -> Int { return x + v }\n}\nfunc twenty() -> Int { return 20 }\na = A(1)\nv = a.add(twenty())",
    );
    assert_eq!(globals.get("v"), Some(&Object::Int(21)));
}

#[test]
fn is_checks_the_class_chain() {
    let globals = run_ok(
        "class A { x: Int }\nclass B < A { y: Int }\nb = B(1, 2)\nt1 = b is A\nt2 = b is B\na = A(1)\nt3 = a is B\nn = 5\nt4 = n is Int\nt5 = n is Float",
    );
    assert_eq!(globals.get("t1"), Some(&Object::Bool(true)));
    assert_eq!(globals.get("t2"), Some(&Object::Bool(true)));
    assert_eq!(globals.get("t3"), Some(&Object::Bool(false)));
    assert_eq!(globals.get("t4"), Some(&Object::Bool(true)));
    assert_eq!(globals.get("t5"), Some(&Object::Bool(false)));
}

#[test]
fn subclass_instances_widen_into_superclass_parameters() {
    let globals = run_ok(
        "class A { x: Int }\nclass B < A { y: Int }\nfunc getx(a: A) -> Int { return a.x }\nb = B(9, 1)\nv = getx(b)",
    );
    assert_eq!(globals.get("v"), Some(&Object::Int(9)));
}

#[test]
fn grandparent_properties_come_first() {
    let globals = run_ok(
        "class A { x: Int }\nclass B < A { y: Int }\nclass C < B { z: Int }\nc = C(1, 2, 3)\ns = c.x + c.y + c.z",
    );
    assert_eq!(globals.get("s"), Some(&Object::Int(6)));
    assert_eq!(
        globals.get("c"),
        Some(&Object::Instance {
            class: "C".to_owned(),
            fields: vec![
                ("x".to_owned(), Object::Int(1)),
                ("y".to_owned(), Object::Int(2)),
                ("z".to_owned(), Object::Int(3)),
            ],
        })
    );
}

#[test]
fn nil_typed_instances_panic_on_member_access() {
    let runner = Runner::new("class A { x: Int }\na: A = nil\nv = a.x", "test.moose").unwrap();
    let panic = runner.run(&mut NoPrint).unwrap_err();
    assert_eq!(panic.label(), "NilUsage");
}

#[test]
fn instance_properties_can_hold_instances() {
    let globals = run_ok(
        "class Inner { v: Int }\nclass Outer { inner: Inner }\no = Outer(Inner(11))\nx = o.inner.v",
    );
    assert_eq!(globals.get("x"), Some(&Object::Int(11)));
}
