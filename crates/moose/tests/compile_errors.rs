//! Compile errors are collected in bulk across statement boundaries and
//! reported with locations.

use moose::Runner;

fn compile_errors(source: &str) -> moose::CompileErrors {
    Runner::new(source, "bad.moose").expect_err("expected compile errors")
}

#[test]
fn several_statements_report_several_errors() {
    let errors = compile_errors("a = missing1\nb = missing2\nc = missing3");
    assert_eq!(errors.len(), 3);
    assert!(errors.errors[0].message.contains("missing1"));
    assert!(errors.errors[2].message.contains("missing3"));
}

#[test]
fn lex_and_parse_errors_are_collected_together() {
    let errors = compile_errors("a = \"unterminated\nb = ?");
    assert!(errors.len() >= 2, "unexpected errors: {errors}");
}

#[test]
fn errors_carry_line_and_column() {
    let errors = compile_errors("a = 1\nb = missing");
    assert_eq!(errors.errors[0].loc.line, 2);
    assert!(errors.to_string().contains("bad.moose"));
    assert!(errors.to_string().contains("line 2"));
}

#[test]
fn immutable_variables_cannot_be_reassigned() {
    let errors = compile_errors("a = 1\na = 2");
    assert!(errors.errors[0].message.contains("immutable"));
}

#[test]
fn declared_types_are_enforced() {
    let errors = compile_errors("a: Int = \"x\"");
    assert!(errors.errors[0].message.contains("cannot assign"));
}

#[test]
fn nil_needs_an_annotation_to_infer_a_type() {
    let errors = compile_errors("a = nil");
    assert!(errors.errors[0].message.contains("annotation"));
}

#[test]
fn unknown_class_in_annotation_is_rejected() {
    let errors = compile_errors("a: Banana = nil");
    assert!(errors.errors[0].message.contains("unknown class"));
}

#[test]
fn calling_with_wrong_types_is_rejected() {
    let errors = compile_errors("func f(a: Int) { }\nf(\"x\")");
    assert!(errors.errors[0].message.contains("no matching overload"));
    assert!(errors.errors[0].message.contains("f(String)"));
}

#[test]
fn return_outside_a_function_is_rejected() {
    let errors = compile_errors("return 1");
    assert!(errors.errors[0].message.contains("outside"));
}

#[test]
fn assigning_to_the_global_accessor_is_rejected() {
    let errors = compile_errors("global = 1");
    assert!(errors.errors[0].message.contains("reserved"));
}

#[test]
fn duplicate_declaration_in_one_scope_is_rejected() {
    let errors = compile_errors("mut a = 1\nmut a = 2");
    assert!(errors.errors[0].message.contains("already declared"));
}

#[test]
fn mixed_list_literals_are_rejected() {
    let errors = compile_errors("l = [1, \"x\"]");
    assert!(errors.errors[0].message.contains("mixed"));
}

#[test]
fn immutable_fields_reject_writes() {
    let errors = compile_errors("class A { x: Int }\na = A(1)\na.x = 2");
    assert!(errors.errors[0].message.contains("immutable field"));
}

#[test]
fn operators_check_their_operand_types() {
    let errors = compile_errors("x = 1 + \"s\"");
    assert!(errors.errors[0].message.contains("no matching infix operator"));
}

#[test]
fn errors_inside_function_bodies_are_found() {
    let errors = compile_errors("func f() -> Int {\n  x = missing\n  return 1\n}");
    assert!(errors.errors[0].message.contains("missing"));
}
