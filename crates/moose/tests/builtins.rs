//! Conversions, parsing round trips and nil propagation through the
//! built-in member functions.

use moose::{NoPrint, Object, Runner};
use pretty_assertions::assert_eq;

fn run_ok(source: &str) -> moose::Globals {
    let runner = Runner::new(source, "test.moose").unwrap();
    runner.run(&mut NoPrint).unwrap()
}

#[test]
fn int_to_string_round_trip() {
    let globals = run_ok("n = 12345\n(v, e) = n.toString().parseInt()");
    assert_eq!(globals.get("v"), Some(&Object::Int(12345)));
    assert_eq!(globals.get("e"), Some(&Object::Nil));
}

#[test]
fn negative_int_round_trip() {
    let globals = run_ok("n = 0 - 98\n(v, e) = n.toString().parseInt()");
    assert_eq!(globals.get("v"), Some(&Object::Int(-98)));
    assert_eq!(globals.get("e"), Some(&Object::Nil));
}

#[test]
fn bool_to_string_round_trip() {
    let globals = run_ok(
        "(t, te) = true.toString().parseBool()\n(f, fe) = false.toString().parseBool()",
    );
    assert_eq!(globals.get("t"), Some(&Object::Bool(true)));
    assert_eq!(globals.get("te"), Some(&Object::Nil));
    assert_eq!(globals.get("f"), Some(&Object::Bool(false)));
    assert_eq!(globals.get("fe"), Some(&Object::Nil));
}

#[test]
fn bool_int_conversions() {
    let globals = run_ok(
        "one = true.toInt()\nzero = false.toInt()\nt = one.toBool()\nf = zero.toBool()",
    );
    assert_eq!(globals.get("one"), Some(&Object::Int(1)));
    assert_eq!(globals.get("zero"), Some(&Object::Int(0)));
    assert_eq!(globals.get("t"), Some(&Object::Bool(true)));
    assert_eq!(globals.get("f"), Some(&Object::Bool(false)));
}

#[test]
fn float_conversions() {
    let globals = run_ok("x = 2.9\ni = x.toInt()\ns = x.toString()\nf = 3.toFloat()");
    assert_eq!(globals.get("i"), Some(&Object::Int(2)));
    assert_eq!(globals.get("s"), Some(&Object::Str("2.9".to_owned())));
    assert_eq!(globals.get("f"), Some(&Object::Float(3.0)));
}

#[test]
fn parse_failure_reports_value_nil_and_message() {
    let globals = run_ok("(v, e) = \"abc\".parseInt()");
    assert_eq!(globals.get("v"), Some(&Object::Nil));
    assert_eq!(
        globals.get("e"),
        Some(&Object::Str("Cannot parse 'abc' to an Int.".to_owned()))
    );
}

#[test]
fn parse_float_and_bool_failures() {
    let globals = run_ok("(f, fe) = \"1.2.3\".parseFloat()\n(b, be) = \"yes\".parseBool()");
    assert_eq!(globals.get("f"), Some(&Object::Nil));
    assert_eq!(
        globals.get("fe"),
        Some(&Object::Str("Cannot parse '1.2.3' to a Float.".to_owned()))
    );
    assert_eq!(globals.get("b"), Some(&Object::Nil));
    assert_eq!(
        globals.get("be"),
        Some(&Object::Str("Cannot parse 'yes' to a Bool.".to_owned()))
    );
}

#[test]
fn nil_receiver_propagates_through_conversions() {
    let globals = run_ok("a: Int = nil\ns = a.toString()");
    assert_eq!(globals.get("s"), Some(&Object::Nil));
}

#[test]
fn nil_receiver_propagates_into_parse_tuples() {
    let globals = run_ok("a: String = nil\n(v, e) = a.parseInt()");
    assert_eq!(globals.get("v"), Some(&Object::Nil));
    assert_eq!(globals.get("e"), Some(&Object::Nil));
}

#[test]
fn list_length() {
    let globals = run_ok("l = [1, 2, 3]\nn = l.length()\nempty: [Int] = []\nz = empty.length()");
    assert_eq!(globals.get("n"), Some(&Object::Int(3)));
    assert_eq!(globals.get("z"), Some(&Object::Int(0)));
}

#[test]
fn conversions_on_literal_receivers() {
    let globals = run_ok("s = 5.toString()\nb = 0.toBool()\nt = 2.toBool()");
    assert_eq!(globals.get("s"), Some(&Object::Str("5".to_owned())));
    assert_eq!(globals.get("b"), Some(&Object::Bool(false)));
    assert_eq!(globals.get("t"), Some(&Object::Bool(true)));
}
