//! Built-in member functions and global operators.
//!
//! Built-ins are enum variants rather than boxed closures so they stay
//! `Copy`, comparable and cheap to store in overload tables. The member
//! table seeds one scope per primitive type (`Int`, `Float`, `Bool`,
//! `String`, `List`); the operator table seeds the global scope.
//!
//! Nil propagation: when the receiver's value slot is nil, a conversion
//! returns a value of its declared return type with a nil slot (for
//! tuples, all components nil).

use std::rc::Rc;

use strum::IntoStaticStr;

use crate::{
    ast::OpPos,
    error::Panic,
    io::PrintWriter,
    scope::{ScopeArena, ScopeId, ScopeKind},
    types::{FnSig, Type},
    value::{Heap, Value, sig_of},
};

/// A built-in function: primitive member conversions plus `print`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub(crate) enum BuiltinFn {
    IntToBool,
    IntToFloat,
    IntToString,
    FloatToInt,
    FloatToString,
    BoolToInt,
    BoolToFloat,
    BoolToString,
    StrParseInt,
    StrParseFloat,
    StrParseBool,
    ListLength,
    Print,
}

impl BuiltinFn {
    /// Moose-visible name.
    pub fn name(self) -> &'static str {
        match self {
            Self::IntToBool => "toBool",
            Self::IntToFloat | Self::BoolToFloat => "toFloat",
            Self::IntToString | Self::FloatToString | Self::BoolToString => "toString",
            Self::FloatToInt | Self::BoolToInt => "toInt",
            Self::StrParseInt => "parseInt",
            Self::StrParseFloat => "parseFloat",
            Self::StrParseBool => "parseBool",
            Self::ListLength => "length",
            Self::Print => "print",
        }
    }

    /// Declared signature. Member functions take no parameters; the
    /// receiver is implicit. `print`'s overloads are listed separately in
    /// [`global_fns`].
    pub fn sig(self) -> FnSig {
        let ret = match self {
            Self::IntToBool => Type::Bool,
            Self::IntToFloat | Self::BoolToFloat => Type::Float,
            Self::IntToString | Self::FloatToString | Self::BoolToString => Type::String,
            Self::FloatToInt | Self::BoolToInt | Self::ListLength => Type::Int,
            Self::StrParseInt => Type::Tuple(vec![Type::Int, Type::String]),
            Self::StrParseFloat => Type::Tuple(vec![Type::Float, Type::String]),
            Self::StrParseBool => Type::Tuple(vec![Type::Bool, Type::String]),
            Self::Print => return sig_of(&[Type::String], Type::Void),
        };
        sig_of(&[], ret)
    }

    pub fn fn_type(self) -> Type {
        let sig = self.sig();
        Type::Function {
            params: sig.param_types().cloned().collect(),
            ret: Box::new(sig.ret),
        }
    }

    /// Invokes the native implementation. Member functions receive the
    /// receiver value; `print` receives its argument in `args`.
    pub fn call<'a>(
        self,
        receiver: Option<&Value<'a>>,
        args: &[Value<'a>],
        heap: &Heap<'a>,
        print: &mut dyn PrintWriter,
    ) -> Result<Value<'a>, Box<Panic>> {
        if let Self::Print = self {
            let arg = args
                .first()
                .ok_or_else(|| Panic::generic("print requires an argument"))?;
            print.write_line(&arg.display(heap));
            return Ok(Value::Void);
        }

        let receiver = receiver.ok_or_else(|| {
            Panic::generic(format!("built-in '{}' called without a receiver", self.name()))
        })?;
        // Nil receivers propagate: the result is the declared return type
        // with an empty slot.
        if receiver.is_nil() {
            return Ok(Value::nil_of(&self.sig().ret));
        }

        let result = match (self, receiver) {
            (Self::IntToBool, Value::Int(Some(v))) => Value::Bool(Some(*v != 0)),
            (Self::IntToFloat, Value::Int(Some(v))) => Value::Float(Some(*v as f64)),
            (Self::IntToString, Value::Int(Some(v))) => Value::str(v.to_string()),
            (Self::FloatToInt, Value::Float(Some(v))) => Value::Int(Some(*v as i64)),
            (Self::FloatToString, Value::Float(Some(v))) => {
                Value::str(ryu::Buffer::new().format(*v))
            }
            (Self::BoolToInt, Value::Bool(Some(v))) => Value::Int(Some(i64::from(*v))),
            (Self::BoolToFloat, Value::Bool(Some(v))) => Value::Float(Some(f64::from(u8::from(*v)))),
            (Self::BoolToString, Value::Bool(Some(v))) => Value::str(v.to_string()),
            (Self::StrParseInt, Value::Str(Some(s))) => {
                parse_result(s.parse::<i64>().ok().map(|v| Value::Int(Some(v))), s, "an Int", Type::Int)
            }
            (Self::StrParseFloat, Value::Str(Some(s))) => parse_result(
                s.parse::<f64>().ok().map(|v| Value::Float(Some(v))),
                s,
                "a Float",
                Type::Float,
            ),
            (Self::StrParseBool, Value::Str(Some(s))) => {
                let parsed = match s.as_ref() {
                    "true" => Some(Value::Bool(Some(true))),
                    "false" => Some(Value::Bool(Some(false))),
                    _ => None,
                };
                parse_result(parsed, s, "a Bool", Type::Bool)
            }
            (Self::ListLength, Value::List(_, Some(id))) => {
                Value::Int(Some(heap.list(*id).items.len() as i64))
            }
            (_, other) => {
                return Err(Panic::generic(format!(
                    "built-in '{}' does not accept a receiver of type {}",
                    self.name(),
                    other.type_of()
                )));
            }
        };
        Ok(result)
    }
}

/// Builds the `(value-or-nil, error-message-or-nil)` tuple the string
/// parsers return.
fn parse_result<'a>(
    parsed: Option<Value<'a>>,
    source: &str,
    article_type: &str,
    value_type: Type,
) -> Value<'a> {
    let ty = Type::Tuple(vec![value_type.clone(), Type::String]);
    match parsed {
        Some(value) => Value::Tuple(ty, Rc::new(vec![value, Value::Str(None)])),
        None => Value::Tuple(
            ty,
            Rc::new(vec![
                Value::nil_of(&value_type),
                Value::str(format!("Cannot parse '{source}' to {article_type}.")),
            ]),
        ),
    }
}

/// A built-in operator over primitive operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub(crate) enum BuiltinOp {
    IntAdd,
    IntSub,
    IntMul,
    IntDiv,
    IntMod,
    IntLt,
    IntGt,
    IntLe,
    IntGe,
    IntEq,
    IntNe,
    IntNeg,
    FloatAdd,
    FloatSub,
    FloatMul,
    FloatDiv,
    FloatLt,
    FloatGt,
    FloatLe,
    FloatGe,
    FloatEq,
    FloatNe,
    FloatNeg,
    BoolAnd,
    BoolOr,
    BoolEq,
    BoolNe,
    BoolNot,
    StrConcat,
    StrEq,
    StrNe,
}

impl BuiltinOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::IntAdd | Self::FloatAdd | Self::StrConcat => "+",
            Self::IntSub | Self::FloatSub | Self::IntNeg | Self::FloatNeg => "-",
            Self::IntMul | Self::FloatMul => "*",
            Self::IntDiv | Self::FloatDiv => "/",
            Self::IntMod => "%",
            Self::IntLt | Self::FloatLt => "<",
            Self::IntGt | Self::FloatGt => ">",
            Self::IntLe | Self::FloatLe => "<=",
            Self::IntGe | Self::FloatGe => ">=",
            Self::IntEq | Self::FloatEq | Self::BoolEq | Self::StrEq => "==",
            Self::IntNe | Self::FloatNe | Self::BoolNe | Self::StrNe => "!=",
            Self::BoolAnd => "&&",
            Self::BoolOr => "||",
            Self::BoolNot => "!",
        }
    }

    pub fn position(self) -> OpPos {
        match self {
            Self::IntNeg | Self::FloatNeg | Self::BoolNot => OpPos::Prefix,
            _ => OpPos::Infix,
        }
    }

    pub fn sig(self) -> FnSig {
        let (operand, ret) = match self {
            Self::IntAdd | Self::IntSub | Self::IntMul | Self::IntDiv | Self::IntMod => {
                (Type::Int, Type::Int)
            }
            Self::IntLt
            | Self::IntGt
            | Self::IntLe
            | Self::IntGe
            | Self::IntEq
            | Self::IntNe => (Type::Int, Type::Bool),
            Self::IntNeg => return sig_of(&[Type::Int], Type::Int),
            Self::FloatAdd | Self::FloatSub | Self::FloatMul | Self::FloatDiv => {
                (Type::Float, Type::Float)
            }
            Self::FloatLt
            | Self::FloatGt
            | Self::FloatLe
            | Self::FloatGe
            | Self::FloatEq
            | Self::FloatNe => (Type::Float, Type::Bool),
            Self::FloatNeg => return sig_of(&[Type::Float], Type::Float),
            Self::BoolAnd | Self::BoolOr | Self::BoolEq | Self::BoolNe => (Type::Bool, Type::Bool),
            Self::BoolNot => return sig_of(&[Type::Bool], Type::Bool),
            Self::StrConcat => (Type::String, Type::String),
            Self::StrEq | Self::StrNe => (Type::String, Type::Bool),
        };
        sig_of(&[operand.clone(), operand], ret)
    }

    pub fn fn_type(self) -> Type {
        let sig = self.sig();
        Type::Function {
            params: sig.param_types().cloned().collect(),
            ret: Box::new(sig.ret),
        }
    }

    pub fn call<'a>(self, args: &[Value<'a>]) -> Result<Value<'a>, Box<Panic>> {
        // Equality tolerates nil operands; everything else panics on nil.
        match self {
            Self::IntEq | Self::FloatEq | Self::BoolEq | Self::StrEq => {
                return Ok(Value::Bool(Some(values_equal(&args[0], &args[1]))));
            }
            Self::IntNe | Self::FloatNe | Self::BoolNe | Self::StrNe => {
                return Ok(Value::Bool(Some(!values_equal(&args[0], &args[1]))));
            }
            _ => {}
        }
        if let Some(nil) = args.iter().find(|a| a.is_nil()) {
            return Err(Panic::nil_usage(format!(
                "operand of '{}' is a nil {}",
                self.name(),
                nil.type_of()
            )));
        }
        let result = match self {
            Self::IntAdd => Value::Int(Some(int(args, 0).wrapping_add(int(args, 1)))),
            Self::IntSub => Value::Int(Some(int(args, 0).wrapping_sub(int(args, 1)))),
            Self::IntMul => Value::Int(Some(int(args, 0).wrapping_mul(int(args, 1)))),
            Self::IntDiv => {
                let divisor = int(args, 1);
                if divisor == 0 {
                    return Err(Panic::generic("division by zero"));
                }
                Value::Int(Some(int(args, 0).wrapping_div(divisor)))
            }
            Self::IntMod => {
                let divisor = int(args, 1);
                if divisor == 0 {
                    return Err(Panic::generic("modulo by zero"));
                }
                Value::Int(Some(int(args, 0).wrapping_rem(divisor)))
            }
            Self::IntLt => Value::Bool(Some(int(args, 0) < int(args, 1))),
            Self::IntGt => Value::Bool(Some(int(args, 0) > int(args, 1))),
            Self::IntLe => Value::Bool(Some(int(args, 0) <= int(args, 1))),
            Self::IntGe => Value::Bool(Some(int(args, 0) >= int(args, 1))),
            Self::IntNeg => Value::Int(Some(int(args, 0).wrapping_neg())),
            Self::FloatAdd => Value::Float(Some(float(args, 0) + float(args, 1))),
            Self::FloatSub => Value::Float(Some(float(args, 0) - float(args, 1))),
            Self::FloatMul => Value::Float(Some(float(args, 0) * float(args, 1))),
            Self::FloatDiv => Value::Float(Some(float(args, 0) / float(args, 1))),
            Self::FloatLt => Value::Bool(Some(float(args, 0) < float(args, 1))),
            Self::FloatGt => Value::Bool(Some(float(args, 0) > float(args, 1))),
            Self::FloatLe => Value::Bool(Some(float(args, 0) <= float(args, 1))),
            Self::FloatGe => Value::Bool(Some(float(args, 0) >= float(args, 1))),
            Self::FloatNeg => Value::Float(Some(-float(args, 0))),
            Self::BoolAnd => Value::Bool(Some(boolean(args, 0) && boolean(args, 1))),
            Self::BoolOr => Value::Bool(Some(boolean(args, 0) || boolean(args, 1))),
            Self::BoolNot => Value::Bool(Some(!boolean(args, 0))),
            Self::StrConcat => {
                let (Value::Str(Some(a)), Value::Str(Some(b))) = (&args[0], &args[1]) else {
                    return Err(Panic::generic("'+' expects two strings"));
                };
                Value::str(format!("{a}{b}"))
            }
            Self::IntEq
            | Self::IntNe
            | Self::FloatEq
            | Self::FloatNe
            | Self::BoolEq
            | Self::BoolNe
            | Self::StrEq
            | Self::StrNe => unreachable!("equality handled above"),
        };
        Ok(result)
    }
}

fn int(args: &[Value<'_>], i: usize) -> i64 {
    match args[i] {
        Value::Int(Some(v)) => v,
        _ => unreachable!("dispatch guarantees Int operands"),
    }
}

fn float(args: &[Value<'_>], i: usize) -> f64 {
    match args[i] {
        Value::Float(Some(v)) => v,
        _ => unreachable!("dispatch guarantees Float operands"),
    }
}

fn boolean(args: &[Value<'_>], i: usize) -> bool {
    match args[i] {
        Value::Bool(Some(v)) => v,
        _ => unreachable!("dispatch guarantees Bool operands"),
    }
}

fn values_equal(a: &Value<'_>, b: &Value<'_>) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => a.is_nil() && b.is_nil(),
    }
}

/// The member functions of each primitive type, in registration order.
pub(crate) fn member_fns() -> Vec<(Type, Vec<BuiltinFn>)> {
    vec![
        (
            Type::Int,
            vec![BuiltinFn::IntToBool, BuiltinFn::IntToFloat, BuiltinFn::IntToString],
        ),
        (
            Type::Float,
            vec![BuiltinFn::FloatToInt, BuiltinFn::FloatToString],
        ),
        (
            Type::Bool,
            vec![BuiltinFn::BoolToInt, BuiltinFn::BoolToFloat, BuiltinFn::BoolToString],
        ),
        (
            Type::String,
            vec![BuiltinFn::StrParseInt, BuiltinFn::StrParseFloat, BuiltinFn::StrParseBool],
        ),
        (Type::List(Box::new(Type::Nil)), vec![BuiltinFn::ListLength]),
    ]
}

/// Global function overloads (`print` over each printable primitive).
pub(crate) fn global_fns() -> Vec<(BuiltinFn, FnSig)> {
    [Type::String, Type::Int, Type::Float, Type::Bool]
        .into_iter()
        .map(|ty| (BuiltinFn::Print, sig_of(&[ty], Type::Void)))
        .collect()
}

/// Every built-in operator, for seeding the global scope.
pub(crate) fn global_ops() -> Vec<BuiltinOp> {
    use BuiltinOp::*;
    vec![
        IntAdd, IntSub, IntMul, IntDiv, IntMod, IntLt, IntGt, IntLe, IntGe, IntEq, IntNe, IntNeg,
        FloatAdd, FloatSub, FloatMul, FloatDiv, FloatLt, FloatGt, FloatLe, FloatGe, FloatEq,
        FloatNe, FloatNeg, BoolAnd, BoolOr, BoolEq, BoolNe, BoolNot, StrConcat, StrEq, StrNe,
    ]
}

/// The member scopes of the primitive types, one arena node each.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuiltinScopes {
    pub int: ScopeId,
    pub float: ScopeId,
    pub boolean: ScopeId,
    pub string: ScopeId,
    pub list: ScopeId,
}

impl BuiltinScopes {
    /// The member scope a value of `ty` dereferences into, if any.
    pub fn for_type(&self, ty: &Type) -> Option<ScopeId> {
        match ty {
            Type::Int => Some(self.int),
            Type::Float => Some(self.float),
            Type::Bool => Some(self.boolean),
            Type::String => Some(self.string),
            Type::List(_) => Some(self.list),
            _ => None,
        }
    }

    /// Whether `id` is one of the built-in class environments; the call
    /// protocol switches to the global environment for built-ins invoked
    /// from anywhere else.
    pub fn contains(&self, id: ScopeId) -> bool {
        [self.int, self.float, self.boolean, self.string, self.list].contains(&id)
    }
}

/// Seeds one arena with the built-in tables: a member scope per primitive
/// type, plus the global operators and `print` overloads in the prelude
/// scope. Generic over the arena payload so the checker (which stores
/// nothing per callee) and the evaluator (which stores values) share one
/// registration path.
pub(crate) fn seed<V, C>(
    arena: &mut ScopeArena<V, C>,
    prelude: ScopeId,
    mut make_fn: impl FnMut(BuiltinFn) -> C,
    mut make_op: impl FnMut(BuiltinOp) -> C,
) -> BuiltinScopes {
    let mut int = None;
    let mut float = None;
    let mut boolean = None;
    let mut string = None;
    let mut list = None;
    for (ty, fns) in member_fns() {
        let scope = arena.alloc(prelude, ScopeKind::BuiltinClass);
        for builtin in fns {
            arena
                .add_func(scope, builtin.name(), builtin.sig(), make_fn(builtin))
                .expect("built-in member tables hold no colliding overloads");
        }
        match ty {
            Type::Int => int = Some(scope),
            Type::Float => float = Some(scope),
            Type::Bool => boolean = Some(scope),
            Type::String => string = Some(scope),
            Type::List(_) => list = Some(scope),
            _ => unreachable!("member table covers primitives only"),
        }
    }
    for op in global_ops() {
        arena
            .add_op(prelude, op.name(), op.position(), op.sig(), make_op(op))
            .expect("built-in operator table holds no colliding overloads");
    }
    for (builtin, sig) in global_fns() {
        arena
            .add_func(prelude, builtin.name(), sig, make_fn(builtin))
            .expect("print overloads do not collide");
    }
    BuiltinScopes {
        int: int.expect("Int member scope seeded"),
        float: float.expect("Float member scope seeded"),
        boolean: boolean.expect("Bool member scope seeded"),
        string: string.expect("String member scope seeded"),
        list: list.expect("List member scope seeded"),
    }
}
