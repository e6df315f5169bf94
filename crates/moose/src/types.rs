//! Moose types: the tagged union shared by the checker and the evaluator.

use std::fmt;

use strum::EnumString;

/// A Moose type.
///
/// Equality is structural. The printable form (via `Display`) is what the
/// `is` expression compares against for non-instance values.
///
/// Primitive names parse via strum's `EnumString` (e.g. `"Int"`); the
/// structured variants are disabled there and built by the type parser.
#[derive(Debug, Clone, PartialEq, Eq, EnumString, serde::Serialize, serde::Deserialize)]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    /// The type of a bare `return` and of statements.
    Void,
    /// The type of the untyped `nil` literal; a subtype of every type.
    Nil,
    #[strum(disabled)]
    Tuple(Vec<Type>),
    #[strum(disabled)]
    List(Box<Type>),
    #[strum(disabled)]
    Function { params: Vec<Type>, ret: Box<Type> },
    #[strum(disabled)]
    Class(String),
}

/// Access to the recorded superclass chains, needed by `super_of` for
/// class widening. Implemented by the checker's class table and by the
/// interpreter's runtime class registry.
pub(crate) trait ClassAncestry {
    /// True when `ancestor` appears in `descendant`'s superclass chain
    /// (not counting `descendant` itself).
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool;
}

/// Ancestry source for contexts without classes (e.g. seeding built-ins).
pub(crate) struct NoClasses;

impl ClassAncestry for NoClasses {
    fn is_ancestor(&self, _ancestor: &str, _descendant: &str) -> bool {
        false
    }
}

impl Type {
    /// The subtype predicate: does a value of type `t` fit where `self`
    /// is expected?
    ///
    /// Holds when `t == self`, when `t` is `Nil` (nil inhabits every
    /// type), when `self` is a class ancestor of the class `t`, and
    /// structurally (covariant) for tuples and lists. Function types are
    /// invariant.
    pub(crate) fn super_of(&self, t: &Self, classes: &impl ClassAncestry) -> bool {
        if t == self || *t == Self::Nil {
            return true;
        }
        match (self, t) {
            (Self::Class(sup), Self::Class(sub)) => classes.is_ancestor(sup, sub),
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.super_of(y, classes))
            }
            (Self::List(a), Self::List(b)) => a.super_of(b, classes),
            _ => false,
        }
    }

}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("Int"),
            Self::Float => f.write_str("Float"),
            Self::Bool => f.write_str("Bool"),
            Self::String => f.write_str("String"),
            Self::Void => f.write_str("Void"),
            Self::Nil => f.write_str("Nil"),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::List(elem) => write!(f, "[{elem}]"),
            Self::Function { params, ret } => {
                f.write_str("(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {ret}")
            }
            Self::Class(name) => f.write_str(name),
        }
    }
}

/// A declared parameter: its type plus whether the parameter binding is
/// mutable inside the callee. Mutability never participates in overload
/// matching or signature equality.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParamType {
    pub ty: Type,
    pub mutable: bool,
}

impl ParamType {
    pub(crate) fn new(ty: Type) -> Self {
        Self { ty, mutable: false }
    }
}

/// A function or operator signature, shared between the type-side scope
/// tables and runtime function values.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FnSig {
    pub params: Vec<ParamType>,
    pub ret: Type,
}

impl FnSig {
    pub(crate) fn new(params: Vec<ParamType>, ret: Type) -> Self {
        Self { params, ret }
    }

    pub(crate) fn param_types(&self) -> impl Iterator<Item = &Type> {
        self.params.iter().map(|p| &p.ty)
    }

    /// Exact structural parameter-type equality, the override criterion
    /// during class flattening. Mutability is ignored.
    pub(crate) fn same_params(&self, other: &Self) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }

    /// Structural parameter-list equality modulo nil: two signatures
    /// collide when they have the same arity and every parameter pair is
    /// equal or contains a `Nil`. Scopes refuse to hold two colliding
    /// overloads of one name.
    pub(crate) fn collides_with(&self, other: &Self) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty || a.ty == Type::Nil || b.ty == Type::Nil)
    }
}

impl fmt::Display for FnSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param.ty)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn primitive_names_parse() {
        assert_eq!(Type::from_str("Int").unwrap(), Type::Int);
        assert_eq!(Type::from_str("String").unwrap(), Type::String);
        assert!(Type::from_str("Banana").is_err());
    }

    #[test]
    fn super_of_is_reflexive_and_nil_widens() {
        let t = Type::Tuple(vec![Type::Int, Type::String]);
        assert!(t.super_of(&t, &NoClasses));
        assert!(Type::Int.super_of(&Type::Nil, &NoClasses));
        assert!(!Type::Int.super_of(&Type::Float, &NoClasses));
    }

    #[test]
    fn tuples_and_lists_are_covariant() {
        let pair = Type::Tuple(vec![Type::Int, Type::Float]);
        let with_nil = Type::Tuple(vec![Type::Nil, Type::Float]);
        assert!(pair.super_of(&with_nil, &NoClasses));
        assert!(!with_nil.super_of(&pair, &NoClasses));
        assert!(
            Type::List(Box::new(Type::Int)).super_of(&Type::List(Box::new(Type::Nil)), &NoClasses)
        );
    }

    #[test]
    fn function_types_are_invariant() {
        let f = Type::Function {
            params: vec![Type::Int],
            ret: Box::new(Type::Int),
        };
        let g = Type::Function {
            params: vec![Type::Nil],
            ret: Box::new(Type::Int),
        };
        assert!(!f.super_of(&g, &NoClasses));
        assert!(f.super_of(&f, &NoClasses));
    }

    #[test]
    fn signature_collision_is_modulo_nil() {
        let int_int = FnSig::new(
            vec![ParamType::new(Type::Int), ParamType::new(Type::Int)],
            Type::Int,
        );
        let int_nil = FnSig::new(
            vec![ParamType::new(Type::Int), ParamType::new(Type::Nil)],
            Type::Int,
        );
        let int_float = FnSig::new(
            vec![ParamType::new(Type::Int), ParamType::new(Type::Float)],
            Type::Int,
        );
        assert!(int_int.collides_with(&int_int));
        assert!(int_int.collides_with(&int_nil));
        assert!(!int_int.collides_with(&int_float));
    }

    #[test]
    fn printable_forms() {
        assert_eq!(Type::List(Box::new(Type::Int)).to_string(), "[Int]");
        assert_eq!(
            Type::Tuple(vec![Type::Int, Type::String]).to_string(),
            "(Int, String)"
        );
        assert_eq!(
            Type::Function {
                params: vec![Type::Int],
                ret: Box::new(Type::Bool),
            }
            .to_string(),
            "(Int) -> Bool"
        );
        assert_eq!(Type::Class("A".to_owned()).to_string(), "A");
    }
}
