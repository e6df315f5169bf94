//! Runtime values.
//!
//! Scalars carry an optional payload because the language permits a typed
//! nil: `Int(None)` is a nil that still answers `Int` to type queries.
//! Lists are mutable in place, so their storage lives in a side arena
//! (`Heap`) addressed by `ListId`; everything else is an immediate value
//! or a cheaply clonable `Rc`. Function bodies are borrowed from the
//! checked program, which outlives every evaluation.

use std::rc::Rc;

use crate::{
    ast::{Block, OpPos, Param},
    builtins::{BuiltinFn, BuiltinOp},
    scope::ScopeId,
    types::{FnSig, ParamType, Type},
};

/// Index of a list's storage in the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListId(u32);

impl ListId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub(crate) struct ListObj<'a> {
    pub items: Vec<Value<'a>>,
}

/// Arena for list payloads. Allocations live until the interpreter
/// instance drops; the language constructs no unreachable garbage worth
/// collecting inside one run.
#[derive(Debug, Default)]
pub(crate) struct Heap<'a> {
    lists: Vec<ListObj<'a>>,
}

impl<'a> Heap<'a> {
    pub fn alloc_list(&mut self, items: Vec<Value<'a>>) -> ListId {
        let id = ListId(u32::try_from(self.lists.len()).expect("heap exceeds u32 indices"));
        self.lists.push(ListObj { items });
        id
    }

    pub fn list(&self, id: ListId) -> &ListObj<'a> {
        &self.lists[id.index()]
    }

    pub fn list_mut(&mut self, id: ListId) -> &mut ListObj<'a> {
        &mut self.lists[id.index()]
    }
}

/// A user-defined function or operator: its signature plus the AST body
/// and captured environment. Method rebinding at construction clones this
/// with a fresh `closure`.
#[derive(Debug)]
pub(crate) struct FuncValue<'a> {
    pub name: &'a str,
    pub position: Option<OpPos>,
    pub sig: FnSig,
    pub params: &'a [Param],
    pub body: &'a Block,
    pub closure: ScopeId,
}

impl<'a> FuncValue<'a> {
    pub fn rebound(&self, closure: ScopeId) -> Self {
        Self {
            name: self.name,
            position: self.position,
            sig: self.sig.clone(),
            params: self.params,
            body: self.body,
            closure,
        }
    }
}

#[derive(Debug)]
pub(crate) struct InstanceValue {
    pub class: String,
    /// `None` is a typed nil instance: it knows its class but holds no
    /// environment, and any member access panics with NilUsage.
    pub env: Option<ScopeId>,
}

#[derive(Debug, Clone)]
pub(crate) enum Value<'a> {
    Int(Option<i64>),
    Float(Option<f64>),
    Bool(Option<bool>),
    Str(Option<Rc<str>>),
    /// The untyped nil literal, before assignment or binding retypes it.
    Nil,
    /// Result of statements and of a bare `return`.
    Void,
    /// Immutable; carries its full tuple type.
    Tuple(Type, Rc<Vec<Value<'a>>>),
    /// Element type plus storage; `None` storage is a typed nil list.
    List(Type, Option<ListId>),
    Function(Rc<FuncValue<'a>>),
    BuiltinFn(BuiltinFn),
    Operator(Rc<FuncValue<'a>>),
    BuiltinOp(BuiltinOp),
    Instance(Rc<InstanceValue>),
}

impl<'a> Value<'a> {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Self::Str(Some(s.into()))
    }

    /// The value's Moose type; nil slots keep their declared type.
    pub fn type_of(&self) -> Type {
        match self {
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::Bool(_) => Type::Bool,
            Self::Str(_) => Type::String,
            Self::Nil => Type::Nil,
            Self::Void => Type::Void,
            Self::Tuple(ty, _) => ty.clone(),
            Self::List(elem, _) => Type::List(Box::new(elem.clone())),
            Self::Function(f) | Self::Operator(f) => Type::Function {
                params: f.sig.param_types().cloned().collect(),
                ret: Box::new(f.sig.ret.clone()),
            },
            Self::BuiltinFn(b) => b.fn_type(),
            Self::BuiltinOp(b) => b.fn_type(),
            Self::Instance(instance) => Type::Class(instance.class.clone()),
        }
    }

    /// True when the payload slot is empty (a typed or untyped nil).
    pub fn is_nil(&self) -> bool {
        match self {
            Self::Nil => true,
            Self::Int(v) => v.is_none(),
            Self::Float(v) => v.is_none(),
            Self::Bool(v) => v.is_none(),
            Self::Str(v) => v.is_none(),
            Self::List(_, storage) => storage.is_none(),
            Self::Instance(instance) => instance.env.is_none(),
            _ => false,
        }
    }

    /// A nil value retyped to `ty`, used when assigning or binding the
    /// raw `nil` literal against a declared type. Tuples become tuples of
    /// nil components; types without a nil slot keep the raw nil.
    pub fn nil_of(ty: &Type) -> Self {
        match ty {
            Type::Int => Self::Int(None),
            Type::Float => Self::Float(None),
            Type::Bool => Self::Bool(None),
            Type::String => Self::Str(None),
            Type::Tuple(items) => Self::Tuple(
                ty.clone(),
                Rc::new(items.iter().map(Self::nil_of).collect()),
            ),
            Type::List(elem) => Self::List((**elem).clone(), None),
            Type::Class(name) => Self::Instance(Rc::new(InstanceValue {
                class: name.clone(),
                env: None,
            })),
            Type::Nil | Type::Void | Type::Function { .. } => Self::Nil,
        }
    }

    /// Printable form, used by `toString`, `print` and panic payloads.
    pub fn display(&self, heap: &Heap<'a>) -> String {
        match self {
            Self::Int(Some(v)) => v.to_string(),
            Self::Float(Some(v)) => ryu::Buffer::new().format(*v).to_owned(),
            Self::Bool(Some(v)) => v.to_string(),
            Self::Str(Some(v)) => v.to_string(),
            Self::Nil
            | Self::Int(None)
            | Self::Float(None)
            | Self::Bool(None)
            | Self::Str(None)
            | Self::List(_, None) => "nil".to_owned(),
            Self::Void => "void".to_owned(),
            Self::Tuple(_, items) => {
                let parts: Vec<String> = items.iter().map(|v| v.display(heap)).collect();
                format!("({})", parts.join(", "))
            }
            Self::List(_, Some(id)) => {
                let parts: Vec<String> = heap
                    .list(*id)
                    .items
                    .iter()
                    .map(|v| v.display(heap))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Function(f) => format!("<func {}{}>", f.name, f.sig),
            Self::Operator(f) => {
                let position = f.position.map_or_else(String::new, |p| format!("{p} "));
                format!("<{position}operator {}{}>", f.name, f.sig)
            }
            Self::BuiltinFn(b) => format!("<built-in func {}>", b.name()),
            Self::BuiltinOp(b) => format!("<built-in operator {}>", b.name()),
            Self::Instance(instance) => {
                if instance.env.is_none() {
                    "nil".to_owned()
                } else {
                    format!("<{} instance>", instance.class)
                }
            }
        }
    }
}

/// Signature helper for the built-in tables.
pub(crate) fn sig_of(params: &[Type], ret: Type) -> FnSig {
    FnSig::new(
        params.iter().cloned().map(ParamType::new).collect(),
        ret,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_nils_keep_their_type() {
        assert_eq!(Value::nil_of(&Type::Int).type_of(), Type::Int);
        assert!(Value::nil_of(&Type::Int).is_nil());
        let tuple = Value::nil_of(&Type::Tuple(vec![Type::Int, Type::String]));
        let Value::Tuple(_, items) = &tuple else {
            panic!("expected a tuple of nils");
        };
        assert!(items.iter().all(Value::is_nil));
    }

    #[test]
    fn display_forms() {
        let mut heap = Heap::default();
        let id = heap.alloc_list(vec![Value::Int(Some(1)), Value::Int(Some(2))]);
        assert_eq!(Value::List(Type::Int, Some(id)).display(&heap), "[1, 2]");
        assert_eq!(Value::Float(Some(2.0)).display(&heap), "2.0");
        assert_eq!(Value::Int(None).display(&heap), "nil");
        assert_eq!(
            Value::Tuple(
                Type::Tuple(vec![Type::Int, Type::Bool]),
                Rc::new(vec![Value::Int(Some(1)), Value::Bool(Some(true))])
            )
            .display(&heap),
            "(1, true)"
        );
    }
}
