//! Plain-data values handed back to the host.
//!
//! `Object` is the public mirror of the interpreter's internal values:
//! no environment references, no heap ids, just data a test or embedder
//! can assert against.

use std::fmt;

/// A Moose value as seen from outside the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// Any nil, typed or not; the static type does not survive the trip
    /// out of the interpreter.
    Nil,
    Void,
    Tuple(Vec<Object>),
    List(Vec<Object>),
    /// Functions and operators surface by name only.
    Function { name: String },
    Instance {
        class: String,
        /// Property name/value pairs in declaration order.
        fields: Vec<(String, Object)>,
    },
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(ryu::Buffer::new().format(*v)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
            Self::Nil => f.write_str("nil"),
            Self::Void => f.write_str("void"),
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
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Function { name } => write!(f, "<func {name}>"),
            Self::Instance { class, .. } => write!(f, "<{class} instance>"),
        }
    }
}

/// Snapshot of the global environment after a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Globals {
    vars: Vec<(String, Object)>,
}

impl Globals {
    pub(crate) fn new(vars: Vec<(String, Object)>) -> Self {
        Self { vars }
    }

    /// The value of one global variable, if defined.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.vars
            .iter()
            .find(|(var, _)| var == name)
            .map(|(_, value)| value)
    }

    /// All globals in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.vars.iter().map(|(name, value)| (name.as_str(), value))
    }
}
