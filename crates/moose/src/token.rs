//! Tokens produced by the lexer.

use std::fmt;

use strum::EnumString;

use crate::error::CodeLoc;

/// Reserved words. Parsed from identifiers via strum's `EnumString`
/// (lowercase spellings match the source forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Keyword {
    Mut,
    Func,
    Class,
    If,
    Else,
    Return,
    Prefix,
    Infix,
    Postfix,
    Is,
    Me,
    Nil,
    True,
    False,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) enum TokenKind {
    Ident(String),
    Keyword(Keyword),
    Int(i64),
    Float(f64),
    Str(String),
    /// A maximal run of operator symbol characters, e.g. `+`, `==`, `++`.
    Op(String),
    /// A bare `=`, split out of the operator runs because it introduces
    /// assignment rather than an infix expression.
    Assign,
    /// `->` in function and operator signatures.
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier '{name}'"),
            Self::Keyword(kw) => write!(f, "'{}'", format!("{kw:?}").to_lowercase()),
            Self::Int(v) => write!(f, "integer {v}"),
            Self::Float(v) => write!(f, "float {v}"),
            Self::Str(_) => f.write_str("string literal"),
            Self::Op(op) => write!(f, "operator '{op}'"),
            Self::Assign => f.write_str("'='"),
            Self::Arrow => f.write_str("'->'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::Comma => f.write_str("','"),
            Self::Colon => f.write_str("':'"),
            Self::Semicolon => f.write_str("';'"),
            Self::Dot => f.write_str("'.'"),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub loc: CodeLoc,
}

impl Token {
    pub fn new(kind: TokenKind, loc: CodeLoc) -> Self {
        Self { kind, loc }
    }
}
