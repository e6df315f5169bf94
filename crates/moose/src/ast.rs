//! AST node kinds consumed by the checker and the tree-walking evaluator.
//!
//! Every expression node carries a source location and an `ExprId`; the
//! checker records each expression's inferred type in a side table indexed
//! by that id (see `check`). The whole tree is plain owned data so a
//! compiled program can be serialized for caching.

use strum::Display;

use crate::{
    error::CodeLoc,
    types::{FnSig, ParamType, Type},
};

/// Index of an expression node into the checker's type side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub(crate) struct ExprId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Positional kind of an operator: where it stands relative to its
/// operand(s). Part of the dispatch key alongside name and argument types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum OpPos {
    Prefix,
    Infix,
    Postfix,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Expr {
    pub id: ExprId,
    pub loc: CodeLoc,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) enum ExprKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Nil,
    Ident(String),
    /// The current class instance.
    Me,
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    /// `value is T`: class-chain membership for instances, printable-form
    /// equality for everything else.
    Is { value: Box<Expr>, ty: Type },
    /// A call by name; whether it is a constructor call is decided by the
    /// class registries, not by syntax.
    Call { name: String, args: Vec<Expr> },
    /// Member access `object.member`; `member` is an identifier or a call.
    Deref { object: Box<Expr>, member: Box<Expr> },
    Index { object: Box<Expr>, index: Box<Expr> },
    Prefix { op: String, operand: Box<Expr> },
    Infix { op: String, left: Box<Expr>, right: Box<Expr> },
    Postfix { op: String, operand: Box<Expr> },
}

impl Expr {
    /// Short description used in panic traces and checker messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            ExprKind::Int(v) => format!("integer literal {v}"),
            ExprKind::Float(v) => format!("float literal {v}"),
            ExprKind::Bool(v) => format!("bool literal {v}"),
            ExprKind::Str(_) => "string literal".to_owned(),
            ExprKind::Nil => "nil".to_owned(),
            ExprKind::Ident(name) => format!("identifier '{name}'"),
            ExprKind::Me => "'me'".to_owned(),
            ExprKind::Tuple(_) => "tuple literal".to_owned(),
            ExprKind::List(_) => "list literal".to_owned(),
            ExprKind::Is { ty, .. } => format!("'is {ty}'"),
            ExprKind::Call { name, .. } => format!("call of '{name}'"),
            ExprKind::Deref { member, .. } => format!("member access of {}", member.describe()),
            ExprKind::Index { .. } => "index expression".to_owned(),
            ExprKind::Prefix { op, .. } => format!("prefix '{op}'"),
            ExprKind::Infix { op, .. } => format!("infix '{op}'"),
            ExprKind::Postfix { op, .. } => format!("postfix '{op}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Stmt {
    pub loc: CodeLoc,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) enum StmtKind {
    Assign(AssignStmt),
    /// `return expr` or a bare `return` (which yields Void).
    Return(Option<Expr>),
    Expr(Expr),
    Block(Block),
    If(IfStmt),
    Function(FunctionDecl),
    Operation(OperationDecl),
    Class(ClassDecl),
}

impl Stmt {
    pub fn describe(&self) -> String {
        match &self.kind {
            StmtKind::Assign(assign) => format!("assignment to {}", assign.target.describe()),
            StmtKind::Return(_) => "return statement".to_owned(),
            StmtKind::Expr(expr) => expr.describe(),
            StmtKind::Block(_) => "block".to_owned(),
            StmtKind::If(_) => "if statement".to_owned(),
            StmtKind::Function(f) => format!("function '{}'", f.name),
            StmtKind::Operation(o) => format!("{} operator '{}'", o.position, o.op),
            StmtKind::Class(c) => format!("class '{}'", c.name),
        }
    }
}

/// Assignment with an optional `mut` marker and type annotation.
///
/// The target is an ordinary expression restricted by the parser to the
/// assignable forms: identifier, tuple of targets, index, or dereferer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct AssignStmt {
    pub target: Expr,
    pub annotation: Option<Type>,
    pub mutable: bool,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct IfStmt {
    pub condition: Expr,
    pub consequence: Block,
    pub alternative: Option<Block>,
}

/// A declared parameter name with its type and mutability.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Param {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Block,
    pub loc: CodeLoc,
}

pub(crate) fn decl_sig(params: &[Param], ret: &Type) -> FnSig {
    FnSig::new(
        params
            .iter()
            .map(|p| ParamType {
                ty: p.ty.clone(),
                mutable: p.mutable,
            })
            .collect(),
        ret.clone(),
    )
}

impl FunctionDecl {
    pub fn sig(&self) -> FnSig {
        decl_sig(&self.params, &self.ret)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct OperationDecl {
    pub op: String,
    pub position: OpPos,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Block,
    pub loc: CodeLoc,
}

impl OperationDecl {
    pub fn sig(&self) -> FnSig {
        decl_sig(&self.params, &self.ret)
    }
}

/// A class property; order of declaration is the constructor's positional
/// argument order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct PropertyDecl {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
    pub loc: CodeLoc,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct ClassDecl {
    pub name: String,
    pub superclass: Option<String>,
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<FunctionDecl>,
    pub loc: CodeLoc,
}

/// A parsed program plus the number of expression nodes it contains (the
/// size of the checker's type side table).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Program {
    pub statements: Vec<Stmt>,
    pub expr_count: u32,
}
