//! Recursive-descent / Pratt parser producing the AST of `ast`.
//!
//! Parse errors are collected, not fatal: after an error the parser skips
//! to the next statement boundary and keeps going, so several errors can
//! be reported per run.

use std::str::FromStr;

use crate::{
    ast::{
        AssignStmt, Block, ClassDecl, Expr, ExprId, ExprKind, FunctionDecl, IfStmt, OpPos,
        OperationDecl, Param, Program, PropertyDecl, Stmt, StmtKind,
    },
    error::{CodeLoc, CompileError},
    token::{Keyword, Token, TokenKind},
};

/// Maximum expression nesting depth. Deeply nested sources like
/// `((((x))))` would otherwise overflow the parser's own stack.
const MAX_NESTING_DEPTH: u16 = 200;

/// Precedence of the `is` expression, between equality and comparisons.
const IS_PREC: u8 = 4;

type ParseResult<T> = Result<T, CompileError>;

pub(crate) fn parse(tokens: Vec<Token>) -> (Program, Vec<CompileError>) {
    let mut parser = Parser {
        tokens,
        pos: 0,
        errors: vec![],
        next_expr: 0,
        depth: 0,
    };
    let statements = parser.statements_until(&TokenKind::Eof);
    (
        Program {
            statements,
            expr_count: parser.next_expr,
        },
        parser.errors,
    )
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<CompileError>,
    next_expr: u32,
    depth: u16,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek2_kind(&self) -> &TokenKind {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn loc(&self) -> CodeLoc {
        self.peek().loc
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.peek_kind() == kind {
            Ok(self.bump())
        } else {
            Err(CompileError::new(
                format!("expected {kind}, found {}", self.peek_kind()),
                self.loc(),
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<(String, CodeLoc)> {
        let loc = self.loc();
        match self.peek_kind() {
            TokenKind::Ident(_) => {
                let TokenKind::Ident(name) = self.bump().kind else {
                    unreachable!()
                };
                Ok((name, loc))
            }
            other => Err(CompileError::new(
                format!("expected identifier, found {other}"),
                loc,
            )),
        }
    }

    fn expr(&mut self, loc: CodeLoc, kind: ExprKind) -> Expr {
        let id = ExprId(self.next_expr);
        self.next_expr += 1;
        Expr { id, loc, kind }
    }

    // --- statements ---

    /// Parses statements up to (not consuming) `end`, synchronizing on
    /// statement boundaries after each error.
    fn statements_until(&mut self, end: &TokenKind) -> Vec<Stmt> {
        let mut statements = vec![];
        while self.peek_kind() != end && *self.peek_kind() != TokenKind::Eof {
            let start = self.pos;
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                    // Guarantee progress on tokens synchronize stops at
                    // (a stray '}' at the top level, for example).
                    if self.pos == start && self.peek_kind() != end {
                        self.bump();
                    }
                }
            }
        }
        statements
    }

    /// Skips tokens until a likely statement start so one malformed
    /// statement does not swallow the rest of the program.
    fn synchronize(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::Keyword(
                    Keyword::Func
                    | Keyword::Class
                    | Keyword::If
                    | Keyword::Return
                    | Keyword::Mut
                    | Keyword::Prefix
                    | Keyword::Infix
                    | Keyword::Postfix,
                ) => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        let loc = self.loc();
        let kind = match self.peek_kind() {
            TokenKind::Keyword(Keyword::Func) => StmtKind::Function(self.function_decl()?),
            TokenKind::Keyword(Keyword::Class) => StmtKind::Class(self.class_decl()?),
            TokenKind::Keyword(Keyword::Prefix) => self.operation_decl(OpPos::Prefix)?,
            TokenKind::Keyword(Keyword::Infix) => self.operation_decl(OpPos::Infix)?,
            TokenKind::Keyword(Keyword::Postfix) => self.operation_decl(OpPos::Postfix)?,
            TokenKind::Keyword(Keyword::If) => StmtKind::If(self.if_stmt()?),
            TokenKind::Keyword(Keyword::Return) => self.return_stmt()?,
            TokenKind::Keyword(Keyword::Mut) => self.mut_assignment()?,
            TokenKind::LBrace => StmtKind::Block(self.block()?),
            _ => self.expr_or_assignment()?,
        };
        while self.eat(&TokenKind::Semicolon) {}
        Ok(Stmt { loc, kind })
    }

    fn block(&mut self) -> ParseResult<Block> {
        self.expect(&TokenKind::LBrace)?;
        let statements = self.statements_until(&TokenKind::RBrace);
        self.expect(&TokenKind::RBrace)?;
        Ok(Block { statements })
    }

    fn if_stmt(&mut self) -> ParseResult<IfStmt> {
        self.bump();
        let condition = self.expression(0)?;
        let consequence = self.block()?;
        let alternative = if self.eat(&TokenKind::Keyword(Keyword::Else)) {
            if *self.peek_kind() == TokenKind::Keyword(Keyword::If) {
                // else-if chains nest as a block holding one if statement
                let loc = self.loc();
                let nested = self.if_stmt()?;
                Some(Block {
                    statements: vec![Stmt {
                        loc,
                        kind: StmtKind::If(nested),
                    }],
                })
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        Ok(IfStmt {
            condition,
            consequence,
            alternative,
        })
    }

    fn return_stmt(&mut self) -> ParseResult<StmtKind> {
        self.bump();
        let value = if starts_expr(self.peek_kind()) {
            Some(self.expression(0)?)
        } else {
            None
        };
        Ok(StmtKind::Return(value))
    }

    fn mut_assignment(&mut self) -> ParseResult<StmtKind> {
        self.bump();
        let (name, loc) = self.expect_ident()?;
        let target = self.expr(loc, ExprKind::Ident(name));
        let annotation = if self.eat(&TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        self.expect(&TokenKind::Assign)?;
        let value = self.expression(0)?;
        Ok(StmtKind::Assign(AssignStmt {
            target,
            annotation,
            mutable: true,
            value,
        }))
    }

    fn expr_or_assignment(&mut self) -> ParseResult<StmtKind> {
        let expr = self.expression(0)?;
        if *self.peek_kind() == TokenKind::Colon {
            // `name: Type = value`
            if !matches!(expr.kind, ExprKind::Ident(_)) {
                return Err(CompileError::new(
                    "only a plain identifier can carry a type annotation",
                    expr.loc,
                ));
            }
            self.bump();
            let annotation = Some(self.type_expr()?);
            self.expect(&TokenKind::Assign)?;
            let value = self.expression(0)?;
            return Ok(StmtKind::Assign(AssignStmt {
                target: expr,
                annotation,
                mutable: false,
                value,
            }));
        }
        if self.eat(&TokenKind::Assign) {
            self.check_target(&expr)?;
            let value = self.expression(0)?;
            return Ok(StmtKind::Assign(AssignStmt {
                target: expr,
                annotation: None,
                mutable: false,
                value,
            }));
        }
        Ok(StmtKind::Expr(expr))
    }

    /// Restricts assignment targets to identifier, tuple of targets,
    /// index, or field access through a dereferer.
    fn check_target(&self, expr: &Expr) -> ParseResult<()> {
        match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Index { .. } => Ok(()),
            ExprKind::Tuple(items) => {
                for item in items {
                    self.check_target(item)?;
                }
                Ok(())
            }
            ExprKind::Deref { member, .. } => match member.kind {
                ExprKind::Ident(_) => Ok(()),
                _ => Err(CompileError::new(
                    "only a field can be assigned through member access",
                    expr.loc,
                )),
            },
            _ => Err(CompileError::new(
                format!("{} is not assignable", expr.describe()),
                expr.loc,
            )),
        }
    }

    // --- declarations ---

    fn function_decl(&mut self) -> ParseResult<FunctionDecl> {
        let loc = self.loc();
        self.bump();
        let (name, _) = self.expect_ident()?;
        let params = self.param_list()?;
        let ret = self.return_type()?;
        let body = self.block()?;
        Ok(FunctionDecl {
            name,
            params,
            ret,
            body,
            loc,
        })
    }

    fn operation_decl(&mut self, position: OpPos) -> ParseResult<StmtKind> {
        let loc = self.loc();
        self.bump();
        let op = match self.peek_kind() {
            TokenKind::Op(_) => {
                let TokenKind::Op(op) = self.bump().kind else {
                    unreachable!()
                };
                op
            }
            other => {
                return Err(CompileError::new(
                    format!("expected an operator symbol, found {other}"),
                    self.loc(),
                ));
            }
        };
        let params = self.param_list()?;
        let expected = match position {
            OpPos::Infix => 2,
            OpPos::Prefix | OpPos::Postfix => 1,
        };
        if params.len() != expected {
            return Err(CompileError::new(
                format!(
                    "{position} operator '{op}' must take exactly {expected} parameter{}",
                    if expected == 1 { "" } else { "s" }
                ),
                loc,
            ));
        }
        let ret = self.return_type()?;
        let body = self.block()?;
        Ok(StmtKind::Operation(OperationDecl {
            op,
            position,
            params,
            ret,
            body,
            loc,
        }))
    }

    fn class_decl(&mut self) -> ParseResult<ClassDecl> {
        let loc = self.loc();
        self.bump();
        let (name, _) = self.expect_ident()?;
        let superclass = if *self.peek_kind() == TokenKind::Op("<".to_owned()) {
            self.bump();
            Some(self.expect_ident()?.0)
        } else {
            None
        };
        self.expect(&TokenKind::LBrace)?;
        let mut properties = vec![];
        let mut methods = vec![];
        loop {
            match self.peek_kind() {
                TokenKind::RBrace => {
                    self.bump();
                    break;
                }
                TokenKind::Eof => {
                    return Err(CompileError::new(
                        format!("unterminated body of class '{name}'"),
                        loc,
                    ));
                }
                TokenKind::Keyword(Keyword::Func) => methods.push(self.function_decl()?),
                _ => {
                    let mutable = self.eat(&TokenKind::Keyword(Keyword::Mut));
                    let (prop_name, prop_loc) = self.expect_ident()?;
                    self.expect(&TokenKind::Colon)?;
                    let ty = self.type_expr()?;
                    if *self.peek_kind() == TokenKind::Assign {
                        return Err(CompileError::new(
                            format!(
                                "property '{prop_name}' cannot have a default value; \
                                 constructors bind every property positionally"
                            ),
                            self.loc(),
                        ));
                    }
                    while self.eat(&TokenKind::Semicolon) {}
                    properties.push(PropertyDecl {
                        name: prop_name,
                        ty,
                        mutable,
                        loc: prop_loc,
                    });
                }
            }
        }
        Ok(ClassDecl {
            name,
            superclass,
            properties,
            methods,
            loc,
        })
    }

    fn param_list(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(&TokenKind::LParen)?;
        let mut params = vec![];
        if *self.peek_kind() != TokenKind::RParen {
            loop {
                let mutable = self.eat(&TokenKind::Keyword(Keyword::Mut));
                let (name, _) = self.expect_ident()?;
                self.expect(&TokenKind::Colon)?;
                let ty = self.type_expr()?;
                params.push(Param { name, ty, mutable });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    fn return_type(&mut self) -> ParseResult<crate::types::Type> {
        if self.eat(&TokenKind::Arrow) {
            self.type_expr()
        } else {
            Ok(crate::types::Type::Void)
        }
    }

    // --- types ---

    fn type_expr(&mut self) -> ParseResult<crate::types::Type> {
        use crate::types::Type;
        let loc = self.loc();
        match self.peek_kind() {
            TokenKind::Ident(_) => {
                let TokenKind::Ident(name) = self.bump().kind else {
                    unreachable!()
                };
                Ok(Type::from_str(&name).unwrap_or(Type::Class(name)))
            }
            TokenKind::LBracket => {
                self.bump();
                let elem = self.type_expr()?;
                self.expect(&TokenKind::RBracket)?;
                Ok(Type::List(Box::new(elem)))
            }
            TokenKind::LParen => {
                self.bump();
                let mut items = vec![self.type_expr()?];
                while self.eat(&TokenKind::Comma) {
                    items.push(self.type_expr()?);
                }
                self.expect(&TokenKind::RParen)?;
                if self.eat(&TokenKind::Arrow) {
                    let ret = self.type_expr()?;
                    Ok(Type::Function {
                        params: items,
                        ret: Box::new(ret),
                    })
                } else if items.len() == 1 {
                    Ok(items.pop().expect("one element checked"))
                } else {
                    Ok(Type::Tuple(items))
                }
            }
            other => Err(CompileError::new(
                format!("expected a type, found {other}"),
                loc,
            )),
        }
    }

    // --- expressions ---

    fn expression(&mut self, min_prec: u8) -> ParseResult<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompileError::new(
                "expression nesting is too deep",
                self.loc(),
            ));
        }
        self.depth += 1;
        let result = self.expression_inner(min_prec);
        self.depth -= 1;
        result
    }

    fn expression_inner(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.unary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Is) if IS_PREC >= min_prec => {
                    self.bump();
                    let ty = self.type_expr()?;
                    let loc = left.loc;
                    left = self.expr(
                        loc,
                        ExprKind::Is {
                            value: Box::new(left),
                            ty,
                        },
                    );
                }
                TokenKind::Op(_) => {
                    let TokenKind::Op(op) = self.peek_kind().clone() else {
                        unreachable!()
                    };
                    // An operator is infix when an expression follows it,
                    // postfix otherwise (`a++;` or `f(b--)`).
                    if starts_expr(self.peek2_kind()) {
                        let prec = infix_precedence(&op);
                        if prec < min_prec {
                            break;
                        }
                        let loc = self.loc();
                        self.bump();
                        let right = self.expression(prec + 1)?;
                        left = self.expr(
                            loc,
                            ExprKind::Infix {
                                op,
                                left: Box::new(left),
                                right: Box::new(right),
                            },
                        );
                    } else {
                        let loc = self.loc();
                        self.bump();
                        left = self.expr(
                            loc,
                            ExprKind::Postfix {
                                op,
                                operand: Box::new(left),
                            },
                        );
                    }
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if let TokenKind::Op(_) = self.peek_kind() {
            let loc = self.loc();
            let TokenKind::Op(op) = self.bump().kind else {
                unreachable!()
            };
            if self.depth >= MAX_NESTING_DEPTH {
                return Err(CompileError::new("expression nesting is too deep", loc));
            }
            self.depth += 1;
            let operand = self.unary();
            self.depth -= 1;
            return Ok(self.expr(
                loc,
                ExprKind::Prefix {
                    op,
                    operand: Box::new(operand?),
                },
            ));
        }
        let primary = self.primary()?;
        self.suffixed(primary)
    }

    fn suffixed(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    let loc = self.loc();
                    self.bump();
                    let (name, member_loc) = self.expect_ident()?;
                    let member = if *self.peek_kind() == TokenKind::LParen {
                        let args = self.call_args()?;
                        self.expr(member_loc, ExprKind::Call { name, args })
                    } else {
                        self.expr(member_loc, ExprKind::Ident(name))
                    };
                    expr = self.expr(
                        loc,
                        ExprKind::Deref {
                            object: Box::new(expr),
                            member: Box::new(member),
                        },
                    );
                }
                TokenKind::LBracket => {
                    let loc = self.loc();
                    self.bump();
                    let index = self.expression(0)?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = self.expr(
                        loc,
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(&TokenKind::LParen)?;
        let mut args = vec![];
        if *self.peek_kind() != TokenKind::RParen {
            loop {
                args.push(self.expression(0)?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let loc = self.loc();
        match self.peek_kind().clone() {
            TokenKind::Int(v) => {
                self.bump();
                Ok(self.expr(loc, ExprKind::Int(v)))
            }
            TokenKind::Float(v) => {
                self.bump();
                Ok(self.expr(loc, ExprKind::Float(v)))
            }
            TokenKind::Str(_) => {
                let TokenKind::Str(v) = self.bump().kind else {
                    unreachable!()
                };
                Ok(self.expr(loc, ExprKind::Str(v)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                Ok(self.expr(loc, ExprKind::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Ok(self.expr(loc, ExprKind::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.bump();
                Ok(self.expr(loc, ExprKind::Nil))
            }
            TokenKind::Keyword(Keyword::Me) => {
                self.bump();
                Ok(self.expr(loc, ExprKind::Me))
            }
            TokenKind::Ident(_) => {
                let TokenKind::Ident(name) = self.bump().kind else {
                    unreachable!()
                };
                if *self.peek_kind() == TokenKind::LParen {
                    let args = self.call_args()?;
                    Ok(self.expr(loc, ExprKind::Call { name, args }))
                } else {
                    Ok(self.expr(loc, ExprKind::Ident(name)))
                }
            }
            TokenKind::LParen => {
                self.bump();
                let first = self.expression(0)?;
                if self.eat(&TokenKind::Comma) {
                    let mut items = vec![first];
                    loop {
                        items.push(self.expression(0)?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RParen)?;
                    Ok(self.expr(loc, ExprKind::Tuple(items)))
                } else {
                    self.expect(&TokenKind::RParen)?;
                    Ok(first)
                }
            }
            TokenKind::LBracket => {
                self.bump();
                let mut items = vec![];
                if *self.peek_kind() != TokenKind::RBracket {
                    loop {
                        items.push(self.expression(0)?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(self.expr(loc, ExprKind::List(items)))
            }
            other => Err(CompileError::new(
                format!("expected an expression, found {other}"),
                loc,
            )),
        }
    }
}

/// True when a token can begin an expression; used both for bare-return
/// detection and for deciding whether an operator is infix or postfix.
fn starts_expr(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident(_)
            | TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Op(_)
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::Keyword(
                Keyword::Me | Keyword::Nil | Keyword::True | Keyword::False
            )
    )
}

/// Infix precedence keyed on the operator's spelling; user-defined
/// operators inherit the precedence of their leading character.
fn infix_precedence(op: &str) -> u8 {
    match op {
        "||" => 2,
        "&&" => 3,
        _ => match op.chars().next() {
            Some('=' | '!') => 4,
            Some('<' | '>') => 5,
            Some('+' | '-') => 6,
            Some('*' | '/' | '%') => 7,
            _ => 8,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::lex;

    fn parse_ok(source: &str) -> Program {
        let (tokens, lex_errors) = lex(source);
        assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
        let (program, errors) = parse(tokens);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        program
    }

    fn parse_errs(source: &str) -> Vec<CompileError> {
        let (tokens, _) = lex(source);
        parse(tokens).1
    }

    #[test]
    fn precedence_and_associativity() {
        let program = parse_ok("a = 1 + 2 * 3 - 4");
        let StmtKind::Assign(assign) = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        // ((1 + (2 * 3)) - 4)
        let ExprKind::Infix { op, left, .. } = &assign.value.kind else {
            panic!("expected infix");
        };
        assert_eq!(op, "-");
        let ExprKind::Infix { op, right, .. } = &left.kind else {
            panic!("expected nested infix");
        };
        assert_eq!(op, "+");
        assert!(matches!(right.kind, ExprKind::Infix { .. }));
    }

    #[test]
    fn postfix_when_nothing_follows() {
        let program = parse_ok("a++");
        let StmtKind::Expr(expr) = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        assert!(matches!(&expr.kind, ExprKind::Postfix { op, .. } if op == "++"));
    }

    #[test]
    fn tuple_destructuring_target() {
        let program = parse_ok("(a, b) = (1, 2)");
        let StmtKind::Assign(assign) = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(&assign.target.kind, ExprKind::Tuple(items) if items.len() == 2));
    }

    #[test]
    fn annotated_and_mut_assignments() {
        let program = parse_ok("a: Int = 5; mut b: [Int] = [1]; mut c = 2");
        assert_eq!(program.statements.len(), 3);
        let StmtKind::Assign(a) = &program.statements[0].kind else {
            panic!()
        };
        assert_eq!(a.annotation, Some(crate::types::Type::Int));
        assert!(!a.mutable);
        let StmtKind::Assign(b) = &program.statements[1].kind else {
            panic!()
        };
        assert!(b.mutable);
        assert_eq!(
            b.annotation,
            Some(crate::types::Type::List(Box::new(crate::types::Type::Int)))
        );
    }

    #[test]
    fn class_with_superclass_and_method() {
        let program = parse_ok("class B < A { x: Int\n func get() -> Int { return me.x } }");
        let StmtKind::Class(class) = &program.statements[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.name, "B");
        assert_eq!(class.superclass.as_deref(), Some("A"));
        assert_eq!(class.properties.len(), 1);
        assert_eq!(class.methods.len(), 1);
    }

    #[test]
    fn operator_declaration_arity_is_checked() {
        let errors = parse_errs("infix +(a: Int) -> Int { return a }");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("exactly 2 parameters"));
    }

    #[test]
    fn property_defaults_are_rejected() {
        let errors = parse_errs("class A { x: Int = 5 }");
        assert!(!errors.is_empty());
        assert!(errors[0].message.contains("default value"));
    }

    #[test]
    fn recovery_reports_multiple_errors() {
        let errors = parse_errs("a = ; b = ; c = 1");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn deref_call_and_index_chain() {
        let program = parse_ok("x = l[0].toString()");
        let StmtKind::Assign(assign) = &program.statements[0].kind else {
            panic!()
        };
        let ExprKind::Deref { object, member } = &assign.value.kind else {
            panic!("expected deref");
        };
        assert!(matches!(object.kind, ExprKind::Index { .. }));
        assert!(matches!(&member.kind, ExprKind::Call { name, .. } if name == "toString"));
    }

    #[test]
    fn is_expression() {
        let program = parse_ok("t = b is A");
        let StmtKind::Assign(assign) = &program.statements[0].kind else {
            panic!()
        };
        assert!(
            matches!(&assign.value.kind, ExprKind::Is { ty, .. } if *ty == crate::types::Type::Class("A".to_owned()))
        );
    }

    #[test]
    fn function_type_annotation() {
        let program = parse_ok("f: (Int, Int) -> Int = g");
        let StmtKind::Assign(assign) = &program.statements[0].kind else {
            panic!()
        };
        assert!(matches!(
            assign.annotation,
            Some(crate::types::Type::Function { .. })
        ));
    }
}
