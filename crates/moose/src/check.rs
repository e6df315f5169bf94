//! The type checker.
//!
//! Walks the program with the type-side scope arena, records every
//! expression's inferred type into a side table indexed by `ExprId`, and
//! collects errors in bulk: one bad statement is reported and skipped so
//! the next statement is still checked.

use crate::{
    ast::{
        AssignStmt, Block, ClassDecl, Expr, ExprKind, IfStmt, OpPos, Param, Program, Stmt,
        StmtKind,
    },
    builtins::{self, BuiltinScopes},
    classes::ClassTable,
    error::{CompileError, format_call},
    explore::{explore_globals, register_signature},
    scope::{LookupError, ScopeArena, ScopeId, ScopeKind},
    types::Type,
};

/// A variable declaration: its type and whether re-assignment is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VarDecl {
    pub ty: Type,
    pub mutable: bool,
}

/// The type-side instantiation of the scope arena. Overload tables carry
/// no payload beyond the signature itself.
pub(crate) type TypeScopes = ScopeArena<VarDecl, ()>;

type CheckResult<T> = Result<T, CompileError>;

/// Checks a parsed program. On success returns the expression type side
/// table (indexed by `ExprId`); on failure, all collected errors.
pub(crate) fn check(program: &Program) -> Result<Vec<Option<Type>>, Vec<CompileError>> {
    let mut scopes = TypeScopes::new();
    let global = scopes.alloc(ScopeId::ROOT, ScopeKind::Global);
    let builtins = builtins::seed(&mut scopes, ScopeId::ROOT, |_| (), |_| ());
    let mut classes = ClassTable::default();
    let mut errors = explore_globals(program, &mut scopes, &mut classes, global);

    let mut checker = Checker {
        scopes,
        classes,
        builtins,
        global,
        current: global,
        errors: vec![],
        expr_types: vec![None; program.expr_count as usize],
        ret_stack: vec![],
    };
    for stmt in &program.statements {
        checker.check_stmt_caught(stmt);
    }
    errors.extend(checker.errors);
    if errors.is_empty() {
        Ok(checker.expr_types)
    } else {
        Err(errors)
    }
}

struct Checker {
    scopes: TypeScopes,
    classes: ClassTable,
    builtins: BuiltinScopes,
    global: ScopeId,
    current: ScopeId,
    errors: Vec<CompileError>,
    expr_types: Vec<Option<Type>>,
    /// Return types of the enclosing function declarations, innermost
    /// last.
    ret_stack: Vec<Type>,
}

impl Checker {
    fn record(&mut self, expr: &Expr, ty: Type) -> Type {
        self.expr_types[expr.id.index()] = Some(ty.clone());
        ty
    }

    fn check_stmt_caught(&mut self, stmt: &Stmt) {
        if let Err(error) = self.check_stmt(stmt) {
            self.errors.push(error);
        }
    }

    fn check_block_scoped(&mut self, block: &Block) {
        let scope = self.scopes.alloc(self.current, ScopeKind::Block);
        let saved = std::mem::replace(&mut self.current, scope);
        for stmt in &block.statements {
            self.check_stmt_caught(stmt);
        }
        self.current = saved;
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> CheckResult<()> {
        match &stmt.kind {
            StmtKind::Assign(assign) => self.check_assign(assign),
            StmtKind::Return(value) => self.check_return(stmt, value.as_ref()),
            StmtKind::Expr(expr) => self.check_expr(expr).map(|_| ()),
            StmtKind::Block(block) => {
                self.check_block_scoped(block);
                Ok(())
            }
            StmtKind::If(if_stmt) => self.check_if(if_stmt),
            StmtKind::Function(func) => {
                if self.current != self.global {
                    register_signature(
                        stmt,
                        &mut self.scopes,
                        &self.classes,
                        self.current,
                        &mut self.errors,
                    );
                }
                self.check_callable_body(&func.params, &func.ret, &func.body, func.loc)
            }
            StmtKind::Operation(oper) => {
                if self.current != self.global {
                    register_signature(
                        stmt,
                        &mut self.scopes,
                        &self.classes,
                        self.current,
                        &mut self.errors,
                    );
                }
                self.check_callable_body(&oper.params, &oper.ret, &oper.body, oper.loc)
            }
            StmtKind::Class(class) => self.check_class(stmt, class),
        }
    }

    fn check_return(&mut self, stmt: &Stmt, value: Option<&Expr>) -> CheckResult<()> {
        let Some(expected) = self.ret_stack.last().cloned() else {
            return Err(CompileError::new(
                "'return' outside of a function or operator",
                stmt.loc,
            ));
        };
        let found = match value {
            Some(expr) => self.check_expr(expr)?,
            None => Type::Void,
        };
        if expected.super_of(&found, &self.classes) {
            Ok(())
        } else {
            Err(CompileError::new(
                format!("return type mismatch: expected {expected}, found {found}"),
                stmt.loc,
            ))
        }
    }

    fn check_if(&mut self, if_stmt: &IfStmt) -> CheckResult<()> {
        let cond = self.check_expr(&if_stmt.condition)?;
        if !Type::Bool.super_of(&cond, &self.classes) {
            return Err(CompileError::new(
                format!("if condition must be Bool, found {cond}"),
                if_stmt.condition.loc,
            ));
        }
        self.check_block_scoped(&if_stmt.consequence);
        if let Some(alternative) = &if_stmt.alternative {
            self.check_block_scoped(alternative);
        }
        Ok(())
    }

    /// Checks a function or operator body in a fresh frame with its
    /// parameters bound, tracking the expected return type.
    fn check_callable_body(
        &mut self,
        params: &[Param],
        ret: &Type,
        body: &Block,
        loc: crate::error::CodeLoc,
    ) -> CheckResult<()> {
        self.validate_type(ret, loc)?;
        let frame = self.scopes.alloc(self.current, ScopeKind::Block);
        for param in params {
            self.validate_type(&param.ty, loc)?;
            if self.scopes.var_local(frame, &param.name).is_some() {
                return Err(CompileError::new(
                    format!("parameter '{}' is declared twice", param.name),
                    loc,
                ));
            }
            self.scopes.define_var(
                frame,
                &param.name,
                VarDecl {
                    ty: param.ty.clone(),
                    mutable: param.mutable,
                },
            );
        }
        self.ret_stack.push(ret.clone());
        let saved = std::mem::replace(&mut self.current, frame);
        for stmt in &body.statements {
            self.check_stmt_caught(stmt);
        }
        self.current = saved;
        self.ret_stack.pop();
        Ok(())
    }

    fn check_class(&mut self, stmt: &Stmt, class: &ClassDecl) -> CheckResult<()> {
        if self.current != self.global {
            // A local class registers into the current scope, then joins
            // the shared table and flattens immediately.
            let class_scope = self.scopes.alloc(
                self.current,
                ScopeKind::Class {
                    name: class.name.clone(),
                },
            );
            if !self.classes.add(
                &class.name,
                class_scope,
                class.superclass.clone(),
                class.loc,
            ) {
                return Err(CompileError::new(
                    format!("class '{}' is defined twice", class.name),
                    class.loc,
                ));
            }
            self.scopes.add_class(self.current, &class.name, class_scope);
            register_signature(
                stmt,
                &mut self.scopes,
                &self.classes,
                self.current,
                &mut self.errors,
            );
            let ancestry_errors = self.classes.resolve_ancestry();
            let ok = ancestry_errors.is_empty();
            self.errors.extend(ancestry_errors);
            if ok {
                self.classes.flatten(&class.name, &mut self.scopes)?;
            }
        }
        let Some(meta) = self.classes.get(&class.name) else {
            return Ok(()); // duplicate, already reported
        };
        let class_scope = meta.scope;
        for property in &class.properties {
            self.validate_type(&property.ty, property.loc)?;
        }
        let saved = std::mem::replace(&mut self.current, class_scope);
        for method in &class.methods {
            if let Err(error) =
                self.check_callable_body(&method.params, &method.ret, &method.body, method.loc)
            {
                self.errors.push(error);
            }
        }
        self.current = saved;
        Ok(())
    }

    fn check_assign(&mut self, assign: &AssignStmt) -> CheckResult<()> {
        let value_ty = self.check_expr(&assign.value)?;
        self.assign_target(
            &assign.target,
            &value_ty,
            assign.annotation.as_ref(),
            assign.mutable,
        )
    }

    fn assign_target(
        &mut self,
        target: &Expr,
        value_ty: &Type,
        annotation: Option<&Type>,
        mutable: bool,
    ) -> CheckResult<()> {
        match &target.kind {
            ExprKind::Ident(name) => self.assign_ident(target, name, value_ty, annotation, mutable),
            ExprKind::Tuple(items) => {
                let Type::Tuple(components) = value_ty else {
                    return Err(CompileError::new(
                        format!("cannot destructure a {value_ty} into a tuple of targets"),
                        target.loc,
                    ));
                };
                if components.len() != items.len() {
                    return Err(CompileError::new(
                        format!(
                            "cannot destructure a tuple of {} values into {} targets",
                            components.len(),
                            items.len()
                        ),
                        target.loc,
                    ));
                }
                for (item, component) in items.iter().zip(components) {
                    self.assign_target(item, component, None, false)?;
                }
                self.record(target, value_ty.clone());
                Ok(())
            }
            ExprKind::Index { object, index } => {
                let object_ty = self.check_expr(object)?;
                let index_ty = self.check_expr(index)?;
                let Type::List(elem) = object_ty else {
                    return Err(CompileError::new(
                        format!("cannot assign into an index of a {object_ty}"),
                        target.loc,
                    ));
                };
                if !Type::Int.super_of(&index_ty, &self.classes) {
                    return Err(CompileError::new(
                        format!("list index must be Int, found {index_ty}"),
                        index.loc,
                    ));
                }
                if !elem.super_of(value_ty, &self.classes) {
                    return Err(CompileError::new(
                        format!("cannot assign a {value_ty} into a list of {elem}"),
                        target.loc,
                    ));
                }
                self.record(target, *elem);
                Ok(())
            }
            ExprKind::Deref { object, member } => {
                self.assign_field(target, object, member, value_ty)
            }
            _ => Err(CompileError::new(
                format!("{} is not assignable", target.describe()),
                target.loc,
            )),
        }
    }

    fn assign_ident(
        &mut self,
        target: &Expr,
        name: &str,
        value_ty: &Type,
        annotation: Option<&Type>,
        mutable: bool,
    ) -> CheckResult<()> {
        if name == "global" {
            return Err(CompileError::new(
                "cannot assign to the reserved identifier 'global'",
                target.loc,
            ));
        }
        let declares = annotation.is_some() || mutable;
        if let Some((scope, decl)) = self.scopes.lookup_var(self.current, name) {
            let decl = decl.clone();
            if declares {
                if scope == self.current {
                    return Err(CompileError::new(
                        format!("'{name}' is already declared in this scope"),
                        target.loc,
                    ));
                }
                // shadowing declaration in an inner scope falls through
            } else {
                if !decl.mutable {
                    return Err(CompileError::new(
                        format!("cannot assign twice to immutable variable '{name}'"),
                        target.loc,
                    ));
                }
                if !decl.ty.super_of(value_ty, &self.classes) {
                    return Err(CompileError::new(
                        format!(
                            "cannot assign a {value_ty} to '{name}' of type {}",
                            decl.ty
                        ),
                        target.loc,
                    ));
                }
                self.record(target, decl.ty);
                return Ok(());
            }
        }
        let ty = match annotation {
            Some(annotated) => {
                self.validate_type(annotated, target.loc)?;
                if !annotated.super_of(value_ty, &self.classes) {
                    return Err(CompileError::new(
                        format!("cannot assign a {value_ty} to '{name}' of type {annotated}"),
                        target.loc,
                    ));
                }
                annotated.clone()
            }
            None => match value_ty {
                Type::Nil => {
                    return Err(CompileError::new(
                        format!("cannot infer the type of '{name}' from nil; add an annotation"),
                        target.loc,
                    ));
                }
                Type::Void => {
                    return Err(CompileError::new(
                        format!("cannot assign a Void value to '{name}'"),
                        target.loc,
                    ));
                }
                ty => ty.clone(),
            },
        };
        self.scopes.define_var(
            self.current,
            name,
            VarDecl {
                ty: ty.clone(),
                mutable,
            },
        );
        self.record(target, ty);
        Ok(())
    }

    fn assign_field(
        &mut self,
        target: &Expr,
        object: &Expr,
        member: &Expr,
        value_ty: &Type,
    ) -> CheckResult<()> {
        let ExprKind::Ident(field) = &member.kind else {
            return Err(CompileError::new(
                "only a field can be assigned through member access",
                target.loc,
            ));
        };
        let member_scope = self.member_scope_of(object)?;
        let Some(decl) = self.scopes.var_local(member_scope, field) else {
            return Err(CompileError::new(
                format!("no field '{field}' behind {}", object.describe()),
                member.loc,
            ));
        };
        let decl = decl.clone();
        if !decl.mutable {
            return Err(CompileError::new(
                format!("cannot assign to immutable field '{field}'"),
                target.loc,
            ));
        }
        if !decl.ty.super_of(value_ty, &self.classes) {
            return Err(CompileError::new(
                format!("cannot assign a {value_ty} to field '{field}' of type {}", decl.ty),
                target.loc,
            ));
        }
        self.record(member, decl.ty.clone());
        self.record(target, decl.ty);
        Ok(())
    }

    /// The scope a member access on `object` resolves in: the global
    /// scope for the reserved `global` accessor, a class scope for
    /// instances, a built-in member scope for primitives.
    fn member_scope_of(&mut self, object: &Expr) -> CheckResult<ScopeId> {
        if matches!(&object.kind, ExprKind::Ident(name) if name == "global") {
            return Ok(self.global);
        }
        let object_ty = self.check_expr(object)?;
        if let Type::Class(name) = &object_ty {
            let meta = self.classes.get(name).ok_or_else(|| {
                CompileError::new(format!("unknown class '{name}'"), object.loc)
            })?;
            return Ok(meta.scope);
        }
        self.builtins.for_type(&object_ty).ok_or_else(|| {
            CompileError::new(
                format!("a {object_ty} has no members"),
                object.loc,
            )
        })
    }

    fn check_expr(&mut self, expr: &Expr) -> CheckResult<Type> {
        match &expr.kind {
            ExprKind::Int(_) => Ok(self.record(expr, Type::Int)),
            ExprKind::Float(_) => Ok(self.record(expr, Type::Float)),
            ExprKind::Bool(_) => Ok(self.record(expr, Type::Bool)),
            ExprKind::Str(_) => Ok(self.record(expr, Type::String)),
            ExprKind::Nil => Ok(self.record(expr, Type::Nil)),
            ExprKind::Ident(name) => {
                if name == "global" {
                    return Err(CompileError::new(
                        "'global' is only valid as the object of a member access",
                        expr.loc,
                    ));
                }
                match self.scopes.lookup_var(self.current, name) {
                    Some((_, decl)) => {
                        let ty = decl.ty.clone();
                        Ok(self.record(expr, ty))
                    }
                    None => Err(CompileError::new(
                        format!("unknown variable '{name}'"),
                        expr.loc,
                    )),
                }
            }
            ExprKind::Me => {
                let Some(class_scope) = self.scopes.nearest_class_scope(self.current) else {
                    return Err(CompileError::new("'me' outside of a class", expr.loc));
                };
                let ScopeKind::Class { name } = &self.scopes.get(class_scope).kind else {
                    return Err(CompileError::new("'me' outside of a class", expr.loc));
                };
                let ty = Type::Class(name.clone());
                Ok(self.record(expr, ty))
            }
            ExprKind::Tuple(items) => {
                let types = items
                    .iter()
                    .map(|item| self.check_expr(item))
                    .collect::<CheckResult<Vec<Type>>>()?;
                Ok(self.record(expr, Type::Tuple(types)))
            }
            ExprKind::List(items) => {
                let mut elem = Type::Nil;
                for item in items {
                    let ty = self.check_expr(item)?;
                    elem = unify(&elem, &ty, &self.classes).ok_or_else(|| {
                        CompileError::new(
                            format!("list elements have mixed types {elem} and {ty}"),
                            item.loc,
                        )
                    })?;
                }
                Ok(self.record(expr, Type::List(Box::new(elem))))
            }
            ExprKind::Is { value, ty } => {
                self.check_expr(value)?;
                if let Type::Class(name) = ty
                    && self.classes.get(name).is_none()
                {
                    return Err(CompileError::new(
                        format!("unknown class '{name}'"),
                        expr.loc,
                    ));
                }
                Ok(self.record(expr, Type::Bool))
            }
            ExprKind::Call { name, args } => self.check_call(expr, name, args),
            ExprKind::Deref { object, member } => {
                let member_scope = self.member_scope_of(object)?;
                let ty = self.check_member(member_scope, object, member)?;
                Ok(self.record(expr, ty))
            }
            ExprKind::Index { object, index } => {
                let object_ty = self.check_expr(object)?;
                let index_ty = self.check_expr(index)?;
                let Type::List(elem) = object_ty else {
                    return Err(CompileError::new(
                        format!("a {object_ty} cannot be indexed"),
                        expr.loc,
                    ));
                };
                if !Type::Int.super_of(&index_ty, &self.classes) {
                    return Err(CompileError::new(
                        format!("list index must be Int, found {index_ty}"),
                        index.loc,
                    ));
                }
                Ok(self.record(expr, *elem))
            }
            ExprKind::Prefix { op, operand } => {
                let ty = self.check_expr(operand)?;
                self.check_op(expr, op, OpPos::Prefix, &[ty])
            }
            ExprKind::Infix { op, left, right } => {
                let left_ty = self.check_expr(left)?;
                let right_ty = self.check_expr(right)?;
                self.check_op(expr, op, OpPos::Infix, &[left_ty, right_ty])
            }
            ExprKind::Postfix { op, operand } => {
                let ty = self.check_expr(operand)?;
                self.check_op(expr, op, OpPos::Postfix, &[ty])
            }
        }
    }

    fn check_call(&mut self, expr: &Expr, name: &str, args: &[Expr]) -> CheckResult<Type> {
        let arg_types = args
            .iter()
            .map(|arg| self.check_expr(arg))
            .collect::<CheckResult<Vec<Type>>>()?;
        if let Some(class_scope) = self.scopes.lookup_class(self.current, name) {
            let props: Vec<(String, Type)> = self
                .scopes
                .vars(class_scope)
                .map(|(prop, decl)| (prop.clone(), decl.ty.clone()))
                .collect();
            if props.len() != arg_types.len() {
                return Err(CompileError::new(
                    format!(
                        "constructor of '{name}' expects {} argument{}, found {}",
                        props.len(),
                        if props.len() == 1 { "" } else { "s" },
                        arg_types.len()
                    ),
                    expr.loc,
                ));
            }
            for ((prop, prop_ty), arg_ty) in props.iter().zip(&arg_types) {
                if !prop_ty.super_of(arg_ty, &self.classes) {
                    return Err(CompileError::new(
                        format!(
                            "constructor of '{name}' expects a {prop_ty} for property '{prop}', found {arg_ty}"
                        ),
                        expr.loc,
                    ));
                }
            }
            return Ok(self.record(expr, Type::Class(name.to_owned())));
        }
        match self.scopes.lookup_func(self.current, name, &arg_types, &self.classes) {
            Ok((sig, _)) => {
                let ret = sig.ret.clone();
                Ok(self.record(expr, ret))
            }
            Err(LookupError::Ambiguous) => Err(CompileError::new(
                format!("ambiguous call {}", format_call(name, &arg_types)),
                expr.loc,
            )),
            Err(LookupError::NotFound) => Err(CompileError::new(
                format!("no matching overload for {}", format_call(name, &arg_types)),
                expr.loc,
            )),
        }
    }

    fn check_op(&mut self, expr: &Expr, op: &str, pos: OpPos, args: &[Type]) -> CheckResult<Type> {
        match self.scopes.lookup_op(self.current, op, pos, args, &self.classes) {
            Ok((sig, _)) => {
                let ret = sig.ret.clone();
                Ok(self.record(expr, ret))
            }
            Err(LookupError::Ambiguous) => Err(CompileError::new(
                format!("ambiguous {pos} operator {}", format_call(op, args)),
                expr.loc,
            )),
            Err(LookupError::NotFound) => Err(CompileError::new(
                format!("no matching {pos} operator {}", format_call(op, args)),
                expr.loc,
            )),
        }
    }

    /// Evaluates a member expression against a member scope. Argument
    /// subexpressions of member calls are checked in the current lexical
    /// scope; only the member name itself resolves in the member scope.
    fn check_member(
        &mut self,
        member_scope: ScopeId,
        object: &Expr,
        member: &Expr,
    ) -> CheckResult<Type> {
        match &member.kind {
            ExprKind::Ident(field) => match self.scopes.var_local(member_scope, field) {
                Some(decl) => {
                    let ty = decl.ty.clone();
                    Ok(self.record(member, ty))
                }
                None => Err(CompileError::new(
                    format!("no member '{field}' behind {}", object.describe()),
                    member.loc,
                )),
            },
            ExprKind::Call { name, args } => {
                let arg_types = args
                    .iter()
                    .map(|arg| self.check_expr(arg))
                    .collect::<CheckResult<Vec<Type>>>()?;
                match self
                    .scopes
                    .lookup_func_local(member_scope, name, &arg_types, &self.classes)
                {
                    Ok((sig, _)) => {
                        let ret = sig.ret.clone();
                        Ok(self.record(member, ret))
                    }
                    Err(LookupError::Ambiguous) => Err(CompileError::new(
                        format!(
                            "ambiguous member call {} behind {}",
                            format_call(name, &arg_types),
                            object.describe()
                        ),
                        member.loc,
                    )),
                    Err(LookupError::NotFound) => Err(CompileError::new(
                        format!(
                            "no member {} behind {}",
                            format_call(name, &arg_types),
                            object.describe()
                        ),
                        member.loc,
                    )),
                }
            }
            _ => Err(CompileError::new(
                "a member access needs a field or method on its right side",
                member.loc,
            )),
        }
    }

    /// Rejects types that mention unknown classes.
    fn validate_type(&self, ty: &Type, loc: crate::error::CodeLoc) -> CheckResult<()> {
        match ty {
            Type::Class(name) => {
                if self.classes.get(name).is_none() {
                    return Err(CompileError::new(format!("unknown class '{name}'"), loc));
                }
                Ok(())
            }
            Type::Tuple(items) => items.iter().try_for_each(|item| self.validate_type(item, loc)),
            Type::List(elem) => self.validate_type(elem, loc),
            Type::Function { params, ret } => {
                params
                    .iter()
                    .try_for_each(|param| self.validate_type(param, loc))?;
                self.validate_type(ret, loc)
            }
            _ => Ok(()),
        }
    }
}

/// Least common type of two list elements, if any: nil defers to the
/// other side, otherwise one side must widen into the other.
fn unify(a: &Type, b: &Type, classes: &ClassTable) -> Option<Type> {
    if *a == Type::Nil {
        return Some(b.clone());
    }
    if *b == Type::Nil || a == b || a.super_of(b, classes) {
        return Some(a.clone());
    }
    if b.super_of(a, classes) {
        return Some(b.clone());
    }
    None
}
