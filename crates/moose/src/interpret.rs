//! The tree-walking evaluator.
//!
//! Mirrors the checker's pass structure: built-ins are seeded into the
//! prelude scope, top-level declarations are registered into the global
//! environment up front, then statements execute in order. Every
//! environment switch and closed-flag toggle goes through `in_scope`, so
//! the pre-call state is restored on all exit paths, panics and return
//! signals included.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ast::{
        AssignStmt, Block, ClassDecl, Expr, ExprKind, FunctionDecl, IfStmt, OpPos, OperationDecl,
        Program, Stmt, StmtKind,
    },
    builtins::{self, BuiltinScopes},
    classes::ClassTable,
    error::{CodeLoc, Panic, PanicKind, TraceFrame, format_call},
    io::PrintWriter,
    object::{Globals, Object},
    resource::ResourceLimits,
    scope::{LookupError, ScopeArena, ScopeId, ScopeKind},
    tracer::EvalTracer,
    types::{ClassAncestry, FnSig, Type},
    value::{FuncValue, Heap, InstanceValue, Value},
};

/// The runtime instantiation of the scope arena: values everywhere.
type Envs<'a> = ScopeArena<Value<'a>, Value<'a>>;

/// Control transfer out of an evaluation: an early return heading for
/// the innermost call frame, or a panic unwinding to the outermost run.
/// A dedicated sum, not reused error machinery.
#[derive(Debug)]
pub(crate) enum Interrupt<'a> {
    Return(Value<'a>),
    Panic(Box<Panic>),
}

impl From<Box<Panic>> for Interrupt<'_> {
    fn from(panic: Box<Panic>) -> Self {
        Self::Panic(panic)
    }
}

type Exec<'a> = Result<(), Interrupt<'a>>;
type Eval<'a> = Result<Value<'a>, Interrupt<'a>>;

/// Evaluates a checked program and returns the final global environment.
pub(crate) fn run<'a>(
    program: &'a Program,
    expr_types: &'a [Option<Type>],
    print: &mut dyn PrintWriter,
    tracer: &mut dyn EvalTracer,
    limits: ResourceLimits,
) -> Result<Globals, Box<Panic>> {
    let mut envs = Envs::new();
    let global = envs.alloc(ScopeId::ROOT, ScopeKind::Global);
    let builtin_scopes =
        builtins::seed(&mut envs, ScopeId::ROOT, Value::BuiltinFn, Value::BuiltinOp);
    let mut interp = Interp {
        expr_types,
        envs,
        classes: ClassTable::default(),
        builtins: builtin_scopes,
        heap: Heap::default(),
        global,
        current: global,
        receivers: vec![],
        depth: 0,
        limits,
        print,
        tracer,
    };
    interp.explore(program)?;
    for stmt in &program.statements {
        match interp.exec_stmt(stmt) {
            Ok(()) => {}
            Err(Interrupt::Panic(panic)) => return Err(panic),
            // The checker rejects top-level returns; a leaked signal here
            // would be an interpreter bug, surfaced rather than dropped.
            Err(Interrupt::Return(_)) => {
                return Err(Panic::generic("return signal escaped to the top level"));
            }
        }
    }
    Ok(interp.snapshot_globals())
}

struct Interp<'a, 'w> {
    expr_types: &'a [Option<Type>],
    envs: Envs<'a>,
    classes: ClassTable,
    builtins: BuiltinScopes,
    heap: Heap<'a>,
    global: ScopeId,
    current: ScopeId,
    /// Receiver stack for built-in member calls; pushed around member
    /// access on primitive values.
    receivers: Vec<Value<'a>>,
    depth: usize,
    limits: ResourceLimits,
    print: &'w mut dyn PrintWriter,
    tracer: &'w mut dyn EvalTracer,
}

impl<'a> Interp<'a, '_> {
    // --- setup ---

    /// Registers every top-level class, function and operator into the
    /// global environment, mirroring the checker's exploration pass.
    fn explore(&mut self, program: &'a Program) -> Result<(), Box<Panic>> {
        for stmt in &program.statements {
            if let StmtKind::Class(class) = &stmt.kind {
                self.register_class(class, self.global)?;
            }
        }
        for stmt in &program.statements {
            match &stmt.kind {
                StmtKind::Function(func) => self.register_func(self.global, func, self.global)?,
                StmtKind::Operation(oper) => self.register_op(self.global, oper, self.global)?,
                StmtKind::Class(class) => self.fill_class_template(class)?,
                _ => {}
            }
        }
        let errors = self.classes.resolve_ancestry();
        if let Some(error) = errors.first() {
            return Err(Panic::generic(error.message.clone()));
        }
        Ok(())
    }

    fn register_class(&mut self, class: &'a ClassDecl, scope: ScopeId) -> Result<(), Box<Panic>> {
        let class_scope = self.envs.alloc(
            scope,
            ScopeKind::Class {
                name: class.name.clone(),
            },
        );
        if !self
            .classes
            .add(&class.name, class_scope, class.superclass.clone(), class.loc)
        {
            return Err(Panic::generic(format!(
                "class '{}' is defined twice",
                class.name
            )));
        }
        self.envs.add_class(scope, &class.name, class_scope);
        Ok(())
    }

    fn fill_class_template(&mut self, class: &'a ClassDecl) -> Result<(), Box<Panic>> {
        let Some(meta) = self.classes.get(&class.name) else {
            return Ok(());
        };
        let class_scope = meta.scope;
        for property in &class.properties {
            self.envs
                .define_var(class_scope, &property.name, Value::nil_of(&property.ty));
        }
        for method in &class.methods {
            self.register_func(class_scope, method, class_scope)?;
        }
        Ok(())
    }

    fn register_func(
        &mut self,
        scope: ScopeId,
        func: &'a FunctionDecl,
        closure: ScopeId,
    ) -> Result<(), Box<Panic>> {
        let value = Value::Function(Rc::new(FuncValue {
            name: &func.name,
            position: None,
            sig: func.sig(),
            params: &func.params,
            body: &func.body,
            closure,
        }));
        self.envs
            .add_func(scope, &func.name, func.sig(), value)
            .map_err(|existing| {
                Panic::generic(format!(
                    "function '{}{}' collides with existing overload '{}{existing}'",
                    func.name,
                    func.sig(),
                    func.name
                ))
            })
    }

    fn register_op(
        &mut self,
        scope: ScopeId,
        oper: &'a OperationDecl,
        closure: ScopeId,
    ) -> Result<(), Box<Panic>> {
        let value = Value::Operator(Rc::new(FuncValue {
            name: &oper.op,
            position: Some(oper.position),
            sig: oper.sig(),
            params: &oper.params,
            body: &oper.body,
            closure,
        }));
        self.envs
            .add_op(scope, &oper.op, oper.position, oper.sig(), value)
            .map_err(|existing| {
                Panic::generic(format!(
                    "{} operator '{}{}' collides with existing overload '{}{existing}'",
                    oper.position,
                    oper.op,
                    oper.sig(),
                    oper.op
                ))
            })
    }

    // --- environment discipline ---

    /// Runs `body` with the current environment switched to `env` and its
    /// closed flag set to `closed`, restoring both afterwards regardless
    /// of how `body` exits.
    fn in_scope<T>(
        &mut self,
        env: ScopeId,
        closed: bool,
        body: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved_env = std::mem::replace(&mut self.current, env);
        let saved_closed = self.envs.set_closed(env, closed);
        let result = body(self);
        self.envs.set_closed(env, saved_closed);
        self.current = saved_env;
        result
    }

    /// Appends a trace frame when a panic passes this level.
    fn traced<T>(
        result: Result<T, Interrupt<'a>>,
        what: impl FnOnce() -> String,
        loc: CodeLoc,
    ) -> Result<T, Interrupt<'a>> {
        match result {
            Err(Interrupt::Panic(mut panic)) => {
                panic.trace.push(TraceFrame { what: what(), loc });
                Err(Interrupt::Panic(panic))
            }
            other => other,
        }
    }

    // --- statements ---

    fn exec_block(&mut self, block: &'a Block) -> Exec<'a> {
        for stmt in &block.statements {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &'a Stmt) -> Exec<'a> {
        self.tracer.on_statement(stmt.loc);
        let result = self.exec_stmt_inner(stmt);
        Self::traced(result, || stmt.describe(), stmt.loc)
    }

    fn exec_stmt_inner(&mut self, stmt: &'a Stmt) -> Exec<'a> {
        match &stmt.kind {
            StmtKind::Assign(assign) => self.exec_assign(assign),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Void,
                };
                Err(Interrupt::Return(value))
            }
            StmtKind::Expr(expr) => self.eval(expr).map(|_| ()),
            StmtKind::Block(block) => {
                let scope = self.envs.alloc(self.current, ScopeKind::Block);
                self.in_scope(scope, false, |interp| interp.exec_block(block))
            }
            StmtKind::If(if_stmt) => self.exec_if(if_stmt),
            StmtKind::Function(func) => {
                // Global declarations were registered by exploration and
                // evaluate to nothing; local ones capture the current
                // environment as their closure.
                if self.current != self.global {
                    self.register_func(self.current, func, self.current)?;
                }
                Ok(())
            }
            StmtKind::Operation(oper) => {
                if self.current != self.global {
                    self.register_op(self.current, oper, self.current)?;
                }
                Ok(())
            }
            StmtKind::Class(class) => {
                if self.current != self.global {
                    self.register_class(class, self.current)?;
                    self.fill_class_template(class)?;
                    let errors = self.classes.resolve_ancestry();
                    if let Some(error) = errors.first() {
                        return Err(Panic::generic(error.message.clone()).into());
                    }
                }
                Ok(())
            }
        }
    }

    fn exec_if(&mut self, if_stmt: &'a IfStmt) -> Exec<'a> {
        let condition = self.eval(&if_stmt.condition)?;
        let taken = match condition {
            Value::Bool(Some(v)) => v,
            Value::Bool(None) | Value::Nil => {
                return Err(Panic::nil_usage("if condition is nil").into());
            }
            other => {
                return Err(Panic::generic(format!(
                    "if condition must be Bool, found {}",
                    other.type_of()
                ))
                .into());
            }
        };
        let block = if taken {
            Some(&if_stmt.consequence)
        } else {
            if_stmt.alternative.as_ref()
        };
        if let Some(block) = block {
            let scope = self.envs.alloc(self.current, ScopeKind::Block);
            self.in_scope(scope, false, |interp| interp.exec_block(block))?;
        }
        Ok(())
    }

    // --- assignment ---

    fn exec_assign(&mut self, assign: &'a AssignStmt) -> Exec<'a> {
        let value = self.eval(&assign.value)?;
        self.assign_to(&assign.target, value)
    }

    /// A raw `nil` is retyped to the target's declared or inferred type
    /// as recorded by the checker; typed nils already carry their type.
    fn retype_nil(&self, target: &Expr, value: Value<'a>) -> Value<'a> {
        if !matches!(value, Value::Nil) {
            return value;
        }
        match self
            .expr_types
            .get(target.id.index())
            .and_then(Option::as_ref)
        {
            Some(ty) => Value::nil_of(ty),
            None => value,
        }
    }

    fn assign_to(&mut self, target: &'a Expr, value: Value<'a>) -> Exec<'a> {
        match &target.kind {
            ExprKind::Ident(name) => {
                let value = self.retype_nil(target, value);
                self.envs.update_var(self.current, name, value, true);
                Ok(())
            }
            ExprKind::Tuple(items) => {
                let Value::Tuple(_, parts) = &value else {
                    if value.is_nil() {
                        return Err(Panic::nil_usage("destructuring a nil tuple").into());
                    }
                    return Err(Panic::generic(format!(
                        "cannot destructure a {}",
                        value.type_of()
                    ))
                    .into());
                };
                if parts.len() != items.len() {
                    return Err(Panic::generic(format!(
                        "cannot destructure a tuple of {} values into {} targets",
                        parts.len(),
                        items.len()
                    ))
                    .into());
                }
                for (item, part) in items.iter().zip(parts.iter()) {
                    self.assign_to(item, part.clone())?;
                }
                Ok(())
            }
            ExprKind::Index { object, index } => self.assign_index(target, object, index, value),
            ExprKind::Deref { object, member } => self.assign_field(object, member, value),
            _ => Err(Panic::generic(format!("{} is not assignable", target.describe())).into()),
        }
    }

    fn assign_index(
        &mut self,
        target: &'a Expr,
        object: &'a Expr,
        index: &'a Expr,
        value: Value<'a>,
    ) -> Exec<'a> {
        let list = self.eval(object)?;
        let index_value = self.eval(index)?;
        let Value::List(elem, storage) = &list else {
            return Err(Panic::generic(format!(
                "cannot assign into an index of a {}",
                list.type_of()
            ))
            .into());
        };
        let Some(id) = storage else {
            return Err(Panic::nil_usage(format!(
                "index assignment into nil {}",
                object.describe()
            ))
            .into());
        };
        let Value::Int(Some(raw)) = index_value else {
            return Err(Panic::nil_usage("list index is nil").into());
        };
        let length = self.heap.list(*id).items.len();
        let Some(position) = normalize_index(raw, length) else {
            return Err(Panic::out_of_bounds(length, raw).into());
        };
        let value = if matches!(value, Value::Nil) {
            Value::nil_of(elem)
        } else {
            self.retype_nil(target, value)
        };
        self.heap.list_mut(*id).items[position] = value;
        Ok(())
    }

    /// Field write through a dereferer: evaluate the object, switch into
    /// its instance environment with the closed flag set, update there.
    fn assign_field(&mut self, object: &'a Expr, member: &'a Expr, value: Value<'a>) -> Exec<'a> {
        let ExprKind::Ident(field) = &member.kind else {
            return Err(Panic::generic("only a field can be assigned through member access").into());
        };
        let receiver = self.eval(object)?;
        let Value::Instance(instance) = &receiver else {
            return Err(Panic::generic(format!(
                "cannot assign to members of a {}",
                receiver.type_of()
            ))
            .into());
        };
        let Some(env) = instance.env else {
            return Err(Panic::nil_usage(format!(
                "field assignment on nil {}",
                object.describe()
            ))
            .into());
        };
        let value = self.retype_nil(member, value);
        self.in_scope(env, true, |interp| {
            if interp.envs.update_var(interp.current, field, value, false) {
                Ok(())
            } else {
                Err(Panic::not_found(format!("field '{field}'")).into())
            }
        })
    }

    // --- expressions ---

    fn eval(&mut self, expr: &'a Expr) -> Eval<'a> {
        match &expr.kind {
            ExprKind::Int(v) => Ok(Value::Int(Some(*v))),
            ExprKind::Float(v) => Ok(Value::Float(Some(*v))),
            ExprKind::Bool(v) => Ok(Value::Bool(Some(*v))),
            ExprKind::Str(v) => Ok(Value::str(v.as_str())),
            ExprKind::Nil => Ok(Value::Nil),
            ExprKind::Ident(name) => self.eval_ident(expr, name),
            ExprKind::Me => {
                let Some(class_env) = self.envs.nearest_class_scope(self.current) else {
                    return Err(Panic::generic("'me' outside of a class").into());
                };
                let ScopeKind::Class { name } = &self.envs.get(class_env).kind else {
                    return Err(Panic::generic("'me' outside of a class").into());
                };
                Ok(Value::Instance(Rc::new(InstanceValue {
                    class: name.clone(),
                    env: Some(class_env),
                })))
            }
            ExprKind::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                let ty = Type::Tuple(values.iter().map(Value::type_of).collect());
                Ok(Value::Tuple(ty, Rc::new(values)))
            }
            ExprKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                let elem = match self
                    .expr_types
                    .get(expr.id.index())
                    .and_then(Option::as_ref)
                {
                    Some(Type::List(elem)) => (**elem).clone(),
                    _ => values
                        .iter()
                        .find(|v| !matches!(v, Value::Nil))
                        .map_or(Type::Nil, Value::type_of),
                };
                let values = values
                    .into_iter()
                    .map(|v| {
                        if matches!(v, Value::Nil) {
                            Value::nil_of(&elem)
                        } else {
                            v
                        }
                    })
                    .collect();
                let id = self.heap.alloc_list(values);
                Ok(Value::List(elem, Some(id)))
            }
            ExprKind::Is { value, ty } => {
                let evaluated = self.eval(value)?;
                let result = match &evaluated {
                    Value::Instance(instance) => match ty {
                        Type::Class(name) => {
                            instance.class == *name
                                || self.classes.is_ancestor(name, &instance.class)
                        }
                        _ => false,
                    },
                    other => other.type_of().to_string() == ty.to_string(),
                };
                Ok(Value::Bool(Some(result)))
            }
            ExprKind::Call { name, args } => self.eval_call(expr, name, args),
            ExprKind::Deref { object, member } => self.eval_deref(expr, object, member),
            ExprKind::Index { object, index } => self.eval_index(object, index),
            ExprKind::Prefix { op, operand } => {
                let operands = [&**operand];
                let values = self.eval_args(&operands)?;
                self.dispatch_op(expr, op, OpPos::Prefix, &operands, values)
            }
            ExprKind::Infix { op, left, right } => {
                let operands = [&**left, &**right];
                let values = self.eval_args(&operands)?;
                self.dispatch_op(expr, op, OpPos::Infix, &operands, values)
            }
            ExprKind::Postfix { op, operand } => {
                let operands = [&**operand];
                let values = self.eval_args(&operands)?;
                self.dispatch_op(expr, op, OpPos::Postfix, &operands, values)
            }
        }
    }

    /// The argument type used for dispatch: the checker's annotation is
    /// authoritative (a variable declared as a superclass dispatches as
    /// the superclass even when it holds a subclass instance at run
    /// time); the runtime type is the fallback.
    fn dispatch_type_of(&self, expr: &Expr, value: &Value<'a>) -> Type {
        self.expr_types
            .get(expr.id.index())
            .and_then(Option::as_ref)
            .cloned()
            .unwrap_or_else(|| value.type_of())
    }

    fn eval_ident(&mut self, expr: &'a Expr, name: &str) -> Eval<'a> {
        if name == "global" {
            // The reserved accessor: an instance-like view of the global
            // environment, the one lookup that pierces a closed scope.
            return Ok(Value::Instance(Rc::new(InstanceValue {
                class: "Global".to_owned(),
                env: Some(self.global),
            })));
        }
        match self.envs.lookup_var(self.current, name) {
            Some((_, value)) => Ok(value.clone()),
            None => Err(Panic::not_found(format!("variable '{name}'")).into()),
        }
    }

    /// Evaluates argument subexpressions left to right with the current
    /// scope's closed flag cleared: arguments of a member call must see
    /// the enclosing lexical scopes even while the member scope is
    /// active. The flag is restored whether or not an argument panics.
    fn eval_args(&mut self, exprs: &[&'a Expr]) -> Result<Vec<Value<'a>>, Interrupt<'a>> {
        let saved = self.envs.set_closed(self.current, false);
        let mut values = Vec::with_capacity(exprs.len());
        let mut failure = None;
        for expr in exprs {
            match self.eval(expr) {
                Ok(value) => values.push(value),
                Err(interrupt) => {
                    failure = Some(interrupt);
                    break;
                }
            }
        }
        self.envs.set_closed(self.current, saved);
        match failure {
            Some(interrupt) => Err(interrupt),
            None => Ok(values),
        }
    }

    fn eval_call(&mut self, expr: &'a Expr, name: &'a str, args: &'a [Expr]) -> Eval<'a> {
        if let Some(template) = self.envs.lookup_class(self.current, name) {
            let result = self.construct(name, template, args);
            return Self::traced(result, || expr.describe(), expr.loc);
        }
        let arg_refs: Vec<&'a Expr> = args.iter().collect();
        let values = self.eval_args(&arg_refs)?;
        let types: SmallVec<[Type; 4]> = arg_refs
            .iter()
            .zip(&values)
            .map(|(arg, value)| self.dispatch_type_of(arg, value))
            .collect();
        let callee = match self.envs.lookup_func(self.current, name, &types, &self.classes) {
            Ok((_, callee)) => callee.clone(),
            Err(error) => {
                let result = Err(call_lookup_panic(error, &format_call(name, &types)).into());
                return Self::traced(result, || expr.describe(), expr.loc);
            }
        };
        self.tracer.on_call(name);
        let result = self.call_value(callee, values);
        Self::traced(result, || expr.describe(), expr.loc)
    }

    fn dispatch_op(
        &mut self,
        expr: &'a Expr,
        op: &str,
        pos: OpPos,
        operands: &[&'a Expr],
        values: Vec<Value<'a>>,
    ) -> Eval<'a> {
        let types: SmallVec<[Type; 4]> = operands
            .iter()
            .zip(&values)
            .map(|(operand, value)| self.dispatch_type_of(operand, value))
            .collect();
        let callee = match self.envs.lookup_op(self.current, op, pos, &types, &self.classes) {
            Ok((_, callee)) => callee.clone(),
            Err(error) => {
                let call = format!("{pos} operator {}", format_call(op, &types));
                let result = Err(call_lookup_panic(error, &call).into());
                return Self::traced(result, || expr.describe(), expr.loc);
            }
        };
        self.tracer.on_call(op);
        let result = self.call_value(callee, values);
        Self::traced(result, || expr.describe(), expr.loc)
    }

    fn eval_deref(&mut self, expr: &'a Expr, object: &'a Expr, member: &'a Expr) -> Eval<'a> {
        let receiver = self.eval(object)?;
        // A raw nil or a nil instance has no members to resolve. Typed
        // primitive nils keep going: the built-in conversions propagate
        // the empty slot into their return type.
        let nil_receiver = match &receiver {
            Value::Nil => true,
            Value::Instance(instance) => instance.env.is_none(),
            _ => false,
        };
        if nil_receiver {
            let result = Err(Panic::nil_usage(format!(
                "member access on nil {}",
                object.describe()
            ))
            .into());
            return Self::traced(result, || expr.describe(), expr.loc);
        }
        let result = match &receiver {
            Value::Instance(instance) => {
                let env = instance.env.expect("nil instances handled above");
                self.in_scope(env, true, |interp| interp.eval(member))
            }
            primitive => match self.builtins.for_type(&primitive.type_of()) {
                Some(member_scope) => {
                    self.receivers.push(receiver.clone());
                    let result = self.in_scope(member_scope, true, |interp| interp.eval(member));
                    self.receivers.pop();
                    result
                }
                None => Err(Panic::generic(format!(
                    "a {} has no members",
                    primitive.type_of()
                ))
                .into()),
            },
        };
        Self::traced(result, || expr.describe(), expr.loc)
    }

    fn eval_index(&mut self, object: &'a Expr, index: &'a Expr) -> Eval<'a> {
        let list = self.eval(object)?;
        let index_value = self.eval(index)?;
        let Value::List(_, storage) = &list else {
            return Err(Panic::generic(format!(
                "a {} cannot be indexed",
                list.type_of()
            ))
            .into());
        };
        let Some(id) = storage else {
            return Err(Panic::nil_usage(format!("indexing into nil {}", object.describe())).into());
        };
        let Value::Int(Some(raw)) = index_value else {
            return Err(Panic::nil_usage("list index is nil").into());
        };
        let items = &self.heap.list(*id).items;
        let length = items.len();
        match normalize_index(raw, length) {
            Some(position) => Ok(items[position].clone()),
            None => Err(Panic::out_of_bounds(length, raw).into()),
        }
    }

    // --- calls ---

    fn call_value(&mut self, callee: Value<'a>, args: Vec<Value<'a>>) -> Eval<'a> {
        match callee {
            Value::Function(func) | Value::Operator(func) => self.call_user(&func, args),
            Value::BuiltinFn(builtin) => self.call_builtin(builtin, &args),
            Value::BuiltinOp(builtin) => builtin.call(&args).map_err(Interrupt::from),
            other => Err(Panic::generic(format!("a {} is not callable", other.type_of())).into()),
        }
    }

    /// Built-in call protocol: unless already inside a built-in class
    /// environment, switch to the global environment so the native code
    /// sees a clean lexical frame; clear the closed flag; restore after.
    fn call_builtin(&mut self, builtin: builtins::BuiltinFn, args: &[Value<'a>]) -> Eval<'a> {
        let target = if self.builtins.contains(self.current) {
            self.current
        } else {
            self.global
        };
        let receiver = self.receivers.last().cloned();
        self.in_scope(target, false, |interp| {
            builtin
                .call(receiver.as_ref(), args, &interp.heap, &mut *interp.print)
                .map_err(Interrupt::from)
        })
    }

    /// User call protocol: activate the callee's captured closure with
    /// the closed flag cleared, push a fresh frame, bind parameters,
    /// catch the return signal, restore everything.
    fn call_user(&mut self, func: &FuncValue<'a>, args: Vec<Value<'a>>) -> Eval<'a> {
        if self.depth >= self.limits.max_recursion_depth {
            return Err(Panic::new(PanicKind::StackOverflow { depth: self.depth }).into());
        }
        self.depth += 1;
        let frame = self.envs.alloc(func.closure, ScopeKind::Block);
        let result = self.in_scope(func.closure, false, |interp| {
            interp.in_scope(frame, false, |interp| {
                for (param, arg) in func.params.iter().zip(args) {
                    let value = if matches!(arg, Value::Nil) {
                        Value::nil_of(&param.ty)
                    } else {
                        arg
                    };
                    interp.envs.define_var(frame, &param.name, value);
                }
                match interp.exec_block(func.body) {
                    Ok(()) => Ok(Value::Void),
                    Err(Interrupt::Return(value)) => Ok(value),
                    Err(panic) => Err(panic),
                }
            })
        });
        self.depth -= 1;
        result
    }

    /// Constructor call: flatten the class (idempotent), copy its
    /// template into a fresh instance environment, bind one positional
    /// argument per property, and rebind every method's closure to the
    /// new environment.
    fn construct(&mut self, name: &'a str, template: ScopeId, args: &'a [Expr]) -> Eval<'a> {
        if let Err(error) = self.classes.flatten(name, &mut self.envs) {
            return Err(Panic::generic(error.message).into());
        }
        let arg_refs: Vec<&'a Expr> = args.iter().collect();
        let values = self.eval_args(&arg_refs)?;
        let properties: Vec<(String, Type)> = self
            .envs
            .vars(template)
            .map(|(prop, value)| (prop.clone(), value.type_of()))
            .collect();
        if properties.len() != values.len() {
            return Err(Panic::generic(format!(
                "constructor of '{name}' expects {} arguments, found {}",
                properties.len(),
                values.len()
            ))
            .into());
        }
        let methods: Vec<(String, FnSig, Value<'a>)> = self
            .envs
            .funcs_local(template)
            .flat_map(|(fn_name, overloads)| {
                overloads
                    .iter()
                    .map(|(sig, value)| (fn_name.clone(), sig.clone(), value.clone()))
            })
            .collect();

        let instance = self.envs.alloc(
            self.global,
            ScopeKind::Class {
                name: name.to_owned(),
            },
        );
        for ((prop, ty), value) in properties.into_iter().zip(values) {
            let value = if matches!(value, Value::Nil) {
                Value::nil_of(&ty)
            } else {
                value
            };
            self.envs.update_var_current(instance, &prop, value);
        }
        for (fn_name, sig, value) in methods {
            let rebound = match value {
                Value::Function(func) => Value::Function(Rc::new(func.rebound(instance))),
                other => other,
            };
            self.envs
                .add_func(instance, &fn_name, sig, rebound)
                .expect("flattened template holds no colliding overloads");
        }
        self.tracer.on_call(name);
        Ok(Value::Instance(Rc::new(InstanceValue {
            class: name.to_owned(),
            env: Some(instance),
        })))
    }

    // --- snapshot ---

    fn snapshot_globals(&self) -> Globals {
        let vars = self
            .envs
            .vars(self.global)
            .map(|(name, value)| (name.clone(), self.to_object(value, 0)))
            .collect();
        Globals::new(vars)
    }

    fn to_object(&self, value: &Value<'a>, depth: usize) -> Object {
        // Self-referential instances would recurse forever; cut off deep
        // object graphs instead.
        if depth > 32 {
            return Object::Nil;
        }
        match value {
            Value::Int(Some(v)) => Object::Int(*v),
            Value::Float(Some(v)) => Object::Float(*v),
            Value::Bool(Some(v)) => Object::Bool(*v),
            Value::Str(Some(v)) => Object::Str(v.to_string()),
            Value::Void => Object::Void,
            Value::Tuple(_, items) => Object::Tuple(
                items
                    .iter()
                    .map(|item| self.to_object(item, depth + 1))
                    .collect(),
            ),
            Value::List(_, Some(id)) => Object::List(
                self.heap
                    .list(*id)
                    .items
                    .iter()
                    .map(|item| self.to_object(item, depth + 1))
                    .collect(),
            ),
            Value::Function(func) | Value::Operator(func) => Object::Function {
                name: func.name.to_owned(),
            },
            Value::BuiltinFn(builtin) => Object::Function {
                name: builtin.name().to_owned(),
            },
            Value::BuiltinOp(builtin) => Object::Function {
                name: builtin.name().to_owned(),
            },
            Value::Instance(instance) => match instance.env {
                Some(env) => Object::Instance {
                    class: instance.class.clone(),
                    fields: self
                        .envs
                        .vars(env)
                        .map(|(name, value)| (name.clone(), self.to_object(value, depth + 1)))
                        .collect(),
                },
                None => Object::Nil,
            },
            _ => Object::Nil,
        }
    }
}

/// Maps a possibly negative index onto `0..length`; negative indices
/// count from the end.
fn normalize_index(raw: i64, length: usize) -> Option<usize> {
    let length = i64::try_from(length).ok()?;
    let position = if raw < 0 { length + raw } else { raw };
    if (0..length).contains(&position) {
        usize::try_from(position).ok()
    } else {
        None
    }
}

fn call_lookup_panic(error: LookupError, call: &str) -> Box<Panic> {
    match error {
        LookupError::Ambiguous => Panic::new(PanicKind::Ambiguous {
            call: call.to_owned(),
        }),
        LookupError::NotFound => Panic::not_found(call.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_indices_wrap_from_the_tail() {
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(-3, 3), Some(0));
        assert_eq!(normalize_index(-4, 3), None);
        assert_eq!(normalize_index(0, 3), Some(0));
        assert_eq!(normalize_index(2, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(0, 0), None);
    }
}
