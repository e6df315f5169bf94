//! Global exploration: registers every top-level class, function and
//! operator signature into the type scope before checking starts, so
//! later statements can call earlier-seen names and vice versa. Class
//! bodies are filled here too, then the inheritance chains are resolved
//! and flattened.

use crate::{
    ast::{Program, Stmt, StmtKind},
    check::{TypeScopes, VarDecl},
    classes::ClassTable,
    error::CompileError,
    scope::{ScopeId, ScopeKind},
};

pub(crate) fn explore_globals(
    program: &Program,
    scopes: &mut TypeScopes,
    classes: &mut ClassTable,
    global: ScopeId,
) -> Vec<CompileError> {
    let mut errors = vec![];

    // Class names first: superclass references are order-independent.
    for stmt in &program.statements {
        if let StmtKind::Class(class) = &stmt.kind {
            let class_scope = scopes.alloc(
                global,
                ScopeKind::Class {
                    name: class.name.clone(),
                },
            );
            if !classes.add(&class.name, class_scope, class.superclass.clone(), class.loc) {
                errors.push(CompileError::new(
                    format!("class '{}' is defined twice", class.name),
                    class.loc,
                ));
                continue;
            }
            scopes.add_class(global, &class.name, class_scope);
        }
    }

    for stmt in &program.statements {
        register_signature(stmt, scopes, classes, global, &mut errors);
    }

    let ancestry_errors = classes.resolve_ancestry();
    let chains_ok = ancestry_errors.is_empty();
    errors.extend(ancestry_errors);
    if chains_ok {
        let names: Vec<String> = classes.names().cloned().collect();
        for name in names {
            if let Err(error) = classes.flatten(&name, scopes) {
                errors.push(error);
            }
        }
    }
    errors
}

/// Registers one top-level statement's signature(s); nested statements
/// are handled by the checker when it reaches them.
pub(crate) fn register_signature(
    stmt: &Stmt,
    scopes: &mut TypeScopes,
    classes: &ClassTable,
    scope: ScopeId,
    errors: &mut Vec<CompileError>,
) {
    match &stmt.kind {
        StmtKind::Function(func) => {
            if let Err(existing) = scopes.add_func(scope, &func.name, func.sig(), ()) {
                errors.push(CompileError::new(
                    format!(
                        "function '{}{}' collides with existing overload '{}{existing}'",
                        func.name,
                        func.sig(),
                        func.name
                    ),
                    func.loc,
                ));
            }
        }
        StmtKind::Operation(oper) => {
            if let Err(existing) = scopes.add_op(scope, &oper.op, oper.position, oper.sig(), ()) {
                errors.push(CompileError::new(
                    format!(
                        "{} operator '{}{}' collides with existing overload '{}{existing}'",
                        oper.position,
                        oper.op,
                        oper.sig(),
                        oper.op
                    ),
                    oper.loc,
                ));
            }
        }
        StmtKind::Class(class) => {
            let Some(meta) = classes.get(&class.name) else {
                return; // duplicate definition, already reported
            };
            let class_scope = meta.scope;
            for property in &class.properties {
                if scopes.var_local(class_scope, &property.name).is_some() {
                    errors.push(CompileError::new(
                        format!(
                            "property '{}' of class '{}' is declared twice",
                            property.name, class.name
                        ),
                        property.loc,
                    ));
                    continue;
                }
                scopes.define_var(
                    class_scope,
                    &property.name,
                    VarDecl {
                        ty: property.ty.clone(),
                        mutable: property.mutable,
                    },
                );
            }
            for method in &class.methods {
                if let Err(existing) = scopes.add_func(class_scope, &method.name, method.sig(), ())
                {
                    errors.push(CompileError::new(
                        format!(
                            "method '{}{}' of class '{}' collides with existing overload '{}{existing}'",
                            method.name,
                            method.sig(),
                            class.name,
                            method.name
                        ),
                        method.loc,
                    ));
                }
            }
        }
        _ => {}
    }
}
