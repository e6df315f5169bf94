//! Class registry and the inheritance flattening pass.
//!
//! Flattening folds a single-inheritance chain into each class's own
//! scope: properties become superclass-first ordered entries, method
//! tables are unioned with override checks, and the superclass pointer is
//! cleared. Clearing doubles as the memoization guard, so re-running
//! `flatten` is a no-op; the evaluator relies on that when constructors
//! trigger it lazily.

use ahash::AHashMap;

use crate::{
    error::{CodeLoc, CompileError},
    scope::{ScopeArena, ScopeId},
    types::ClassAncestry,
};

#[derive(Debug)]
pub(crate) struct ClassMeta {
    /// The class's template scope in the owning arena.
    pub scope: ScopeId,
    /// Cleared by flattening; `Some` means not yet flattened.
    pub superclass: Option<String>,
    /// The full superclass chain, nearest first. Filled by
    /// `resolve_ancestry` before any flattening happens so the subtype
    /// relation works independently of flattening order.
    pub ancestors: Vec<String>,
    /// Re-entry guard while flattening the chain.
    visiting: bool,
    pub decl_loc: CodeLoc,
}

/// All registered classes of one checker or interpreter instance.
#[derive(Debug, Default)]
pub(crate) struct ClassTable {
    classes: AHashMap<String, ClassMeta>,
}

impl ClassTable {
    pub fn add(
        &mut self,
        name: &str,
        scope: ScopeId,
        superclass: Option<String>,
        decl_loc: CodeLoc,
    ) -> bool {
        if self.classes.contains_key(name) {
            return false;
        }
        self.classes.insert(
            name.to_owned(),
            ClassMeta {
                scope,
                superclass,
                ancestors: vec![],
                visiting: false,
                decl_loc,
            },
        );
        true
    }

    pub fn get(&self, name: &str) -> Option<&ClassMeta> {
        self.classes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.classes.keys()
    }

    /// Computes every class's ancestor chain, reporting unknown
    /// superclasses and inheritance cycles. Must run after registration
    /// and before flattening or any subtype query.
    pub fn resolve_ancestry(&mut self) -> Vec<CompileError> {
        let mut errors = vec![];
        let names: Vec<String> = self.classes.keys().cloned().collect();
        for name in names {
            let mut chain = vec![];
            let mut current = self.classes[&name].superclass.clone();
            while let Some(super_name) = current {
                if super_name == name || chain.contains(&super_name) {
                    errors.push(CompileError::new(
                        format!("inheritance cycle through class '{super_name}'"),
                        self.classes[&name].decl_loc,
                    ));
                    chain.clear();
                    break;
                }
                match self.classes.get(&super_name) {
                    Some(meta) => {
                        chain.push(super_name);
                        current = meta.superclass.clone();
                    }
                    None => {
                        errors.push(CompileError::new(
                            format!("unknown superclass '{super_name}' of class '{name}'"),
                            self.classes[&name].decl_loc,
                        ));
                        break;
                    }
                }
            }
            self.classes
                .get_mut(&name)
                .expect("iterating known names")
                .ancestors = chain;
        }
        errors
    }

    /// Flattens `name` (and, first, its whole superclass chain) inside
    /// `arena`. Idempotent: a class whose superclass pointer is already
    /// cleared is left untouched.
    pub fn flatten<V: Clone, C: Clone>(
        &mut self,
        name: &str,
        arena: &mut ScopeArena<V, C>,
    ) -> Result<(), CompileError> {
        let Some(meta) = self.classes.get_mut(name) else {
            return Ok(());
        };
        let Some(super_name) = meta.superclass.clone() else {
            return Ok(());
        };
        if meta.visiting {
            return Err(CompileError::new(
                format!("inheritance cycle through class '{name}'"),
                meta.decl_loc,
            ));
        }
        meta.visiting = true;
        let decl_loc = meta.decl_loc;
        let own_scope = meta.scope;

        let result = self.flatten_into(name, &super_name, own_scope, decl_loc, arena);

        let meta = self.classes.get_mut(name).expect("still registered");
        meta.visiting = false;
        if result.is_ok() {
            meta.superclass = None;
        }
        result
    }

    fn flatten_into<V: Clone, C: Clone>(
        &mut self,
        name: &str,
        super_name: &str,
        own_scope: ScopeId,
        decl_loc: CodeLoc,
        arena: &mut ScopeArena<V, C>,
    ) -> Result<(), CompileError> {
        if self.classes.get(super_name).is_none() {
            return Err(CompileError::new(
                format!("unknown superclass '{super_name}' of class '{name}'"),
                decl_loc,
            ));
        }
        self.flatten(super_name, arena)?;
        let super_scope = self.classes[super_name].scope;

        // Properties: the superclass's (already flattened) come first, in
        // order, then this class's own. A name on both sides is an error.
        let super_vars: Vec<(String, V)> = arena
            .vars(super_scope)
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();
        let own_vars: Vec<(String, V)> = arena
            .vars(own_scope)
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();
        for (prop, _) in &own_vars {
            if super_vars.iter().any(|(n, _)| n == prop) {
                return Err(CompileError::new(
                    format!(
                        "property '{prop}' of class '{name}' is already defined in superclass '{super_name}'"
                    ),
                    decl_loc,
                ));
            }
        }
        arena.replace_vars(own_scope, super_vars.into_iter().chain(own_vars).collect());

        // Methods: union the superclass's into this class. An override
        // (same name, equal parameter types) must keep the parent's
        // return type exactly; widening is not permitted.
        let super_funcs: Vec<(String, Vec<(crate::types::FnSig, C)>)> = arena
            .funcs_local(super_scope)
            .map(|(n, overloads)| (n.clone(), overloads.to_vec()))
            .collect();
        for (fn_name, overloads) in super_funcs {
            for (sig, callee) in overloads {
                let override_ret = arena
                    .funcs_local(own_scope)
                    .find(|(n, _)| **n == fn_name)
                    .and_then(|(_, own)| {
                        own.iter()
                            .find(|(own_sig, _)| own_sig.same_params(&sig))
                            .map(|(own_sig, _)| own_sig.ret.clone())
                    });
                match override_ret {
                    Some(ret) if ret == sig.ret => {} // override wins
                    Some(ret) => {
                        return Err(CompileError::new(
                            format!(
                                "override of '{fn_name}{sig}' in class '{name}' changes the return type to {ret}"
                            ),
                            decl_loc,
                        ));
                    }
                    None => {
                        if arena.add_func(own_scope, &fn_name, sig, callee).is_err() {
                            return Err(CompileError::new(
                                format!(
                                    "method '{fn_name}' of class '{name}' collides with an inherited overload"
                                ),
                                decl_loc,
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl ClassAncestry for ClassTable {
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.classes
            .get(descendant)
            .is_some_and(|meta| meta.ancestors.iter().any(|a| a == ancestor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKind;
    use crate::types::{FnSig, ParamType, Type};

    type Arena = ScopeArena<Type, ()>;

    fn class_scope(arena: &mut Arena, name: &str) -> ScopeId {
        arena.alloc(
            ScopeId::ROOT,
            ScopeKind::Class {
                name: name.to_owned(),
            },
        )
    }

    fn sig(params: Vec<Type>, ret: Type) -> FnSig {
        FnSig::new(params.into_iter().map(ParamType::new).collect(), ret)
    }

    #[test]
    fn properties_merge_superclass_first() {
        let mut arena = Arena::new();
        let mut table = ClassTable::default();
        let a = class_scope(&mut arena, "A");
        let b = class_scope(&mut arena, "B");
        arena.define_var(a, "x", Type::Int);
        arena.define_var(b, "y", Type::Int);
        table.add("A", a, None, CodeLoc::default());
        table.add("B", b, Some("A".to_owned()), CodeLoc::default());
        assert!(table.resolve_ancestry().is_empty());
        table.flatten("B", &mut arena).unwrap();

        let names: Vec<&String> = arena.vars(b).map(|(n, _)| n).collect();
        assert_eq!(names, ["x", "y"]);
        assert!(table.get("B").unwrap().superclass.is_none());
        // idempotent re-entry
        table.flatten("B", &mut arena).unwrap();
        assert_eq!(arena.vars(b).count(), 2);
    }

    #[test]
    fn duplicate_property_is_an_error() {
        let mut arena = Arena::new();
        let mut table = ClassTable::default();
        let a = class_scope(&mut arena, "A");
        let b = class_scope(&mut arena, "B");
        arena.define_var(a, "x", Type::Int);
        arena.define_var(b, "x", Type::Float);
        table.add("A", a, None, CodeLoc::default());
        table.add("B", b, Some("A".to_owned()), CodeLoc::default());
        table.resolve_ancestry();
        let err = table.flatten("B", &mut arena).unwrap_err();
        assert!(err.message.contains("already defined in superclass"));
    }

    #[test]
    fn override_must_keep_return_type() {
        let mut arena = Arena::new();
        let mut table = ClassTable::default();
        let a = class_scope(&mut arena, "A");
        let b = class_scope(&mut arena, "B");
        arena
            .add_func(a, "get", sig(vec![Type::Int], Type::Int), ())
            .unwrap();
        arena
            .add_func(b, "get", sig(vec![Type::Int], Type::Float), ())
            .unwrap();
        table.add("A", a, None, CodeLoc::default());
        table.add("B", b, Some("A".to_owned()), CodeLoc::default());
        table.resolve_ancestry();
        let err = table.flatten("B", &mut arena).unwrap_err();
        assert!(err.message.contains("changes the return type"));
    }

    #[test]
    fn ancestry_detects_cycles() {
        let mut arena = Arena::new();
        let mut table = ClassTable::default();
        let a = class_scope(&mut arena, "A");
        let b = class_scope(&mut arena, "B");
        table.add("A", a, Some("B".to_owned()), CodeLoc::default());
        table.add("B", b, Some("A".to_owned()), CodeLoc::default());
        let errors = table.resolve_ancestry();
        assert!(!errors.is_empty());
        assert!(errors[0].message.contains("cycle"));
    }

    #[test]
    fn grandparent_chain_flattens_transitively() {
        let mut arena = Arena::new();
        let mut table = ClassTable::default();
        let a = class_scope(&mut arena, "A");
        let b = class_scope(&mut arena, "B");
        let c = class_scope(&mut arena, "C");
        arena.define_var(a, "x", Type::Int);
        arena.define_var(b, "y", Type::Int);
        arena.define_var(c, "z", Type::Int);
        table.add("A", a, None, CodeLoc::default());
        table.add("B", b, Some("A".to_owned()), CodeLoc::default());
        table.add("C", c, Some("B".to_owned()), CodeLoc::default());
        assert!(table.resolve_ancestry().is_empty());
        assert!(table.is_ancestor("A", "C"));
        assert!(!table.is_ancestor("C", "A"));
        table.flatten("C", &mut arena).unwrap();
        let names: Vec<&String> = arena.vars(c).map(|(n, _)| n).collect();
        assert_eq!(names, ["x", "y", "z"]);
    }
}
