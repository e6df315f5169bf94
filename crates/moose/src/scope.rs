//! The unified scope/environment model.
//!
//! One node shape serves both halves of the pipeline: the type checker
//! instantiates the arena with declarations as payloads, the evaluator
//! with runtime values. Nodes live in a central arena addressed by plain
//! `u32` ids instead of shared pointers; method rebinding makes instance
//! environments self-referential, which is harmless between indices but
//! would be a cycle between `Rc`s. Nothing is reclaimed before the owning
//! interpreter instance drops.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    ast::OpPos,
    resolve::{Resolution, resolve_overload},
    types::{ClassAncestry, FnSig, Type},
};

/// Index of a scope node in its arena. Id 0 is always the root scope:
/// the prelude holding built-ins, of which the user-facing global scope
/// is the first child. Shadowing a built-in operator from the global
/// scope works because the two live in different nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ScopeId(u32);

impl ScopeId {
    pub const ROOT: Self = Self(0);

    fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("scope arena exceeds u32 indices"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Global,
    /// A block or function-call frame.
    Block,
    /// A class template or instance environment.
    Class { name: String },
    /// The member scope of a primitive type (`Int`, `String`, ...).
    BuiltinClass,
}

/// Failure modes of function/operator lookup, turned into compile errors
/// or runtime panics by the callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookupError {
    Ambiguous,
    NotFound,
}

/// One scope node: variables, function and operator overload tables, and
/// nested class scopes, plus the `closed` shadowing flag.
#[derive(Debug)]
pub(crate) struct Scope<V, C> {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    /// When set, lookup does not fall through to the parent for
    /// variables, functions, operators or classes. Toggled around member
    /// access; every set is paired with a restore.
    pub closed: bool,
    /// Insertion order is meaningful: for class scopes it is the
    /// positional order of constructor arguments.
    vars: IndexMap<String, V, ahash::RandomState>,
    funcs: AHashMap<String, Vec<(FnSig, C)>>,
    ops: AHashMap<(String, OpPos), Vec<(FnSig, C)>>,
    classes: AHashMap<String, ScopeId>,
}

impl<V, C> Scope<V, C> {
    fn new(parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            parent,
            kind,
            closed: false,
            vars: IndexMap::default(),
            funcs: AHashMap::new(),
            ops: AHashMap::new(),
            classes: AHashMap::new(),
        }
    }
}

/// Arena of scope nodes. The checker and the evaluator each own one.
#[derive(Debug)]
pub(crate) struct ScopeArena<V, C> {
    scopes: Vec<Scope<V, C>>,
}

impl<V, C> ScopeArena<V, C> {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None, ScopeKind::Global)],
        }
    }

    pub fn alloc(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        self.scopes.push(Scope::new(Some(parent), kind));
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope<V, C> {
        &self.scopes[id.index()]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope<V, C> {
        &mut self.scopes[id.index()]
    }

    /// Sets the closed flag, returning the previous state so callers can
    /// restore it LIFO on every exit path.
    pub fn set_closed(&mut self, id: ScopeId, closed: bool) -> bool {
        std::mem::replace(&mut self.get_mut(id).closed, closed)
    }

    // --- variables ---

    /// Defines (or overwrites) a variable in exactly this scope.
    pub fn define_var(&mut self, id: ScopeId, name: impl Into<String>, value: V) {
        self.get_mut(id).vars.insert(name.into(), value);
    }

    pub fn var_local(&self, id: ScopeId, name: &str) -> Option<&V> {
        self.get(id).vars.get(name)
    }

    /// Looks a variable up from `from` outward, stopping at a closed
    /// scope instead of crossing into its parent.
    pub fn lookup_var(&self, from: ScopeId, name: &str) -> Option<(ScopeId, &V)> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(value) = scope.vars.get(name) {
                return Some((id, value));
            }
            if scope.closed {
                return None;
            }
            current = scope.parent;
        }
        None
    }

    /// Walks outward to update an existing binding; when none is found
    /// and `allow_define` is set, defines the variable in `from`.
    /// Returns false when the variable neither existed nor was defined.
    pub fn update_var(&mut self, from: ScopeId, name: &str, value: V, allow_define: bool) -> bool {
        if let Some((id, _)) = self.lookup_var(from, name) {
            self.get_mut(id).vars.insert(name.to_owned(), value);
            return true;
        }
        if allow_define {
            self.define_var(from, name, value);
            return true;
        }
        false
    }

    /// Updates or defines strictly in `id`, never walking outward.
    pub fn update_var_current(&mut self, id: ScopeId, name: &str, value: V) {
        self.get_mut(id).vars.insert(name.to_owned(), value);
    }

    /// The variables of one scope in insertion order.
    pub fn vars(&self, id: ScopeId) -> impl Iterator<Item = (&String, &V)> {
        self.get(id).vars.iter()
    }

    /// Replaces a scope's variable table wholesale, preserving the order
    /// of `vars`. Used by class flattening to put inherited properties
    /// ahead of the class's own.
    pub fn replace_vars(&mut self, id: ScopeId, vars: Vec<(String, V)>) {
        let scope = self.get_mut(id);
        scope.vars.clear();
        scope.vars.extend(vars);
    }

    // --- functions and operators ---

    /// Adds an overload, refusing a parameter list that structurally
    /// collides (modulo nil) with one already in this scope.
    pub fn add_func(&mut self, id: ScopeId, name: &str, sig: FnSig, callee: C) -> Result<(), FnSig> {
        let overloads = self.get_mut(id).funcs.entry(name.to_owned()).or_default();
        if let Some((existing, _)) = overloads.iter().find(|(s, _)| s.collides_with(&sig)) {
            return Err(existing.clone());
        }
        overloads.push((sig, callee));
        Ok(())
    }

    pub fn add_op(
        &mut self,
        id: ScopeId,
        name: &str,
        pos: OpPos,
        sig: FnSig,
        callee: C,
    ) -> Result<(), FnSig> {
        let overloads = self
            .get_mut(id)
            .ops
            .entry((name.to_owned(), pos))
            .or_default();
        if let Some((existing, _)) = overloads.iter().find(|(s, _)| s.collides_with(&sig)) {
            return Err(existing.clone());
        }
        overloads.push((sig, callee));
        Ok(())
    }

    /// Resolves `name(args)` from `from` outward: a unique match in the
    /// nearest scope holding any wins; two matches in one scope are
    /// ambiguous; zero matches fall through to the parent unless the
    /// scope is closed.
    pub fn lookup_func(
        &self,
        from: ScopeId,
        name: &str,
        args: &[Type],
        classes: &impl ClassAncestry,
    ) -> Result<(&FnSig, &C), LookupError> {
        self.lookup_callable(from, args, classes, |scope| {
            scope.funcs.get(name).map(Vec::as_slice)
        })
    }

    pub fn lookup_op(
        &self,
        from: ScopeId,
        name: &str,
        pos: OpPos,
        args: &[Type],
        classes: &impl ClassAncestry,
    ) -> Result<(&FnSig, &C), LookupError> {
        self.lookup_callable(from, args, classes, |scope| {
            scope.ops.get(&(name.to_owned(), pos)).map(Vec::as_slice)
        })
    }

    /// Resolves a call against exactly one scope's table, the rule for
    /// member calls: a closed member scope never falls through to its
    /// parent.
    pub fn lookup_func_local(
        &self,
        id: ScopeId,
        name: &str,
        args: &[Type],
        classes: &impl ClassAncestry,
    ) -> Result<(&FnSig, &C), LookupError> {
        let Some(candidates) = self.get(id).funcs.get(name) else {
            return Err(LookupError::NotFound);
        };
        match resolve_overload(candidates, args, classes) {
            Resolution::Found((sig, callee)) => Ok((sig, callee)),
            Resolution::Ambiguous => Err(LookupError::Ambiguous),
            Resolution::NotFound => Err(LookupError::NotFound),
        }
    }

    fn lookup_callable<'s>(
        &'s self,
        from: ScopeId,
        args: &[Type],
        classes: &impl ClassAncestry,
        candidates_of: impl Fn(&'s Scope<V, C>) -> Option<&'s [(FnSig, C)]>,
    ) -> Result<(&'s FnSig, &'s C), LookupError> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(candidates) = candidates_of(scope) {
                match resolve_overload(candidates, args, classes) {
                    Resolution::Found((sig, callee)) => return Ok((sig, callee)),
                    Resolution::Ambiguous => return Err(LookupError::Ambiguous),
                    Resolution::NotFound => {}
                }
            }
            if scope.closed {
                return Err(LookupError::NotFound);
            }
            current = scope.parent;
        }
        Err(LookupError::NotFound)
    }

    /// All overloads of one scope's function table, for flattening and
    /// instance environment construction.
    pub fn funcs_local(&self, id: ScopeId) -> impl Iterator<Item = (&String, &[(FnSig, C)])> {
        self.get(id)
            .funcs
            .iter()
            .map(|(name, overloads)| (name, overloads.as_slice()))
    }

    // --- classes ---

    /// Registers a class scope under `name`; false when already taken.
    pub fn add_class(&mut self, id: ScopeId, name: &str, class_scope: ScopeId) -> bool {
        let classes = &mut self.get_mut(id).classes;
        if classes.contains_key(name) {
            return false;
        }
        classes.insert(name.to_owned(), class_scope);
        true
    }

    pub fn lookup_class(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(class_scope) = scope.classes.get(name) {
                return Some(*class_scope);
            }
            if scope.closed {
                return None;
            }
            current = scope.parent;
        }
        None
    }

    /// The innermost enclosing class scope, for `me`. Unlike name lookup
    /// this structural walk ignores the closed flag.
    pub fn nearest_class_scope(&self, from: ScopeId) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if matches!(scope.kind, ScopeKind::Class { .. }) {
                return Some(id);
            }
            current = scope.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NoClasses, ParamType};

    type TestArena = ScopeArena<i64, &'static str>;

    fn sig(params: Vec<Type>) -> FnSig {
        FnSig::new(params.into_iter().map(ParamType::new).collect(), Type::Void)
    }

    #[test]
    fn variable_lookup_walks_outward() {
        let mut arena = TestArena::new();
        arena.define_var(ScopeId::ROOT, "a", 1);
        let inner = arena.alloc(ScopeId::ROOT, ScopeKind::Block);
        assert_eq!(arena.lookup_var(inner, "a").map(|(_, v)| *v), Some(1));
        arena.define_var(inner, "a", 2);
        assert_eq!(arena.lookup_var(inner, "a").map(|(_, v)| *v), Some(2));
        assert_eq!(arena.lookup_var(ScopeId::ROOT, "a").map(|(_, v)| *v), Some(1));
    }

    #[test]
    fn closed_scope_blocks_transparent_lookup() {
        let mut arena = TestArena::new();
        arena.define_var(ScopeId::ROOT, "a", 1);
        let inner = arena.alloc(ScopeId::ROOT, ScopeKind::Block);
        arena.set_closed(inner, true);
        assert!(arena.lookup_var(inner, "a").is_none());
        arena.define_var(inner, "a", 2);
        assert_eq!(arena.lookup_var(inner, "a").map(|(_, v)| *v), Some(2));
    }

    #[test]
    fn update_walks_and_optionally_defines() {
        let mut arena = TestArena::new();
        arena.define_var(ScopeId::ROOT, "a", 1);
        let inner = arena.alloc(ScopeId::ROOT, ScopeKind::Block);
        assert!(arena.update_var(inner, "a", 5, false));
        assert_eq!(arena.var_local(ScopeId::ROOT, "a"), Some(&5));
        assert!(arena.var_local(inner, "a").is_none());
        assert!(!arena.update_var(inner, "b", 7, false));
        assert!(arena.update_var(inner, "b", 7, true));
        assert_eq!(arena.var_local(inner, "b"), Some(&7));
    }

    #[test]
    fn colliding_overload_is_refused() {
        let mut arena = TestArena::new();
        arena
            .add_func(ScopeId::ROOT, "f", sig(vec![Type::Int]), "first")
            .unwrap();
        assert!(
            arena
                .add_func(ScopeId::ROOT, "f", sig(vec![Type::Int]), "again")
                .is_err()
        );
        arena
            .add_func(ScopeId::ROOT, "f", sig(vec![Type::Float]), "second")
            .unwrap();
    }

    #[test]
    fn inner_scope_shadows_outer_overloads() {
        let mut arena = TestArena::new();
        arena
            .add_func(ScopeId::ROOT, "f", sig(vec![Type::Int]), "outer")
            .unwrap();
        let inner = arena.alloc(ScopeId::ROOT, ScopeKind::Block);
        arena
            .add_func(inner, "f", sig(vec![Type::Int]), "inner")
            .unwrap();
        let (_, callee) = arena
            .lookup_func(inner, "f", &[Type::Int], &NoClasses)
            .unwrap();
        assert_eq!(*callee, "inner");
    }

    #[test]
    fn ambiguity_is_reported_per_scope() {
        let mut arena = TestArena::new();
        arena
            .add_func(ScopeId::ROOT, "f", sig(vec![Type::Int]), "int")
            .unwrap();
        arena
            .add_func(ScopeId::ROOT, "f", sig(vec![Type::Float]), "float")
            .unwrap();
        assert_eq!(
            arena
                .lookup_func(ScopeId::ROOT, "f", &[Type::Nil], &NoClasses)
                .unwrap_err(),
            LookupError::Ambiguous
        );
    }

    #[test]
    fn operators_dispatch_on_position() {
        let mut arena = TestArena::new();
        arena
            .add_op(ScopeId::ROOT, "-", OpPos::Infix, sig(vec![Type::Int, Type::Int]), "sub")
            .unwrap();
        arena
            .add_op(ScopeId::ROOT, "-", OpPos::Prefix, sig(vec![Type::Int]), "neg")
            .unwrap();
        assert!(
            arena
                .lookup_op(ScopeId::ROOT, "-", OpPos::Prefix, &[Type::Int], &NoClasses)
                .is_ok()
        );
        assert_eq!(
            arena
                .lookup_op(ScopeId::ROOT, "-", OpPos::Postfix, &[Type::Int], &NoClasses)
                .unwrap_err(),
            LookupError::NotFound
        );
    }

    #[test]
    fn class_registry_and_nearest_class_scope() {
        let mut arena = TestArena::new();
        let class_scope = arena.alloc(
            ScopeId::ROOT,
            ScopeKind::Class {
                name: "A".to_owned(),
            },
        );
        assert!(arena.add_class(ScopeId::ROOT, "A", class_scope));
        assert!(!arena.add_class(ScopeId::ROOT, "A", class_scope));
        let method_frame = arena.alloc(class_scope, ScopeKind::Block);
        assert_eq!(arena.nearest_class_scope(method_frame), Some(class_scope));
        assert_eq!(arena.lookup_class(method_frame, "A"), Some(class_scope));
    }
}
