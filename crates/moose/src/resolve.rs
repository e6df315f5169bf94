//! Multi-dispatch overload resolution, shared by the type checker and the
//! evaluator.
//!
//! A candidate signature matches a call when the arity is equal and every
//! argument is either `Nil` (nil fits any parameter) or widens into the
//! parameter type via `super_of`. Two or more matches within one scope are
//! an ambiguity; the rule is deliberately conservative and never picks a
//! "most specific" winner.

use crate::types::{ClassAncestry, FnSig, Type};

/// Outcome of matching a call against the candidates of a single scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution<T> {
    Found(T),
    Ambiguous,
    NotFound,
}

pub(crate) fn sig_matches(sig: &FnSig, args: &[Type], classes: &impl ClassAncestry) -> bool {
    sig.params.len() == args.len()
        && sig
            .params
            .iter()
            .zip(args)
            .all(|(param, arg)| *arg == Type::Nil || param.ty.super_of(arg, classes))
}

/// Picks the unique applicable candidate among one scope's overloads.
pub(crate) fn resolve_overload<'c, C>(
    candidates: &'c [(FnSig, C)],
    args: &[Type],
    classes: &impl ClassAncestry,
) -> Resolution<&'c (FnSig, C)> {
    let mut found = None;
    for candidate in candidates {
        if sig_matches(&candidate.0, args, classes) {
            if found.is_some() {
                return Resolution::Ambiguous;
            }
            found = Some(candidate);
        }
    }
    match found {
        Some(candidate) => Resolution::Found(candidate),
        None => Resolution::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NoClasses, ParamType};

    fn sig(params: Vec<Type>) -> FnSig {
        FnSig::new(params.into_iter().map(ParamType::new).collect(), Type::Void)
    }

    #[test]
    fn unique_match_wins() {
        let candidates = vec![(sig(vec![Type::Int]), 1), (sig(vec![Type::Float]), 2)];
        match resolve_overload(&candidates, &[Type::Int], &NoClasses) {
            Resolution::Found((_, id)) => assert_eq!(*id, 1),
            other => panic!("expected a unique match, got {other:?}"),
        }
    }

    #[test]
    fn nil_argument_matches_everything() {
        let candidates = vec![(sig(vec![Type::Int]), 1), (sig(vec![Type::Float]), 2)];
        assert_eq!(
            resolve_overload(&candidates, &[Type::Nil], &NoClasses),
            Resolution::Ambiguous
        );
        let only_int = vec![(sig(vec![Type::Int]), 1)];
        assert!(matches!(
            resolve_overload(&only_int, &[Type::Nil], &NoClasses),
            Resolution::Found(_)
        ));
    }

    #[test]
    fn arity_mismatch_is_not_found() {
        let candidates = vec![(sig(vec![Type::Int, Type::Int]), 1)];
        assert_eq!(
            resolve_overload(&candidates, &[Type::Int], &NoClasses),
            Resolution::NotFound
        );
    }
}
