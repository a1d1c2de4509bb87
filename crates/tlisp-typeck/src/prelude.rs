use crate::scope::{ScopeId, ScopeTree};
use crate::ty::Ty;

/// Seed the root scope with the built-in operator schemes. Structural
/// tokens (`:`, `def`, `let`, `set`, `if`) are dispatched on before name
/// lookup and are deliberately not bound here.
pub(crate) fn install(scopes: &mut ScopeTree, root: ScopeId) {
    let int = Ty::atomic("int");
    let boolean = Ty::atomic("bool");

    let arith = Ty::arrow_chain(&[int.clone(), int.clone()], int.clone());
    for op in ["+", "-", "*", "/"] {
        scopes.define(root, op.into(), arith.clone(), vec![]);
    }

    let compare = Ty::arrow_chain(&[int.clone(), int], boolean.clone());
    for op in ["=", "!=", "<", ">", "<=", ">="] {
        scopes.define(root, op.into(), compare.clone(), vec![]);
    }

    let logic = Ty::arrow_chain(&[boolean.clone(), boolean.clone()], boolean);
    for op in ["and", "or"] {
        scopes.define(root, op.into(), logic.clone(), vec![]);
    }
}

/// True for atoms spelled entirely from operator characters. A failed
/// lookup of such an atom reports `UnknownOperator` instead of `Unbound`.
pub(crate) fn looks_like_operator(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| "+-*/<>=!".contains(c))
}
