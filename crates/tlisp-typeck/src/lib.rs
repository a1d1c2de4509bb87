//! Type checker for the tlisp language: explicit annotations on binders,
//! unification with occurs-check, and let-polymorphism via per-lookup
//! instantiation. Errors are collected as diagnostics, never raised.

mod checker;
mod diagnostics;
mod prelude;
mod scope;
mod ty;
mod unify;


use la_arena::ArenaMap;
use smol_str::SmolStr;
use std::collections::HashMap;

use tlisp_ast::{NodeId, Program};

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use scope::{ScopeData, ScopeId, ScopeTree};
pub use ty::{Ty, TyVarId, TypeScheme};
pub use unify::{TypeSystem, UnifyError};

/// Everything downstream passes need after checking: diagnostics in
/// first-emission order, the substituted type of every visited node, and
/// the declared schemes of top-level names.
pub struct TypeCheckResult {
    diagnostics: Vec<Diagnostic>,
    node_types: ArenaMap<NodeId, Ty>,
    schemes: HashMap<SmolStr, TypeScheme>,
}

impl TypeCheckResult {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The final (substituted) type of a visited node.
    pub fn final_type_of(&self, node: NodeId) -> Option<&Ty> {
        self.node_types.get(node)
    }

    /// The declared scheme of a top-level name.
    pub fn scheme_of(&self, name: &str) -> Option<&TypeScheme> {
        self.schemes.get(name)
    }
}

/// Type-check a whole program against a root scope seeded with the
/// built-in prelude.
pub fn check(program: &Program) -> TypeCheckResult {
    let mut checker = checker::Checker::new(program);
    checker.check_program();
    checker.finish()
}
