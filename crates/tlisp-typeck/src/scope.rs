use la_arena::{Arena, Idx};
use smol_str::SmolStr;
use std::collections::HashMap;

use crate::ty::{Ty, TyVarId, TypeScheme};
use crate::unify::TypeSystem;

// ── Scope tree ───────────────────────────────────────────────────

pub type ScopeId = Idx<ScopeData>;

/// One lexical scope: an environment of name → scheme plus a parent link.
/// Parent links are arena indices, so the tree has no ownership cycles.
#[derive(Debug)]
pub struct ScopeData {
    parent: Option<ScopeId>,
    env: HashMap<SmolStr, TypeScheme>,
}

/// The scope tree of one compilation. Scopes never own the type-system
/// handle; operations that instantiate take it as `&mut`.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Arena<ScopeData>,
    root: ScopeId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut scopes = Arena::new();
        let root = scopes.alloc(ScopeData {
            parent: None,
            env: HashMap::new(),
        });
        Self { scopes, root }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn create_child(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.alloc(ScopeData {
            parent: Some(parent),
            env: HashMap::new(),
        })
    }

    /// Bind `name` in `scope`. Non-empty `poly_vars` records the
    /// generalization; last write wins.
    pub fn define(&mut self, scope: ScopeId, name: SmolStr, ty: Ty, poly_vars: Vec<TyVarId>) {
        self.scopes[scope].env.insert(
            name,
            TypeScheme {
                vars: poly_vars,
                body: ty,
            },
        );
    }

    /// Resolve `name` in `scope` or any ancestor. Polymorphic schemes are
    /// instantiated, so every lookup of a polymorphic name gets its own
    /// fresh variables. `None` means unbound everywhere.
    pub fn lookup(&self, scope: ScopeId, name: &str, types: &mut TypeSystem) -> Option<Ty> {
        let scheme = self.scheme_of(scope, name)?;
        Some(Self::instantiate(scheme, types))
    }

    /// The declared scheme of `name`, un-instantiated, walking parents.
    pub fn scheme_of(&self, scope: ScopeId, name: &str) -> Option<&TypeScheme> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if let Some(scheme) = self.scopes[id].env.get(name) {
                return Some(scheme);
            }
            cursor = self.scopes[id].parent;
        }
        None
    }

    /// All bindings of one scope, for end-of-checking reporting.
    pub fn bindings(&self, scope: ScopeId) -> impl Iterator<Item = (&SmolStr, &TypeScheme)> {
        self.scopes[scope].env.iter()
    }

    /// Replace the scheme's bound variables with fresh ones. The body is
    /// resolved through the current substitution first: a generalized
    /// variable that checking has since pinned down keeps its binding
    /// rather than being silently re-opened.
    pub fn instantiate(scheme: &TypeScheme, types: &mut TypeSystem) -> Ty {
        let body = types.apply(&scheme.body);
        if scheme.vars.is_empty() {
            return body;
        }
        let mapping: HashMap<TyVarId, Ty> = scheme
            .vars
            .iter()
            .map(|&v| (v, types.fresh()))
            .collect();
        body.subst_vars(&mapping)
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
