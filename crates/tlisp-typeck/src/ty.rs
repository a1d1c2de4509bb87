use smol_str::SmolStr;
use std::collections::HashMap;
use std::fmt;

// ── Type terms ───────────────────────────────────────────────────

pub type TyVarId = u32;

/// A type term. Persistent value semantics: substitution builds a new
/// term, it never mutates one in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    /// Nominal ground type: `int`, `bool`, `string`, or any user-defined
    /// name, treated opaquely.
    Atomic(SmolStr),
    /// Unification variable.
    Var(TyVarId),
    /// Function type. Multi-argument functions are right-associated
    /// chains of arrows.
    Arrow(Box<Ty>, Box<Ty>),
}

impl Ty {
    pub fn atomic(name: &str) -> Ty {
        Ty::Atomic(SmolStr::new(name))
    }

    pub fn arrow(arg: Ty, ret: Ty) -> Ty {
        Ty::Arrow(Box::new(arg), Box::new(ret))
    }

    /// Curried arrow from a parameter list: right fold, last parameter
    /// innermost.
    pub fn arrow_chain(params: &[Ty], ret: Ty) -> Ty {
        params
            .iter()
            .rev()
            .fold(ret, |acc, p| Ty::arrow(p.clone(), acc))
    }

    /// Every `Var` id appearing in the term, in depth-first order.
    /// Duplicates are kept; callers treat the result as a set.
    pub fn free_vars(&self) -> Vec<TyVarId> {
        let mut out = Vec::new();
        self.collect_free_vars(&mut out);
        out
    }

    fn collect_free_vars(&self, out: &mut Vec<TyVarId>) {
        match self {
            Ty::Atomic(_) => {}
            Ty::Var(id) => out.push(*id),
            Ty::Arrow(arg, ret) => {
                arg.collect_free_vars(out);
                ret.collect_free_vars(out);
            }
        }
    }

    /// Replace variables according to `mapping`; unmapped variables and
    /// atomics are returned unchanged.
    pub fn subst_vars(&self, mapping: &HashMap<TyVarId, Ty>) -> Ty {
        match self {
            Ty::Atomic(_) => self.clone(),
            Ty::Var(id) => mapping.get(id).cloned().unwrap_or_else(|| self.clone()),
            Ty::Arrow(arg, ret) => {
                Ty::arrow(arg.subst_vars(mapping), ret.subst_vars(mapping))
            }
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Atomic(name) => write!(f, "{}", name),
            Ty::Var(id) => write!(f, "?{}", id),
            Ty::Arrow(arg, ret) => write!(f, "({} -> {})", arg, ret),
        }
    }
}

// ── Type schemes ─────────────────────────────────────────────────

/// A possibly-polymorphic type: the variable ids closed over by the
/// binder plus the body term. An empty `vars` list is a monotype.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeScheme {
    pub vars: Vec<TyVarId>,
    pub body: Ty,
}

impl TypeScheme {
    pub fn mono(body: Ty) -> Self {
        Self {
            vars: Vec::new(),
            body,
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        !self.vars.is_empty()
    }
}

impl fmt::Display for TypeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.vars.is_empty() {
            write!(f, "forall")?;
            for v in &self.vars {
                write!(f, " ?{}", v)?;
            }
            write!(f, ". ")?;
        }
        write!(f, "{}", self.body)
    }
}
