use std::fmt;

use crate::ty::{Ty, TyVarId};

// ── Errors ───────────────────────────────────────────────────────

/// Why two types failed to unify. The inference engine wraps these into
/// contextual diagnostics; nothing here touches the diagnostic list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifyError {
    Mismatch { expected: Ty, found: Ty },
    Recursive { var: TyVarId, ty: Ty },
}

impl fmt::Display for UnifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnifyError::Mismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            UnifyError::Recursive { var, ty } => {
                write!(f, "recursive unification: ?{} occurs in {}", var, ty)
            }
        }
    }
}

// ── Type system handle ───────────────────────────────────────────

/// The shared state of one compilation: the fresh-variable supply and the
/// global substitution. Every scope in a compilation goes through exactly
/// one of these.
///
/// The substitution is indexed by `TyVarId`; the supply is the vector's
/// length, so ids are dense and never reused within one `TypeSystem`.
#[derive(Debug, Default)]
pub struct TypeSystem {
    subst: Vec<Option<Ty>>,
}

impl TypeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_id(&mut self) -> TyVarId {
        let id = self.subst.len() as TyVarId;
        self.subst.push(None);
        id
    }

    pub fn fresh(&mut self) -> Ty {
        Ty::Var(self.fresh_id())
    }

    /// Number of variables allocated so far.
    pub fn var_count(&self) -> usize {
        self.subst.len()
    }

    /// The substitution's fixed point of `ty`: variable chains are chased
    /// until the result contains only unbound variables.
    pub fn apply(&self, ty: &Ty) -> Ty {
        match ty {
            Ty::Var(id) => match self.subst.get(*id as usize) {
                Some(Some(resolved)) => self.apply(resolved),
                _ => ty.clone(),
            },
            Ty::Atomic(_) => ty.clone(),
            Ty::Arrow(arg, ret) => Ty::arrow(self.apply(arg), self.apply(ret)),
        }
    }

    /// Alias for [`apply`]; used when reporting final types.
    pub fn finalize(&self, ty: &Ty) -> Ty {
        self.apply(ty)
    }

    /// Make two types equal by extending the substitution.
    ///
    /// Both sides are resolved first, so a binding is only ever recorded
    /// for a variable that is currently unbound, and never to itself. A
    /// failing step records nothing.
    pub fn unify(&mut self, t1: &Ty, t2: &Ty) -> Result<(), UnifyError> {
        let a = self.apply(t1);
        let b = self.apply(t2);

        match (&a, &b) {
            (Ty::Var(x), Ty::Var(y)) if x == y => Ok(()),

            (Ty::Var(id), _) => {
                if self.occurs_in(*id, &b) {
                    return Err(UnifyError::Recursive { var: *id, ty: b });
                }
                self.subst[*id as usize] = Some(b);
                Ok(())
            }

            (_, Ty::Var(_)) => self.unify(&b, &a),

            (Ty::Arrow(a1, r1), Ty::Arrow(a2, r2)) => {
                self.unify(a1, a2)?;
                self.unify(r1, r2)
            }

            (Ty::Atomic(n1), Ty::Atomic(n2)) if n1 == n2 => Ok(()),

            _ => Err(UnifyError::Mismatch {
                expected: a,
                found: b,
            }),
        }
    }

    fn occurs_in(&self, var: TyVarId, ty: &Ty) -> bool {
        self.apply(ty).free_vars().contains(&var)
    }
}
