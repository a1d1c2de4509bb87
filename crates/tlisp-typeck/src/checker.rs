use la_arena::ArenaMap;
use smol_str::SmolStr;
use std::collections::HashMap;

use tlisp_ast::{NodeId, Program, Span};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::prelude;
use crate::scope::{ScopeId, ScopeTree};
use crate::ty::{Ty, TyVarId};
use crate::unify::TypeSystem;
use crate::TypeCheckResult;

/// Ticked identifiers already seen within one binder form. The same
/// spelling resolves to the same generalized variable; distinct spellings
/// get distinct variables.
type TickTable = HashMap<SmolStr, TyVarId>;

pub(crate) struct Checker<'a> {
    program: &'a Program,
    types: TypeSystem,
    scopes: ScopeTree,
    diagnostics: DiagnosticSink,
    node_types: ArenaMap<NodeId, Ty>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(program: &'a Program) -> Self {
        let mut scopes = ScopeTree::new();
        let root = scopes.root();
        prelude::install(&mut scopes, root);
        Self {
            program,
            types: TypeSystem::new(),
            scopes,
            diagnostics: DiagnosticSink::new(),
            node_types: ArenaMap::default(),
        }
    }

    pub(crate) fn check_program(&mut self) {
        let root = self.scopes.root();
        for &node in &self.program.roots {
            self.check_node(node, root);
        }
    }

    pub(crate) fn finish(self) -> TypeCheckResult {
        let mut node_types = ArenaMap::default();
        for (id, ty) in self.node_types.iter() {
            node_types.insert(id, self.types.finalize(ty));
        }

        let mut schemes = HashMap::new();
        for (name, scheme) in self.scopes.bindings(self.scopes.root()) {
            let mut resolved = scheme.clone();
            resolved.body = self.types.finalize(&resolved.body);
            schemes.insert(name.clone(), resolved);
        }

        TypeCheckResult {
            diagnostics: self.diagnostics.into_vec(),
            node_types,
            schemes,
        }
    }

    // ── Traversal ────────────────────────────────────────────────

    /// Establish the type of one expression. Every error is recovered
    /// locally so a single pass reports as much as possible.
    fn check_node(&mut self, node: NodeId, scope: ScopeId) -> Ty {
        let ty = match &self.program.nodes[node].kind {
            tlisp_ast::NodeKind::Atom(text) => {
                let text = text.clone();
                self.check_atom(node, &text, scope)
            }
            tlisp_ast::NodeKind::List(children) => {
                let children = children.clone();
                self.check_list(node, &children, scope)
            }
        };
        self.node_types.insert(node, ty.clone());
        ty
    }

    // ── Atoms ────────────────────────────────────────────────────

    fn check_atom(&mut self, node: NodeId, text: &str, scope: ScopeId) -> Ty {
        if text == "true" || text == "false" {
            return Ty::atomic("bool");
        }
        if text.parse::<i32>().is_ok() {
            return Ty::atomic("int");
        }
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Ty::atomic("string");
        }
        // a tick in expression position is an independent fresh slot
        if text.starts_with('\'') {
            return self.types.fresh();
        }

        match self.scopes.lookup(scope, text, &mut self.types) {
            Some(ty) => ty,
            None => {
                self.report_unbound(text, self.program.span(node));
                self.types.fresh()
            }
        }
    }

    fn report_unbound(&mut self, name: &str, span: Span) {
        if prelude::looks_like_operator(name) {
            self.report(
                DiagnosticKind::UnknownOperator,
                span,
                format!("unknown operator: {}", name),
                None,
                "not a built-in operator",
            );
        } else {
            self.report(
                DiagnosticKind::Unbound,
                span,
                format!("unbound variable: {}", name),
                None,
                "name is not defined in any enclosing scope",
            );
        }
    }

    // ── Lists ────────────────────────────────────────────────────

    fn check_list(&mut self, node: NodeId, children: &[NodeId], scope: ScopeId) -> Ty {
        let span = self.program.span(node);

        if children.is_empty() {
            return self.malformed(span, "empty list", "expected an operator or special form");
        }

        let Some(head) = self.program.as_atom(children[0]).cloned() else {
            return self.malformed(
                span,
                "expected atom as first element of list",
                "the first element of a call must be a name",
            );
        };

        match head.as_str() {
            "let" => self.check_let(node, children, scope),
            "def" => self.check_def(node, children, scope),
            "set" => self.check_set(node, children, scope),
            "if" => self.check_if(node, children, scope),
            _ => self.check_call(node, children, &head, scope),
        }
    }

    /// `(let name : type value)`
    fn check_let(&mut self, node: NodeId, children: &[NodeId], scope: ScopeId) -> Ty {
        let span = self.program.span(node);
        let hint = "expected (let name : type value)";

        if children.len() != 5 {
            return self.malformed(span, "malformed let expression", hint);
        }
        let (Some(name), Some(colon), Some(type_text)) = (
            self.program.as_atom(children[1]).cloned(),
            self.program.as_atom(children[2]),
            self.program.as_atom(children[3]).cloned(),
        ) else {
            return self.malformed(span, "malformed let expression", hint);
        };
        if colon != ":" {
            return self.malformed(span, "malformed let expression", hint);
        }

        let mut ticks = TickTable::new();
        let mut poly_vars = Vec::new();
        let declared = self.resolve_annotation(&type_text, &mut ticks, &mut poly_vars);

        let value_ty = self.check_node(children[4], scope);

        if let Err(err) = self.types.unify(&declared, &value_ty) {
            self.report(
                DiagnosticKind::TypeErrorInLetBinding,
                span,
                format!("type error in let binding: {}", err),
                Some(declared.to_string()),
                "the value must have the declared type",
            );
        }

        self.scopes.define(scope, name, declared.clone(), poly_vars);
        declared
    }

    /// `(def name : return-type (param : type) ... body)`
    fn check_def(&mut self, node: NodeId, children: &[NodeId], scope: ScopeId) -> Ty {
        let span = self.program.span(node);
        let hint = "expected (def name : return-type (param : type) ... body)";

        if children.len() < 6 {
            return self.malformed(span, "malformed def expression", hint);
        }
        let (Some(name), Some(colon), Some(ret_text)) = (
            self.program.as_atom(children[1]).cloned(),
            self.program.as_atom(children[2]),
            self.program.as_atom(children[3]).cloned(),
        ) else {
            return self.malformed(span, "malformed def expression", hint);
        };
        if colon != ":" {
            return self.malformed(span, "malformed def expression", hint);
        }

        let fn_scope = self.scopes.create_child(scope);
        let mut ticks = TickTable::new();
        let mut poly_vars = Vec::new();
        let mut param_types = Vec::new();

        let params = &children[4..children.len() - 1];
        let body = children[children.len() - 1];

        for &param in params {
            let param_span = self.program.span(param);
            let Some(triple) = self.program.as_list(param) else {
                self.malformed(param_span, "malformed parameter", "expected (name : type)");
                continue;
            };
            if triple.len() != 3 {
                self.malformed(param_span, "malformed parameter", "expected (name : type)");
                continue;
            }
            let (Some(p_name), Some(p_colon), Some(p_type)) = (
                self.program.as_atom(triple[0]).cloned(),
                self.program.as_atom(triple[1]),
                self.program.as_atom(triple[2]).cloned(),
            ) else {
                self.malformed(param_span, "malformed parameter", "expected (name : type)");
                continue;
            };
            if p_colon != ":" {
                self.malformed(param_span, "malformed parameter", "expected (name : type)");
                continue;
            }

            let param_ty = self.resolve_annotation(&p_type, &mut ticks, &mut poly_vars);
            self.scopes
                .define(fn_scope, p_name, param_ty.clone(), vec![]);
            param_types.push(param_ty);
        }

        let ret_ty = self.resolve_annotation(&ret_text, &mut ticks, &mut poly_vars);
        let fn_ty = Ty::arrow_chain(&param_types, ret_ty.clone());

        // provisional self-binding: direct recursion checks against the
        // declared annotations, without generalization
        self.scopes
            .define(fn_scope, name.clone(), fn_ty.clone(), vec![]);

        let body_ty = self.check_node(body, fn_scope);

        if let Err(err) = self.types.unify(&ret_ty, &body_ty) {
            self.report(
                DiagnosticKind::ReturnTypeMismatch,
                span,
                format!("return type mismatch: {}", err),
                Some(ret_ty.to_string()),
                "the body must have the declared return type",
            );
        }

        self.scopes.define(scope, name, fn_ty.clone(), poly_vars);
        fn_ty
    }

    /// `(set name value)`
    fn check_set(&mut self, node: NodeId, children: &[NodeId], scope: ScopeId) -> Ty {
        let span = self.program.span(node);
        let hint = "expected (set name value)";

        if children.len() != 3 {
            return self.malformed(span, "malformed set expression", hint);
        }
        let Some(name) = self.program.as_atom(children[1]).cloned() else {
            return self.malformed(span, "malformed set expression", hint);
        };

        let value_ty = self.check_node(children[2], scope);

        // a polymorphic binding is instantiated here: the assignment
        // narrows the use site, not the scheme
        match self.scopes.lookup(scope, &name, &mut self.types) {
            Some(var_ty) => {
                if let Err(err) = self.types.unify(&var_ty, &value_ty) {
                    self.report(
                        DiagnosticKind::TypeErrorInAssignment,
                        span,
                        format!("type error in assignment: {}", err),
                        Some(var_ty.to_string()),
                        "the assigned value must have the variable's type",
                    );
                }
            }
            None => self.report_unbound(&name, self.program.span(children[1])),
        }

        value_ty
    }

    /// `(if condition then else)`
    fn check_if(&mut self, node: NodeId, children: &[NodeId], scope: ScopeId) -> Ty {
        let span = self.program.span(node);

        if children.len() != 4 {
            return self.malformed(
                span,
                "malformed if expression",
                "expected (if condition then else)",
            );
        }

        let cond_ty = self.check_node(children[1], scope);
        if let Err(err) = self.types.unify(&cond_ty, &Ty::atomic("bool")) {
            self.report(
                DiagnosticKind::ConditionMustBeBool,
                self.program.span(children[1]),
                format!("condition must be bool: {}", err),
                Some(cond_ty.to_string()),
                "the condition of an if must be a bool",
            );
        }

        let then_ty = self.check_node(children[2], scope);
        let else_ty = self.check_node(children[3], scope);

        if let Err(err) = self.types.unify(&then_ty, &else_ty) {
            self.report(
                DiagnosticKind::BranchesHaveDifferentTypes,
                span,
                format!("branches have different types: {}", err),
                Some(then_ty.to_string()),
                "both branches of an if must have the same type",
            );
        }

        then_ty
    }

    /// `(f arg ...)`: any list whose head is not a special form.
    fn check_call(
        &mut self,
        node: NodeId,
        children: &[NodeId],
        head: &SmolStr,
        scope: ScopeId,
    ) -> Ty {
        let span = self.program.span(node);

        let mut arg_types = Vec::new();
        for &arg in &children[1..] {
            arg_types.push(self.check_node(arg, scope));
        }

        // instantiated per call site, so one polymorphic function can be
        // used at different types in the same program
        let Some(fn_ty) = self.scopes.lookup(scope, head, &mut self.types) else {
            self.report_unbound(head, self.program.span(children[0]));
            return self.types.fresh();
        };

        let result = self.types.fresh();
        let expected = Ty::arrow_chain(&arg_types, result.clone());

        if let Err(err) = self.types.unify(&fn_ty, &expected) {
            self.report(
                DiagnosticKind::TypeErrorInCall,
                span,
                format!("type error in function call: {}", err),
                Some(self.types.apply(&fn_ty).to_string()),
                "argument types must match the function's parameters",
            );
        }

        result
    }

    // ── Annotations ──────────────────────────────────────────────

    /// Resolve one type annotation atom. A ticked identifier allocates a
    /// fresh variable on first sight within the current binder form and
    /// records it for generalization; anything else is a nominal type.
    fn resolve_annotation(
        &mut self,
        text: &str,
        ticks: &mut TickTable,
        poly_vars: &mut Vec<TyVarId>,
    ) -> Ty {
        match text.strip_prefix('\'') {
            Some(rest) => {
                if let Some(&id) = ticks.get(rest) {
                    return Ty::Var(id);
                }
                let id = self.types.fresh_id();
                ticks.insert(SmolStr::new(rest), id);
                poly_vars.push(id);
                Ty::Var(id)
            }
            None => Ty::Atomic(SmolStr::new(text)),
        }
    }

    // ── Reporting ────────────────────────────────────────────────

    fn report(
        &mut self,
        kind: DiagnosticKind,
        span: Span,
        message: String,
        ty: Option<String>,
        hint: &'static str,
    ) {
        self.diagnostics.push(Diagnostic {
            kind,
            span,
            message,
            ty,
            hint,
        });
    }

    /// Shape violation: report and yield a fresh variable so checking of
    /// the surrounding tree continues.
    fn malformed(&mut self, span: Span, message: &str, hint: &'static str) -> Ty {
        self.report(
            DiagnosticKind::MalformedForm,
            span,
            message.to_string(),
            None,
            hint,
        );
        self.types.fresh()
    }
}
