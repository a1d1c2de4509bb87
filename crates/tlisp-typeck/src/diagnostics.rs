use std::collections::HashSet;
use std::fmt;

use tlisp_ast::Span;

// ── Diagnostics ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Unbound,
    UnknownOperator,
    TypeMismatch,
    RecursiveUnification,
    TypeErrorInLetBinding,
    TypeErrorInAssignment,
    ReturnTypeMismatch,
    ConditionMustBeBool,
    BranchesHaveDifferentTypes,
    TypeErrorInCall,
    MalformedForm,
}

/// One reported error. `message` embeds any pretty-printed types at the
/// point of emission, so later growth of the substitution cannot change
/// what the user sees. `ty` is the involved type, also rendered eagerly.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
    pub ty: Option<String>,
    pub hint: &'static str,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {}",
            self.span.start, self.span.end, self.message
        )
    }
}

/// Append-only diagnostic collector. Re-emissions of an identical
/// (kind, span, message) triple are collapsed; order of first emission
/// is kept.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    seen: HashSet<(DiagnosticKind, Span, String)>,
    list: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        let key = (
            diagnostic.kind,
            diagnostic.span,
            diagnostic.message.clone(),
        );
        if self.seen.insert(key) {
            self.list.push(diagnostic);
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(kind: DiagnosticKind, start: u32, message: &str) -> Diagnostic {
        Diagnostic {
            kind,
            span: Span::new(start, start + 1),
            message: message.into(),
            ty: None,
            hint: "",
        }
    }

    #[test]
    fn identical_diagnostics_are_collapsed() {
        let mut sink = DiagnosticSink::new();
        sink.push(diag(DiagnosticKind::Unbound, 0, "unbound variable: x"));
        sink.push(diag(DiagnosticKind::Unbound, 0, "unbound variable: x"));
        assert_eq!(sink.into_vec().len(), 1);
    }

    #[test]
    fn same_message_different_span_is_kept() {
        let mut sink = DiagnosticSink::new();
        sink.push(diag(DiagnosticKind::Unbound, 0, "unbound variable: x"));
        sink.push(diag(DiagnosticKind::Unbound, 9, "unbound variable: x"));
        assert_eq!(sink.into_vec().len(), 2);
    }

    #[test]
    fn order_is_first_emission() {
        let mut sink = DiagnosticSink::new();
        sink.push(diag(DiagnosticKind::Unbound, 0, "first"));
        sink.push(diag(DiagnosticKind::TypeMismatch, 4, "second"));
        sink.push(diag(DiagnosticKind::Unbound, 0, "first"));
        let list = sink.into_vec();
        assert_eq!(list[0].message, "first");
        assert_eq!(list[1].message, "second");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn display_includes_span_and_message() {
        let d = diag(DiagnosticKind::TypeMismatch, 3, "type mismatch");
        assert_eq!(d.to_string(), "[3:4] type mismatch");
    }
}
