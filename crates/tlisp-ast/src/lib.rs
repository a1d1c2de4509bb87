use la_arena::{Arena, Idx};
use smol_str::SmolStr;
use std::fmt::Write;

pub use tlisp_lexer::Span;

// ── ID types ──────────────────────────────────────────────────────

pub type NodeId = Idx<Node>;

// ── Program ───────────────────────────────────────────────────────

/// A parsed source file: a sequence of top-level expressions.
///
/// All nodes live in one arena; the tree is immutable after parsing.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Arena<Node>,
    pub roots: Vec<NodeId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// The atom text of `id`, if it is an atom.
    pub fn as_atom(&self, id: NodeId) -> Option<&SmolStr> {
        match &self.nodes[id].kind {
            NodeKind::Atom(text) => Some(text),
            NodeKind::List(_) => None,
        }
    }

    /// The children of `id`, if it is a list.
    pub fn as_list(&self, id: NodeId) -> Option<&[NodeId]> {
        match &self.nodes[id].kind {
            NodeKind::Atom(_) => None,
            NodeKind::List(children) => Some(children),
        }
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    /// Render the whole program back to S-expression text, one root per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            self.dump_node(root, &mut out);
            out.push('\n');
        }
        out
    }

    fn dump_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Atom(text) => {
                let _ = write!(out, "{}", text);
            }
            NodeKind::List(children) => {
                out.push('(');
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.dump_node(child, out);
                }
                out.push(')');
            }
        }
    }
}

// ── Nodes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// An S-expression node. Atoms keep their raw source text: the checker
/// classifies literals, ticked type variables, and names from the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Atom(SmolStr),
    List(Vec<NodeId>),
}
