use smol_str::SmolStr;
use tlisp_ast::{Node, NodeId, NodeKind, Program};
use tlisp_lexer::{lex, Span, Token};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.start, self.span.end, self.message)
    }
}

/// Parse a source file into a sequence of top-level S-expressions.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let (tokens, lex_errors) = lex(source);
    let mut parser = Parser::new(source, tokens);
    let mut errors: Vec<ParseError> = lex_errors
        .into_iter()
        .map(|span| ParseError {
            message: "unexpected character".into(),
            span,
        })
        .collect();
    parser.parse_program();
    errors.append(&mut parser.errors);
    (parser.program, errors)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
    program: Program,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<(Token, Span)>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            program: Program::new(),
            errors: Vec::new(),
        }
    }

    // ── Token helpers ─────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|(_, s)| Span::new(s.end, s.end))
                    .unwrap_or(Span::new(0, 0))
            })
    }

    fn advance(&mut self) -> (Token, Span) {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn error(&mut self, message: String, span: Span) {
        self.errors.push(ParseError { message, span });
    }

    // ── Allocators ────────────────────────────────────────────────

    fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.program.nodes.alloc(Node { kind, span })
    }

    /// Atoms keep the raw source slice, quotes and ticks included; the
    /// checker classifies them from the text.
    fn atom_text(&self, span: Span) -> SmolStr {
        SmolStr::new(&self.source[span.start as usize..span.end as usize])
    }

    // ── Grammar ───────────────────────────────────────────────────

    fn parse_program(&mut self) {
        while !self.at_end() {
            if let Some(root) = self.parse_expr() {
                self.program.roots.push(root);
            }
        }
    }

    fn parse_expr(&mut self) -> Option<NodeId> {
        match self.peek() {
            Some(Token::LParen) => self.parse_list(),
            Some(Token::RParen) => {
                let span = self.peek_span();
                self.error("unexpected ')'".into(), span);
                self.advance();
                None
            }
            Some(_) => {
                let (_, span) = self.advance();
                let text = self.atom_text(span);
                Some(self.alloc(NodeKind::Atom(text), span))
            }
            None => None,
        }
    }

    fn parse_list(&mut self) -> Option<NodeId> {
        let (_, open) = self.advance();
        let mut children = Vec::new();

        loop {
            match self.peek() {
                Some(Token::RParen) => {
                    let (_, close) = self.advance();
                    let span = open.merge(close);
                    return Some(self.alloc(NodeKind::List(children), span));
                }
                Some(_) => {
                    if let Some(child) = self.parse_expr() {
                        children.push(child);
                    }
                }
                None => {
                    self.error("unclosed list".into(), open);
                    let span = open.merge(self.peek_span());
                    return Some(self.alloc(NodeKind::List(children), span));
                }
            }
        }
    }
}
