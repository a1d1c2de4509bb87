//! Lowers a checked program to a linear stack IR, the hand-off point
//! for a downstream backend. Assumes checking succeeded; anything the
//! backend cannot express is a `CodegenError`.

use smol_str::SmolStr;
use std::fmt;

use tlisp_ast::{NodeId, NodeKind, Program};
use tlisp_typeck::{Ty, TypeCheckResult};

// ── Error ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CodegenError {
    pub message: String,
}

impl CodegenError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codegen error: {}", self.message)
    }
}

impl std::error::Error for CodegenError {}

// ── IR ───────────────────────────────────────────────────────────

pub type Label = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    PushInt(i32),
    PushBool(bool),
    PushStr(SmolStr),
    Load(SmolStr),
    Store(SmolStr),
    Call { name: SmolStr, argc: u32 },
    JumpIfFalse(Label),
    Jump(Label),
    Label(Label),
    Ret,
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::PushInt(v) => write!(f, "push.int {}", v),
            Inst::PushBool(v) => write!(f, "push.bool {}", v),
            Inst::PushStr(s) => write!(f, "push.str {:?}", s.as_str()),
            Inst::Load(name) => write!(f, "load {}", name),
            Inst::Store(name) => write!(f, "store {}", name),
            Inst::Call { name, argc } => write!(f, "call {} {}", name, argc),
            Inst::JumpIfFalse(l) => write!(f, "jump.if.false L{}", l),
            Inst::Jump(l) => write!(f, "jump L{}", l),
            Inst::Label(l) => write!(f, "L{}:", l),
            Inst::Ret => write!(f, "ret"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrFunc {
    pub name: SmolStr,
    pub params: Vec<(SmolStr, Ty)>,
    pub ret: Ty,
    pub body: Vec<Inst>,
}

#[derive(Debug, Clone, Default)]
pub struct IrModule {
    pub funcs: Vec<IrFunc>,
    /// Top-level non-`def` forms, in source order.
    pub entry: Vec<Inst>,
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in &self.funcs {
            write!(f, "func {}(", func.name)?;
            for (i, (name, ty)) in func.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", name, ty)?;
            }
            writeln!(f, ") -> {}:", func.ret)?;
            for inst in &func.body {
                writeln!(f, "  {}", inst)?;
            }
        }
        if !self.entry.is_empty() {
            writeln!(f, "entry:")?;
            for inst in &self.entry {
                writeln!(f, "  {}", inst)?;
            }
        }
        Ok(())
    }
}

// ── Lowering ─────────────────────────────────────────────────────

/// Lower a checked program. Call this only after `check` produced no
/// diagnostics; shapes the checker rejects are errors here too.
pub fn lower(program: &Program, types: &TypeCheckResult) -> Result<IrModule, CodegenError> {
    let mut lowerer = Lowerer {
        program,
        types,
        next_label: 0,
    };
    let mut module = IrModule::default();

    for &root in &program.roots {
        if lowerer.is_def(root) {
            module.funcs.push(lowerer.lower_def(root)?);
        } else {
            lowerer.lower_expr(root, &mut module.entry)?;
        }
    }

    Ok(module)
}

struct Lowerer<'a> {
    program: &'a Program,
    types: &'a TypeCheckResult,
    next_label: Label,
}

impl<'a> Lowerer<'a> {
    fn fresh_label(&mut self) -> Label {
        let l = self.next_label;
        self.next_label += 1;
        l
    }

    fn is_def(&self, node: NodeId) -> bool {
        self.program
            .as_list(node)
            .and_then(|children| children.first())
            .and_then(|&head| self.program.as_atom(head))
            .is_some_and(|head| head == "def")
    }

    fn lower_def(&mut self, node: NodeId) -> Result<IrFunc, CodegenError> {
        let children = self
            .program
            .as_list(node)
            .ok_or_else(|| CodegenError::new("expected a def form"))?;
        if children.len() < 6 {
            return Err(CodegenError::new("malformed def form"));
        }

        let name = self
            .program
            .as_atom(children[1])
            .ok_or_else(|| CodegenError::new("malformed def form"))?
            .clone();

        let scheme = self
            .types
            .scheme_of(&name)
            .ok_or_else(|| CodegenError::new(format!("no scheme for function {}", name)))?;

        // parameter names from the source, types by unrolling the scheme's
        // arrow chain
        let mut params = Vec::new();
        let mut cursor = scheme.body.clone();
        for &param in &children[4..children.len() - 1] {
            let p_name = self
                .program
                .as_list(param)
                .and_then(|triple| triple.first())
                .and_then(|&p| self.program.as_atom(p))
                .ok_or_else(|| CodegenError::new("malformed parameter"))?
                .clone();
            let Ty::Arrow(arg, ret) = cursor else {
                return Err(CodegenError::new(format!(
                    "function type of {} is shorter than its parameter list",
                    name
                )));
            };
            params.push((p_name, *arg));
            cursor = *ret;
        }

        let mut body = Vec::new();
        self.lower_expr(children[children.len() - 1], &mut body)?;
        body.push(Inst::Ret);

        Ok(IrFunc {
            name,
            params,
            ret: cursor,
            body,
        })
    }

    fn lower_expr(&mut self, node: NodeId, out: &mut Vec<Inst>) -> Result<(), CodegenError> {
        match &self.program.nodes[node].kind {
            NodeKind::Atom(text) => self.lower_atom(text, out),
            NodeKind::List(children) => {
                let children = children.clone();
                self.lower_list(node, &children, out)
            }
        }
    }

    fn lower_atom(&self, text: &SmolStr, out: &mut Vec<Inst>) -> Result<(), CodegenError> {
        if text == "true" {
            out.push(Inst::PushBool(true));
            return Ok(());
        }
        if text == "false" {
            out.push(Inst::PushBool(false));
            return Ok(());
        }
        if let Ok(value) = text.parse::<i32>() {
            out.push(Inst::PushInt(value));
            return Ok(());
        }
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            out.push(Inst::PushStr(SmolStr::new(&text[1..text.len() - 1])));
            return Ok(());
        }
        if text.starts_with('\'') {
            return Err(CodegenError::new(format!(
                "type placeholder {} has no runtime value",
                text
            )));
        }
        out.push(Inst::Load(text.clone()));
        Ok(())
    }

    fn lower_list(
        &mut self,
        node: NodeId,
        children: &[NodeId],
        out: &mut Vec<Inst>,
    ) -> Result<(), CodegenError> {
        let head = children
            .first()
            .and_then(|&h| self.program.as_atom(h))
            .ok_or_else(|| CodegenError::new("expected atom as first element of list"))?
            .clone();

        match head.as_str() {
            "def" => Err(CodegenError::new(
                "nested function definitions are not supported",
            )),
            "let" if children.len() == 5 => {
                self.lower_expr(children[4], out)?;
                let name = self
                    .program
                    .as_atom(children[1])
                    .ok_or_else(|| CodegenError::new("malformed let form"))?;
                out.push(Inst::Store(name.clone()));
                Ok(())
            }
            "set" if children.len() == 3 => {
                self.lower_expr(children[2], out)?;
                let name = self
                    .program
                    .as_atom(children[1])
                    .ok_or_else(|| CodegenError::new("malformed set form"))?;
                out.push(Inst::Store(name.clone()));
                Ok(())
            }
            "if" if children.len() == 4 => {
                let else_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.lower_expr(children[1], out)?;
                out.push(Inst::JumpIfFalse(else_label));
                self.lower_expr(children[2], out)?;
                out.push(Inst::Jump(end_label));
                out.push(Inst::Label(else_label));
                self.lower_expr(children[3], out)?;
                out.push(Inst::Label(end_label));
                Ok(())
            }
            "let" | "set" | "if" => Err(CodegenError::new(format!("malformed {} form", head))),
            _ => {
                // a call whose checked type is still an arrow was applied
                // to too few arguments; the backend refuses partial
                // application even though the type system allows it
                if let Some(ty @ Ty::Arrow(_, _)) = self.types.final_type_of(node) {
                    return Err(CodegenError::new(format!(
                        "partial application is not supported: call has residual type {}",
                        ty
                    )));
                }
                for &arg in &children[1..] {
                    self.lower_expr(arg, out)?;
                }
                out.push(Inst::Call {
                    name: head,
                    argc: (children.len() - 1) as u32,
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_src(source: &str) -> Result<IrModule, CodegenError> {
        let (program, parse_errors) = tlisp_parser::parse(source);
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);
        let result = tlisp_typeck::check(&program);
        assert!(
            result.is_ok(),
            "unexpected diagnostics: {:?}",
            result.diagnostics()
        );
        lower(&program, &result)
    }

    #[test]
    fn lowers_arithmetic_to_stack_code() {
        let module = lower_src("(+ 1 2)").unwrap();
        assert_eq!(
            module.entry,
            vec![
                Inst::PushInt(1),
                Inst::PushInt(2),
                Inst::Call {
                    name: "+".into(),
                    argc: 2
                },
            ]
        );
    }

    #[test]
    fn lowers_def_to_function() {
        let module = lower_src("(def add : int (x : int) (y : int) (+ x y))").unwrap();
        assert_eq!(module.funcs.len(), 1);
        let func = &module.funcs[0];
        assert_eq!(func.name, "add");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0], ("x".into(), Ty::atomic("int")));
        assert_eq!(func.ret, Ty::atomic("int"));
        assert_eq!(func.body.last(), Some(&Inst::Ret));
    }

    #[test]
    fn lowers_let_and_set_to_store() {
        let module = lower_src("(let x : int 5) (set x 6)").unwrap();
        assert_eq!(
            module.entry,
            vec![
                Inst::PushInt(5),
                Inst::Store("x".into()),
                Inst::PushInt(6),
                Inst::Store("x".into()),
            ]
        );
    }

    #[test]
    fn lowers_if_to_labels() {
        let module = lower_src("(if (> 1 0) 42 0)").unwrap();
        assert_eq!(
            module.entry,
            vec![
                Inst::PushInt(1),
                Inst::PushInt(0),
                Inst::Call {
                    name: ">".into(),
                    argc: 2
                },
                Inst::JumpIfFalse(0),
                Inst::PushInt(42),
                Inst::Jump(1),
                Inst::Label(0),
                Inst::PushInt(0),
                Inst::Label(1),
            ]
        );
    }

    #[test]
    fn string_literals_drop_their_quotes() {
        let module = lower_src(r#"(let s : string "hi")"#).unwrap();
        assert_eq!(module.entry[0], Inst::PushStr("hi".into()));
    }

    #[test]
    fn refuses_partial_application() {
        // the type system leaves a residual arrow for an under-applied
        // call; the backend rejects it
        let err = lower_src("(+ 1)").unwrap_err();
        assert!(err.message.contains("partial application"));
    }

    #[test]
    fn refuses_nested_def() {
        let (program, _) = tlisp_parser::parse(
            "(def outer : int (x : int) (def inner : int (y : int) y))",
        );
        let result = tlisp_typeck::check(&program);
        let err = lower(&program, &result).unwrap_err();
        assert!(err.message.contains("nested function definitions"));
    }

    #[test]
    fn display_renders_functions_and_entry() {
        let module = lower_src(
            "(def inc : int (x : int) (+ x 1))
             (inc 41)",
        )
        .unwrap();
        let text = module.to_string();
        assert!(text.contains("func inc(x: int) -> int:"));
        assert!(text.contains("  call + 2"));
        assert!(text.contains("entry:"));
        assert!(text.contains("  call inc 1"));
    }
}
