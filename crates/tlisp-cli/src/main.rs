use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "tlisp", about = "Compiler front-end for the tlisp language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a .tl file and dump the AST
    Parse {
        /// Path to the .tl source file
        file: PathBuf,
    },
    /// Type-check a .tl file
    Check {
        /// Path to the .tl source file
        file: PathBuf,
    },
    /// Type-check a .tl file and print the backend IR
    Emit {
        /// Path to the .tl source file
        file: PathBuf,
    },
}

fn read_file(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {}", file.display(), e);
            std::process::exit(1);
        }
    }
}

/// 1-based line and column of a byte offset.
fn line_col(source: &str, offset: u32) -> (usize, usize) {
    let offset = (offset as usize).min(source.len());
    let before = &source[..offset];
    let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
    let col = before
        .rfind('\n')
        .map(|nl| offset - nl - 1)
        .unwrap_or(offset)
        + 1;
    (line, col)
}

/// Parse `file`, printing parse errors; exits nonzero if there are any.
fn parse_file(file: &Path, source: &str) -> tlisp_ast::Program {
    let (program, parse_errors) = tlisp_parser::parse(source);
    if !parse_errors.is_empty() {
        for error in &parse_errors {
            let (line, col) = line_col(source, error.span.start);
            eprintln!(
                "{}:{}:{}: parse error: {}",
                file.display(),
                line,
                col,
                error.message
            );
        }
        std::process::exit(1);
    }
    program
}

/// Check `program`, printing diagnostics; exits nonzero if there are any.
fn check_file(file: &Path, source: &str, program: &tlisp_ast::Program) -> tlisp_typeck::TypeCheckResult {
    let result = tlisp_typeck::check(program);
    if !result.is_ok() {
        for diagnostic in result.diagnostics() {
            let (line, col) = line_col(source, diagnostic.span.start);
            eprintln!(
                "{}:{}:{}: type error: {}",
                file.display(),
                line,
                col,
                diagnostic.message
            );
            if !diagnostic.hint.is_empty() {
                eprintln!("  hint: {}", diagnostic.hint);
            }
        }
        std::process::exit(1);
    }
    result
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { file } => {
            let source = read_file(&file);
            let program = parse_file(&file, &source);
            print!("{}", program.dump());
        }
        Command::Check { file } => {
            let source = read_file(&file);
            let program = parse_file(&file, &source);
            check_file(&file, &source, &program);
            println!("OK — no type errors");
        }
        Command::Emit { file } => {
            let source = read_file(&file);
            let program = parse_file(&file, &source);
            let result = check_file(&file, &source, &program);
            match tlisp_codegen::lower(&program, &result) {
                Ok(module) => print!("{}", module),
                Err(e) => {
                    eprintln!("{}: {}", file.display(), e);
                    std::process::exit(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_of_offsets() {
        let source = "(+ 1 2)\n(let x : int 5)\n";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 3), (1, 4));
        assert_eq!(line_col(source, 8), (2, 1));
        assert_eq!(line_col(source, 13), (2, 6));
    }

    #[test]
    fn line_col_clamps_past_end() {
        assert_eq!(line_col("ab", 99), (1, 3));
    }
}
