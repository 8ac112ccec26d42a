use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use crate::ast::Node;
use crate::codegen_llvm::generate_llvm_ir;
use crate::error::CoreError;
use crate::ir::Ty;
use crate::lexer::lex;
use crate::parser::parse;
use crate::printer::print;
use crate::reduce::reduce;

/// Atom widths the generator can target.
pub const SUPPORTED_ATOM_BITS: &[u32] = &[8, 16, 32, 64];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub atom_bits: u32,
    pub entry: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            atom_bits: 32,
            entry: "main".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn atom_type(&self) -> Result<Ty, CoreError> {
        if SUPPORTED_ATOM_BITS.contains(&self.atom_bits) {
            Ok(Ty::Int(self.atom_bits))
        } else {
            Err(CoreError::UnsupportedAtomWidth(self.atom_bits))
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CompilationArtifact {
    pub ir: String,
    pub canonical: Node,
    pub functions: usize,
}

/// What a pipeline run should stop at and print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    Tokens,
    Ast,
    Reduced,
    Llvm,
}

impl FromStr for Emit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tokens" => Ok(Emit::Tokens),
            "ast" => Ok(Emit::Ast),
            "reduced" => Ok(Emit::Reduced),
            "llvm" | "ll" => Ok(Emit::Llvm),
            other => Err(CoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Compile with default options and return the IR text.
pub fn compile(source: &str) -> Result<String, CoreError> {
    compile_with(source, &CompileOptions::default()).map(|artifact| artifact.ir)
}

pub fn compile_with(
    source: &str,
    options: &CompileOptions,
) -> Result<CompilationArtifact, CoreError> {
    let atom = options.atom_type()?;
    let canonical = reduce(parse(source)?)?;
    let module = generate_llvm_ir(&canonical, atom, &options.entry)?;
    let ir = module.render()?;
    Ok(CompilationArtifact {
        ir,
        canonical,
        functions: module.functions.len(),
    })
}

pub fn compile_file(
    path: impl AsRef<Path>,
    options: &CompileOptions,
) -> Result<CompilationArtifact, CoreError> {
    let source = std::fs::read_to_string(path)?;
    compile_with(&source, options)
}

/// Run the pipeline up to `emit` and render that stage's output.
pub fn emit(source: &str, emit: Emit, options: &CompileOptions) -> Result<String, CoreError> {
    match emit {
        Emit::Tokens => {
            let mut out = String::new();
            for token in lex(source) {
                let start = token.span.start;
                let end = token.span.end;
                if token.text.is_empty() {
                    let _ = writeln!(out, "{start}..{end} {}", token.kind);
                } else {
                    let _ = writeln!(out, "{start}..{end} {} {:?}", token.kind, token.text);
                }
            }
            Ok(out)
        }
        Emit::Ast => Ok(format!("{}\n", print(&parse(source)?))),
        Emit::Reduced => Ok(format!("{}\n", print(&reduce(parse(source)?)?))),
        Emit::Llvm => compile_with(source, options).map(|artifact| artifact.ir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn compiles_constant() {
        let ir = compile("1").expect("compile should succeed");
        assert_eq!(ir, "define i32 @main() {\n0:\n\tret i32 1\n}\n");
    }

    #[test]
    fn compiles_binding() {
        let ir = compile("=/  n  1\nn\n").expect("compile should succeed");
        assert_eq!(ir, "define i32 @main() {\n0:\n\tret i32 1\n}\n");
    }

    #[test]
    fn compiles_builtin_add() {
        let ir = compile("=/  a  2\n=/  b  a\n(add a b)\n").expect("compile should succeed");
        assert_eq!(
            ir,
            "define i32 @main() {\n0:\n\t%1 = add i32 2, 2\n\tret i32 %1\n}\n"
        );
    }

    #[test]
    fn compiles_conditional_after_rebinding() {
        let source = "=/  a  2\n=/  b  7\n=.  a  8\n?:  =(a +(b))\n  a\nb\n";
        let expected = "\
define i32 @main() {
0:
\t%1 = add i32 7, 1
\t%2 = icmp eq i32 8, %1
\tbr i1 %2, label %3, label %4

3:
\tret i32 8

4:
\tret i32 7
}
";
        assert_eq!(compile(source).expect("compile should succeed"), expected);
    }

    #[test]
    fn compiles_accumulator_loop() {
        let source = "\
=/  n    1
=/  acc  1
|-
?:  =(n 6)
  acc
$(acc (mul acc n), n +(n))
";
        let expected = "\
define i32 @main() {
0:
\t%1 = call i32 @0(i32 1, i32 1)
\tret i32 %1
}

define private i32 @0(i32 %acc, i32 %n) {
0:
\t%1 = icmp eq i32 %n, 6
\tbr i1 %1, label %2, label %3

2:
\tret i32 %acc

3:
\t%4 = mul i32 %acc, %n
\t%5 = add i32 %n, 1
\t%6 = call i32 @0(i32 %4, i32 %5)
\tret i32 %6
}
";
        assert_eq!(compile(source).expect("compile should succeed"), expected);
    }

    #[test]
    fn compiles_recursive_factorial() {
        let source = "\
=/  n  5
|-
?:  =(n 0)
  1
(mul n $(n (dec n)))
";
        let expected = "\
define i32 @main() {
0:
\t%1 = call i32 @0(i32 5)
\tret i32 %1
}

define private i32 @0(i32 %n) {
0:
\t%1 = icmp eq i32 %n, 0
\tbr i1 %1, label %2, label %3

2:
\tret i32 1

3:
\t%4 = sub i32 %n, 1
\t%5 = call i32 @0(i32 %4)
\t%6 = mul i32 %n, %5
\tret i32 %6
}
";
        assert_eq!(compile(source).expect("compile should succeed"), expected);
    }

    #[test]
    fn captures_in_sorted_order_regardless_of_binding_order() {
        let source = "=/  b  2\n=/  a  1\n|-\n?:  =(a b)\n  a\n$(a +(a))\n";
        let ir = compile(source).expect("compile should succeed");
        assert!(ir.contains("%1 = call i32 @0(i32 1, i32 2)"), "{ir}");
        assert!(ir.contains("define private i32 @0(i32 %a, i32 %b)"), "{ir}");
        assert!(ir.contains("call i32 @0(i32 %4, i32 %b)"), "{ir}");
    }

    #[test]
    fn compiles_gate_call_with_defaulted_captures() {
        let source = "=/  k  3\n=/  f  |=(a=@ (add a k))\n(f 4)\n";
        let expected = "\
define i32 @main() {
0:
\t%1 = call i32 @0(i32 3, i32 4)
\tret i32 %1
}

define private i32 @0(i32 %k, i32 %a) {
0:
\t%1 = add i32 %a, %k
\tret i32 %1
}
";
        assert_eq!(compile(source).expect("compile should succeed"), expected);
    }

    #[test]
    fn compiles_batch_rebinding_without_passing_parked_values() {
        let source = "=/  a  1\n=/  b  2\n=:  a  b\n    b  a\n  ==\n|-\n(sub a b)\n";
        let ir = compile(source).expect("compile should succeed");
        assert!(ir.contains("define private i32 @0(i32 %a, i32 %b)"), "{ir}");
        assert!(ir.contains("call i32 @0(i32 2, i32 1)"), "{ir}");
        assert!(!ir.contains("^"), "{ir}");
    }

    #[test]
    fn compiles_conditional_rebinding() {
        let source = "=/  a  1\n=?  a  =(a 1)  2\na\n";
        let expected = "\
define i32 @main() {
0:
\t%1 = icmp eq i32 1, 1
\tbr i1 %1, label %2, label %3

2:
\tret i32 2

3:
\tret i32 1
}
";
        assert_eq!(compile(source).expect("compile should succeed"), expected);
    }

    #[test]
    fn honours_atom_width_and_entry_name() {
        let options = CompileOptions {
            atom_bits: 64,
            entry: "start".to_string(),
        };
        let artifact = compile_with("(add 1 2)", &options).expect("compile should succeed");
        assert_eq!(
            artifact.ir,
            "define i64 @start() {\n0:\n\t%1 = add i64 1, 2\n\tret i64 %1\n}\n"
        );
        assert_eq!(artifact.functions, 1);
    }

    #[test]
    fn artifact_carries_canonical_tree() {
        let artifact = compile_with("=+(a=1 :_(a 2))", &CompileOptions::default());
        // Cells are not atoms, so lowering fails, but reduction succeeded first.
        assert!(matches!(artifact, Err(CoreError::CodegenError { .. })));

        let artifact =
            compile_with("=+(a=1 .+(a))", &CompileOptions::default()).expect("compile");
        assert_eq!(print(&artifact.canonical), "=/(a 1 .+(a))");
    }

    #[test]
    fn rejects_unsupported_atom_width() {
        let options = CompileOptions {
            atom_bits: 12,
            ..CompileOptions::default()
        };
        let err = compile_with("1", &options).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedAtomWidth(12)));
    }

    #[test]
    fn unknown_rune_produces_no_ir() {
        let err = compile("=/  n  1\n  ?:(=(n 1) n !!)").unwrap_err();
        assert!(matches!(err, CoreError::UnknownRune { .. }));
        assert_eq!(err.span(), Some(Span::new(23, 25)));
    }

    #[test]
    fn parses_emit_modes() {
        assert_eq!("tokens".parse::<Emit>().unwrap(), Emit::Tokens);
        assert_eq!("ast".parse::<Emit>().unwrap(), Emit::Ast);
        assert_eq!("reduced".parse::<Emit>().unwrap(), Emit::Reduced);
        assert_eq!("llvm".parse::<Emit>().unwrap(), Emit::Llvm);
        let err = "wasm".parse::<Emit>().unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFormat(ref f) if f == "wasm"));
    }

    #[test]
    fn emits_each_stage() {
        let options = CompileOptions::default();
        let tokens = emit("=(a +(b))", Emit::Tokens, &options).expect("tokens");
        assert!(tokens.starts_with("0..1 = \"=\"\n1..2 ( \"(\"\n"), "{tokens}");
        assert!(tokens.ends_with("9..9 EOF\n"), "{tokens}");

        let ast = emit("[1 2 3]", Emit::Ast, &options).expect("ast");
        assert_eq!(ast, "[1 [2 3]]\n");

        let reduced = emit(":*(1 2 3)", Emit::Reduced, &options).expect("reduced");
        assert_eq!(reduced, "[1 [2 3]]\n");

        let llvm = emit("1", Emit::Llvm, &options).expect("llvm");
        assert!(llvm.contains("ret i32 1"));
    }

    #[test]
    fn compiles_files_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fac.hoon");
        std::fs::write(&path, "=/  n  5\n|-\n?:  =(n 0)\n  1\n(mul n $(n (dec n)))\n")
            .expect("write source");
        let artifact = compile_file(&path, &CompileOptions::default()).expect("compile");
        assert_eq!(artifact.functions, 2);

        let err = compile_file(dir.path().join("missing.hoon"), &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::SourceIo(_)));
    }
}
