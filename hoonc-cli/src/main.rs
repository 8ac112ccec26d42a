mod diagnostic;

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use hoonc_core::{CompileOptions, CoreError, Emit, emit};
use walkdir::WalkDir;

use crate::diagnostic::Diagnostic;

/// Compile a subset of Hoon into LLVM-flavoured IR.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, conflicts_with = "dir", help = "Source file (stdin when absent)")]
    input: Option<String>,

    #[arg(short, long, help = "Output file (stdout when absent)")]
    output: Option<String>,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "llvm",
        help = "Output format: tokens, ast, reduced, llvm"
    )]
    emit: String,

    #[arg(
        long,
        value_name = "BITS",
        default_value_t = 32,
        help = "Width of an atom: 8, 16, 32 or 64"
    )]
    atom_bits: u32,

    #[arg(long, value_name = "NAME", default_value = "main", help = "Entry function name")]
    entry: String,

    #[arg(
        long,
        value_name = "DIR",
        requires = "out_dir",
        help = "Compile every .hoon file under DIR"
    )]
    dir: Option<String>,

    #[arg(long, value_name = "DIR", help = "Where --dir writes its outputs")]
    out_dir: Option<String>,

    #[arg(short, long, help = "Report progress on stderr")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let format: Emit = cli.emit.parse()?;
    let options = CompileOptions {
        atom_bits: cli.atom_bits,
        entry: cli.entry.clone(),
    };
    options.atom_type()?;

    if let (Some(dir), Some(out_dir)) = (&cli.dir, &cli.out_dir) {
        return compile_tree(Path::new(dir), Path::new(out_dir), format, &options, cli.verbose);
    }

    let (name, source) = match &cli.input {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read input file {path}"))?;
            (path.clone(), source)
        }
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            ("<stdin>".to_string(), buffer)
        }
    };

    let text = compile_source(&name, &source, format, &options, cli.verbose)?;
    match &cli.output {
        Some(path) => {
            write_output(Path::new(path), text.as_bytes())?;
            if cli.verbose {
                eprintln!("hoonc: wrote {path}");
            }
        }
        None => io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}

/// Run the pipeline on one source, rendering positioned errors.
fn compile_source(
    name: &str,
    source: &str,
    format: Emit,
    options: &CompileOptions,
    verbose: bool,
) -> Result<String> {
    if verbose {
        eprintln!("hoonc: compiling {name} ({format:?}, i{})", options.atom_bits);
    }
    emit(source, format, options).map_err(|err| {
        report(name, source, &err);
        anyhow::Error::new(err).context(format!("failed to compile {name}"))
    })
}

fn report(name: &str, source: &str, err: &CoreError) {
    if let Some(diag) = Diagnostic::from_error(err) {
        if diag.render(name, source).is_err() {
            eprintln!("{}", diag.headline(name, source));
        }
    }
}

/// Compile every `*.hoon` under `root`, mirroring the tree into `out_dir`.
/// Every file is attempted; the run fails if any of them did.
fn compile_tree(
    root: &Path,
    out_dir: &Path,
    format: Emit,
    options: &CompileOptions,
    verbose: bool,
) -> Result<()> {
    let mut compiled = 0usize;
    let mut failed = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        let path = entry.path();
        let is_hoon = path.extension().and_then(|ext| ext.to_str()) == Some("hoon");
        if !entry.file_type().is_file() || !is_hoon {
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
        let name = path.display().to_string();
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {name}"))?;

        match compile_source(&name, &source, format, options, verbose) {
            Ok(text) => {
                let target = out_dir.join(relative).with_extension(extension(format));
                write_output(&target, text.as_bytes())?;
                if verbose {
                    eprintln!("hoonc: wrote {}", target.display());
                }
                compiled += 1;
            }
            Err(err) => {
                eprintln!("error: {err:#}");
                failed.push(name);
            }
        }
    }

    if verbose {
        eprintln!("hoonc: {compiled} compiled, {} failed", failed.len());
    }
    if !failed.is_empty() {
        bail!("{} of {} files failed to compile", failed.len(), compiled + failed.len());
    }
    Ok(())
}

fn extension(format: Emit) -> &'static str {
    match format {
        Emit::Tokens => "tokens",
        Emit::Ast => "ast",
        Emit::Reduced => "reduced",
        Emit::Llvm => "ll",
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}
