//! GLSLC - semantic checker for GLSL ES 3.00 shaders
//!
//! Usage: glslc [OPTIONS] <inputs>...

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use glsl_compiler::common::DiagnosticReporter;
use glsl_compiler::driver::check_with_config;
use glsl_compiler::frontend::{CheckConfig, Stage};

/// Shader stage
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
enum StageArg {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
    /// Stage-independent rules only
    None,
    /// Detect from file extension (.vert, .frag)
    #[default]
    Auto,
}

#[derive(ClapParser, Debug)]
#[command(name = "glslc")]
#[command(author = "GLSLC Team")]
#[command(version)]
#[command(about = "Semantic checker for GLSL ES 3.00 shaders", long_about = None)]
struct Args {
    /// Shader source files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Shader stage (vertex, fragment, none or auto)
    #[arg(short, long, value_enum, default_value = "auto")]
    stage: StageArg,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump the annotated AST (for debugging)
    #[arg(long)]
    dump_ast: bool,
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(2);
        }
    }
}

fn resolve_stage(path: &Path, explicit: StageArg) -> Stage {
    match explicit {
        StageArg::Vertex => Stage::Vertex,
        StageArg::Fragment => Stage::Fragment,
        StageArg::None => Stage::None,
        StageArg::Auto => {
            let stage = path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(Stage::None, Stage::from_extension);
            if stage == Stage::None {
                eprintln!(
                    "warning: cannot detect stage of {}, checking stage-independent rules only",
                    path.display()
                );
            }
            stage
        }
    }
}

/// Check every input; `Ok(false)` if any had diagnostics
fn run(args: &Args) -> Result<bool> {
    let mut clean = true;
    for input in &args.inputs {
        let config = CheckConfig {
            stage: resolve_stage(input, args.stage),
            dump_ast: args.dump_ast,
            verbose: args.verbose,
        };
        clean &= check_file(input, &config)?;
    }
    Ok(clean)
}

fn check_file(path: &Path, config: &CheckConfig) -> Result<bool> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let filename = path.display().to_string();

    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(&filename, &source);

    if config.verbose {
        eprintln!("Checking {} ({} stage)...", filename, config.stage.name());
    }

    let output = match check_with_config(&source, config) {
        Ok(output) => output,
        Err(e) => {
            reporter.report_error(file_id, &e).context("cannot render error")?;
            return Ok(false);
        }
    };

    if config.dump_ast {
        eprintln!("=== AST ===");
        eprintln!("{:#?}", output.unit);
        eprintln!("=== End AST ===\n");
    }

    for diagnostic in &output.diagnostics {
        reporter
            .report_diagnostic(file_id, diagnostic)
            .context("cannot render diagnostic")?;
    }

    if config.verbose {
        eprintln!("{}: {} diagnostic(s)", filename, output.diagnostics.len());
    }

    Ok(output.is_clean())
}
