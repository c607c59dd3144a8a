//! cmm IR tools CLI.
//!
//! Provides the `cmm` binary with subcommands for working with decorated
//! cmm programs stored as JSON. `lower` translates a program to the
//! canonical three-address text form; `verify` lowers and then runs the
//! structural validator over the result.
//!
//! Both subcommands use the same `cmm_ir::lower_program` pipeline, so the
//! output seen here is exactly what library consumers get.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use cmm_core::ast::Program;
use cmm_ir::{lower_program, validate};

/// cmm IR lowering and tools.
#[derive(Parser)]
#[command(name = "cmm", about = "cmm IR lowering and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Lower a decorated program to three-address code.
    Lower {
        /// Path to the decorated program (JSON).
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Lower a program and run the structural validator on the result.
    Verify {
        /// Path to the decorated program (JSON).
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Lower { input, output } => run_lower(&input, output.as_deref()),
        Commands::Verify { input } => run_verify(&input),
    };
    process::exit(exit_code);
}

/// Execute the lower subcommand.
///
/// Returns exit code: 0 = success, 1 = lowering error, 3 = I/O or JSON error.
fn run_lower(input: &std::path::Path, output: Option<&std::path::Path>) -> i32 {
    let program = match load_program(input) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let ir = match lower_program(&program) {
        Ok(ir) => ir,
        Err(e) => {
            eprintln!("Lowering error: {}", e);
            return 1;
        }
    };

    let textual = ir.to_text();
    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, textual) {
                eprintln!("Error: failed to write '{}': {}", path.display(), e);
                return 3;
            }
        }
        None => print!("{}", textual),
    }
    0
}

/// Execute the verify subcommand.
///
/// Returns exit code: 0 = well-formed, 1 = lowering error,
/// 2 = validation findings, 3 = I/O or JSON error.
fn run_verify(input: &std::path::Path) -> i32 {
    let program = match load_program(input) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let ir = match lower_program(&program) {
        Ok(ir) => ir,
        Err(e) => {
            eprintln!("Lowering error: {}", e);
            return 1;
        }
    };

    let findings = validate(&ir);
    if findings.is_empty() {
        println!(
            "ok: {} instruction(s), {} variable(s)",
            ir.code.len(),
            ir.var_count()
        );
        0
    } else {
        eprintln!("Validation failed with {} finding(s):", findings.len());
        for finding in &findings {
            eprintln!("  - {}", finding);
        }
        2
    }
}

/// Load and deserialize a decorated program from a JSON file.
fn load_program(path: &std::path::Path) -> Result<Program, i32> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), e);
            return Err(3);
        }
    };
    match serde_json::from_str(&data) {
        Ok(program) => Ok(program),
        Err(e) => {
            eprintln!("Error: failed to parse '{}': {}", path.display(), e);
            Err(3)
        }
    }
}
