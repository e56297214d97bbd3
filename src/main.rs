use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use clap::ValueEnum;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast::ExprIdGen;
use rox::ast_printer::AstPrinter;
use rox::parser::Parser;
use rox::runner::Lox;
use rox::scanner::{self, Scanner};

const PROMPT: &str = ">> ";

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox: a tree-walking interpreter for Lox", long_about = None)]
pub struct Cli {
    /// Script to run; starts an interactive prompt when omitted
    script: Option<PathBuf>,

    /// Print an intermediate form of the script instead of running it
    #[arg(long, value_enum, requires = "script")]
    emit: Option<Emit>,

    /// Write a debug log to FILE (default: rox.log)
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "rox.log"
    )]
    log: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Emit {
    /// One scanned token per line
    Tokens,

    /// Scanned tokens as a JSON array
    TokensJson,

    /// The script parsed as a single expression, in prefix form
    Ast,
}

/// Reads a whole source file through a read-only memory map.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // zero-length files cannot be mapped
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the mapping is read-only and copied out before it is dropped.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    let source = std::str::from_utf8(&map)
        .context(format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        // Initialize a minimal logger to avoid "no logger" errors
        Builder::new().filter_level(log::LevelFilter::Off).init();
        return Ok(());
    };

    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // RUST_LOG overrides
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

/// File mode: one run; a failure ends the process with its exit code.
fn run_file(path: &Path) -> Result<()> {
    let source = read_file(path)?;
    let mut lox = Lox::new();

    if let Err(e) = lox.run(&source) {
        debug!("Run failed: {:?}", e);
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }

    info!("Program executed successfully");
    Ok(())
}

/// Interactive mode: each line runs against the same session. Errors are
/// reported and the prompt continues, except for internal faults.
fn run_prompt() -> Result<()> {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!("\nExiting..");
            return Ok(());
        }

        match lox.run(&line) {
            Ok(()) => {}
            Err(e) if e.is_internal() => return Err(e.into()),
            Err(e) => eprintln!("{}", e),
        }
    }
}

fn emit(kind: Emit, path: &Path) -> Result<()> {
    let source = read_file(path)?;

    match kind {
        Emit::Tokens => {
            let mut tokenized = true;

            for token in Scanner::new(source.as_bytes()) {
                match token {
                    Ok(token) => println!("{}", token),
                    Err(e) => {
                        tokenized = false;
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                std::process::exit(65);
            }
        }

        Emit::TokensJson => match scanner::scan(&source) {
            Ok(tokens) => println!("{}", serde_json::to_string_pretty(&tokens)?),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(e.exit_code());
            }
        },

        Emit::Ast => {
            let parsed = scanner::scan(&source).and_then(|tokens| {
                let mut ids = ExprIdGen::default();
                Parser::new(&tokens, &mut ids).parse_expression()
            });

            match parsed {
                Ok(expr) => println!("{}", AstPrinter::print(&expr)),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(e.exit_code());
                }
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    init_logger(args.log.as_deref())?;

    info!("CLI arguments: {:?}", args);

    match (args.emit, args.script.as_deref()) {
        (Some(kind), Some(path)) => emit(kind, path),
        (None, Some(path)) => run_file(path),
        (None, None) => run_prompt(),
        (Some(_), None) => bail!("--emit needs a script"),
    }
}
