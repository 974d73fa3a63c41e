use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rlox::ast_printer::AstPrinter;
use rlox::interpreter::Interpreter;
use rlox::parser::{Parser, Stmt};
use rlox::resolver::Resolver;
use rlox::scanner::{self, Scanner};
use rlox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token list as JSON instead of the plain dump
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a Lox script, or starts the interactive prompt with no file
    Run { filename: Option<PathBuf> },
}

/// A script mapped into memory for the duration of one run.  Empty files
/// cannot be mapped, so they degrade to an empty slice.
struct Source {
    mmap: Option<Mmap>,
}

impl Source {
    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

fn load(filename: &Path) -> std::io::Result<Source> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename)?;
    let len = file.metadata()?.len();

    // SAFETY: read-only mapping, dropped at end of run; the script is not
    // expected to be mutated underneath us while it executes.
    let mmap = if len == 0 {
        None
    } else {
        Some(unsafe { Mmap::map(&file)? })
    };

    info!("Mapped {} bytes from {:?}", len, filename);

    Ok(Source { mmap })
}

/// Map a script path to UTF-8 source text, or exit 74 when the file cannot
/// be read or decoded.
fn load_source(filename: &Path) -> Source {
    match load(filename) {
        Ok(source) => source,

        Err(e) => {
            eprintln!("Error reading file {}: {}", filename.display(), e);
            process::exit(74);
        }
    }
}

fn source_str<'a>(source: &'a Source, filename: &Path) -> &'a str {
    match std::str::from_utf8(source.bytes()) {
        Ok(s) => s,

        Err(e) => {
            eprintln!("Error reading file {}: {}", filename.display(), e);
            process::exit(74);
        }
    }
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with the source line, stripping
    // the crate prefix from module paths.
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
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
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Drive the full pipeline over one program.  Returns the process exit code:
/// 0 on success, 65 for any lex/parse/resolve error (interpretation is
/// skipped entirely), 70 for a runtime error.
fn run_source(source: &str) -> i32 {
    let (tokens, lex_errors) = scanner::scan(source.as_bytes());
    for e in &lex_errors {
        eprintln!("{}", e);
    }

    let mut parser = Parser::new(&tokens);
    let (statements, parse_errors) = parser.parse();
    for e in &parse_errors {
        eprintln!("{}", e);
    }

    if !lex_errors.is_empty() || !parse_errors.is_empty() {
        return 65;
    }

    info!("Parsed {} statements", statements.len());

    let (locals, resolve_errors) = Resolver::new().resolve(&statements);
    for e in &resolve_errors {
        eprintln!("{}", e);
    }

    if !resolve_errors.is_empty() {
        return 65;
    }

    let mut interpreter = Interpreter::new();
    match interpreter.interpret(&statements, locals) {
        Ok(()) => {
            info!("Program executed successfully");
            0
        }

        Err(e) => {
            debug!("Runtime debug: {}", e);
            eprintln!("{}", e);
            70
        }
    }
}

/// Interactive prompt.  One interpreter lives for the whole session, so
/// globals and closures persist across lines; static errors only discard
/// the offending line.
fn run_prompt() -> Result<()> {
    let mut rl = DefaultEditor::new().context("Failed to initialize line editor")?;
    let mut interpreter: Interpreter<'static> = Interpreter::new();
    let mut next_id: u32 = 0;

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                // Closure values created on this line may outlive it, so the
                // line's source, token, and statement buffers are promoted to
                // the session lifetime.
                let source: &'static str = String::leak(line);

                let (tokens, lex_errors) = scanner::scan(source.as_bytes());
                for e in &lex_errors {
                    eprintln!("{}", e);
                }

                let tokens: &'static [Token<'static>] = Vec::leak(tokens);

                // Expression ids keep counting up across lines so the merged
                // distance table never collides.
                let mut parser = Parser::with_start_id(tokens, next_id);
                let (statements, parse_errors) = parser.parse();
                next_id = parser.next_id();

                for e in &parse_errors {
                    eprintln!("{}", e);
                }
                if !lex_errors.is_empty() || !parse_errors.is_empty() {
                    continue;
                }

                let statements: &'static [Stmt<'static>] = Vec::leak(statements);

                let (locals, resolve_errors) = Resolver::new().resolve(statements);
                for e in &resolve_errors {
                    eprintln!("{}", e);
                }
                if !resolve_errors.is_empty() {
                    continue;
                }

                if let Err(e) = interpreter.interpret(statements, locals) {
                    eprintln!("{}", e);
                }
            }

            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                break;
            }

            Err(e) => {
                return Err(e).context("Failed to read line");
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        // clap renders help/version through its error path too.
        Err(e) => {
            let _ = e.print();

            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => process::exit(0),
                _ => process::exit(64),
            }
        }
    };

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.command {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");

            let source = load_source(&filename);
            let src = source_str(&source, &filename);

            if json {
                let (tokens, errors) = scanner::scan(src.as_bytes());
                for e in &errors {
                    eprintln!("{}", e);
                }

                let dump = serde_json::to_string_pretty(&tokens)
                    .context("Failed to serialize tokens")?;
                println!("{}", dump);

                if !errors.is_empty() {
                    process::exit(65);
                }
            } else {
                let mut tokenized = true;

                for result in Scanner::new(src.as_bytes()) {
                    match result {
                        Ok(token) => {
                            debug!("Scanned token: {}", token);
                            println!("{}", token);
                        }

                        Err(e) => {
                            tokenized = false;
                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    debug!("Tokenization failed, exiting with code 65");
                    process::exit(65);
                }
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");

            let source = load_source(&filename);
            let src = source_str(&source, &filename);

            let (tokens, lex_errors) = scanner::scan(src.as_bytes());
            for e in &lex_errors {
                eprintln!("{}", e);
            }
            if !lex_errors.is_empty() {
                process::exit(65);
            }

            let mut parser = Parser::new(&tokens);
            match parser.parse_expression() {
                Ok(expr) => {
                    debug!("AST: {:?}", expr);
                    println!("{}", AstPrinter::print(&expr));
                }

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(65);
                }
            }
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");

            let source = load_source(&filename);
            let src = source_str(&source, &filename);

            let (tokens, lex_errors) = scanner::scan(src.as_bytes());
            for e in &lex_errors {
                eprintln!("{}", e);
            }
            if !lex_errors.is_empty() {
                process::exit(65);
            }

            let mut parser = Parser::new(&tokens);
            match parser.parse_expression() {
                Ok(expr) => {
                    let mut interpreter = Interpreter::new();

                    match interpreter.evaluate(&expr) {
                        Ok(value) => println!("{}", value),

                        Err(e) => {
                            eprintln!("{}", e);
                            process::exit(70);
                        }
                    }
                }

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(65);
                }
            }
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");

                let source = load_source(&filename);
                let src = source_str(&source, &filename);

                let code = run_source(src);
                if code != 0 {
                    process::exit(code);
                }
            }

            None => {
                run_prompt()?;
            }
        },
    }

    Ok(())
}
