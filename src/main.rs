use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use tlox::ast_printer;
use tlox::error::LoxError;
use tlox::interpreter::Interpreter;
use tlox::parser::Parser;
use tlox::resolver::Resolver;
use tlox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to tlox.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Emit the token stream as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints the AST in prefix form
    Parse { filename: Option<PathBuf> },

    /// Runs input from a file as a program
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("tlox.log").context("Failed to create tlox.log")?;

    // Log lines carry the in-crate module path and source line.
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("tlox::")
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

    info!("Logger initialized, writing to tlox.log");
    Ok(())
}

/// Report static-stage errors and exit 65.
fn report_static_errors(errors: &[LoxError]) -> ! {
    for e in errors {
        debug!("Static error: {}", e);
        eprintln!("{}", e);
    }

    std::process::exit(65);
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => match filename {
            Some(filename) => {
                info!("Running Tokenize subcommand");
                let source = read_file(filename)?;
                let (tokens, errors) = Scanner::new(&source).scan_tokens();

                for e in &errors {
                    debug!("Tokenization debug: {}", e);
                    eprintln!("{}", e);
                }

                if json {
                    let rendered = serde_json::to_string_pretty(&tokens)
                        .context("Failed to serialize tokens")?;
                    println!("{}", rendered);
                } else {
                    for token in &tokens {
                        debug!("Scanned token: {}", token);
                        println!("{}", token);
                    }
                }

                if !errors.is_empty() {
                    debug!("Tokenization failed, exiting with code 65");
                    std::process::exit(65);
                }

                info!("Tokenization completed successfully");
            }
            None => {
                info!("No filepath provided for Tokenize");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");
                let source = read_file(filename)?;

                let (tokens, mut errors) = Scanner::new(&source).scan_tokens();
                let (statements, parse_errors) = Parser::new(tokens).parse();
                errors.extend(parse_errors);

                if !errors.is_empty() {
                    report_static_errors(&errors);
                }

                let ast_str = ast_printer::print_program(&statements);
                debug!("AST: {}", ast_str);
                print!("{}", ast_str);

                info!("Parse subcommand completed");
            }
            None => {
                info!("No filepath provided for Parse");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let source = read_file(filename)?;
                info!("Provided input:\n {}", source);

                let (tokens, mut errors) = Scanner::new(&source).scan_tokens();
                let (statements, parse_errors) = Parser::new(tokens).parse();
                errors.extend(parse_errors);

                let (locals, resolve_errors) = Resolver::new().resolve(&statements);
                errors.extend(resolve_errors);

                if !errors.is_empty() {
                    report_static_errors(&errors);
                }

                info!("Front end clean: {} statement(s)", statements.len());

                let mut interpreter = Interpreter::new();

                match interpreter.interpret(&statements, locals) {
                    Ok(()) => {
                        info!("Program executed successfully");
                    }

                    Err(e) => {
                        debug!("Runtime debug: {}", e);
                        eprintln!("{}", e);

                        if let LoxError::Runtime { trace, .. } = &e {
                            for frame in trace {
                                eprintln!("  in {}", frame);
                            }
                        }

                        std::process::exit(70);
                    }
                }
            }

            None => {
                info!("No filepath provided for Run");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },
    }

    Ok(())
}
