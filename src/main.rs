mod frontend;

use std::{env, fs, path::Path, thread};

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use turtle_logo::{
    Completion, Interpreter, InterpreterConfig, KEYWORDS, Lexer, Recorder, parse,
};

use crate::frontend::token_dumper::TokenDumper;

#[derive(Debug, Default)]
struct Options {
    tokens: bool,
    no_color: bool,
    ast: bool,
    json: bool,
    verbose: bool,
    speed: Option<u8>,
    filename: Option<String>,
}

fn main() -> Result<()> {
    let options = parse_args(env::args().skip(1))?;
    init_tracing(options.verbose);

    let Some(filename) = options.filename.as_deref() else {
        print_usage();
        return Ok(());
    };
    ensure_extension(filename)?;
    let source =
        fs::read_to_string(filename).with_context(|| format!("Failed to read '{filename}'"))?;

    if options.tokens {
        let mut dumper = TokenDumper::new();
        if options.no_color {
            dumper = dumper.no_color();
        }
        dumper.dump(&mut Lexer::new(&source, KEYWORDS.iter().copied()));
        return Ok(());
    }

    let program = parse(&source).context("Parse error")?;
    if options.ast {
        print!("{program}");
        return Ok(());
    }

    let config = InterpreterConfig {
        speed: options.speed.unwrap_or(InterpreterConfig::default().speed),
        ..InterpreterConfig::default()
    };
    let mut interpreter = Interpreter::with_config(Recorder::new(), config);

    debug!(file = filename, "starting worker");
    let worker = thread::spawn(move || {
        let outcome = interpreter.run(&program);
        (outcome, interpreter.into_turtle())
    });
    let (outcome, turtle) = worker
        .join()
        .map_err(|_| anyhow!("interpreter thread panicked"))?;
    let completion = outcome.context("Runtime error")?;

    let commands = turtle.into_commands();
    if options.json {
        println!("{}", serde_json::to_string_pretty(&commands)?);
    } else {
        for command in &commands {
            println!("{command}");
        }
    }
    if completion == Completion::Stopped {
        eprintln!("stopped before the end of the program");
    }
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tokens" => options.tokens = true,
            "--no-color" => options.no_color = true,
            "--ast" => options.ast = true,
            "--json" => options.json = true,
            "--verbose" | "-v" => options.verbose = true,
            "--speed" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing value after {arg}"))?;
                let speed: u8 = value
                    .parse()
                    .with_context(|| format!("Invalid speed '{value}'"))?;
                if speed > 100 {
                    bail!("Speed must be between 0 and 100, got {speed}");
                }
                options.speed = Some(speed);
            }
            "--help" | "-h" => {
                options.filename = None;
                return Ok(options);
            }
            flag if flag.starts_with('-') => bail!("Unknown option '{flag}'"),
            _ => {
                if options.filename.replace(arg).is_some() {
                    bail!("Only one input file is supported");
                }
            }
        }
    }
    Ok(options)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn ensure_extension(filename: &str) -> Result<()> {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("logo") {
        bail!("expected a .logo file, got {filename}");
    }
    Ok(())
}

fn print_usage() {
    println!("TURTLE - turtle graphics interpreter");
    println!();
    println!("Usage:");
    println!("  turtle <file.logo>              Run a program and print what it draws");
    println!("  turtle --json <file.logo>       Print the drawing as JSON");
    println!("  turtle --speed N <file.logo>    Drawing speed 0-100 (default 100)");
    println!("  turtle --tokens <file.logo>     Show tokens only (--no-color for plain)");
    println!("  turtle --ast <file.logo>        Show the parse tree");
    println!("  turtle --verbose <file.logo>    Log run progress to stderr");
    println!("  turtle --help, -h               Show this help");
}
