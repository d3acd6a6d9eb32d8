use clap::Parser;
use serde::Serialize;
use slash_lang::eval::Interpreter;
use slash_lang::{lex, parse, repl};
use std::io::{IsTerminal, Read};

#[derive(Serialize)]
struct JsonResult {
    #[serde(rename = "exitCode")]
    exit_code: i32,
}

/// Slash — an interactive shell/scripting language.
#[derive(Parser)]
#[command(name = "slash")]
#[command(about = "Slash: a shell/scripting language interpreter")]
#[command(version)]
struct Cli {
    /// Execute the given source instead of reading a file or starting a REPL.
    #[arg(short = 'c')]
    command: Option<String>,

    /// Emit GC activity as structured trace events (RUST_LOG=slash_lang=debug).
    #[arg(long = "trace-gc")]
    trace_gc: bool,

    /// Emit the one-shot run's result as JSON instead of printing directly.
    #[arg(long = "json")]
    json: bool,

    /// Script file to execute, followed by its positional arguments.
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.trace_gc { "slash_lang=debug" } else { "off" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .try_init();

    let code = run(cli);
    std::process::exit(code);
}

fn run(cli: Cli) -> i32 {
    if let Some(source) = cli.command {
        let mut interp = Interpreter::new(&["-c".to_string()]);
        interp.trace_gc = cli.trace_gc;
        return run_source(&mut interp, &source, cli.json);
    }

    if let Some(path) = cli.args.first() {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[Slash]: cannot read '{path}': {e}");
                return 1;
            }
        };
        let mut interp = Interpreter::new(&cli.args);
        interp.trace_gc = cli.trace_gc;
        return run_source(&mut interp, &source, cli.json);
    }

    if std::io::stdin().is_terminal() {
        let mut interp = Interpreter::new(&["repl".to_string()]);
        interp.trace_gc = cli.trace_gc;
        return repl::run(&mut interp);
    }

    let mut source = String::new();
    if std::io::stdin().read_to_string(&mut source).is_err() {
        eprintln!("[Slash]: failed to read script from stdin");
        return 1;
    }
    let mut interp = Interpreter::new(&["-".to_string()]);
    interp.trace_gc = cli.trace_gc;
    run_source(&mut interp, &source, cli.json)
}

fn run_source(interp: &mut Interpreter, source: &str, json: bool) -> i32 {
    let lexed = lex(source);
    if lexed.had_error {
        for err in &lexed.errors {
            eprintln!("{err}");
        }
        if json {
            println!("{}", serde_json::to_string(&JsonResult { exit_code: 1 }).unwrap());
        }
        return 1;
    }
    let parsed = parse(lexed.tokens);

    if !parsed.errors.is_empty() {
        for err in &parsed.errors {
            eprintln!("[Slash Parse Error, line {}]: {}", err.line, err.message);
        }
        if json {
            println!("{}", serde_json::to_string(&JsonResult { exit_code: 1 }).unwrap());
        }
        return 1;
    }

    let code = interp.run(&parsed.statements);
    if json {
        println!("{}", serde_json::to_string(&JsonResult { exit_code: code }).unwrap());
    }
    code
}
