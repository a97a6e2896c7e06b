use std::{io::Write, path::Path};

use fox::{
    ast::{printer::AstPrinter, ExprVisitor},
    cmdline::CommandLineOptions,
    errors,
    interpreter::{Interpreter, Value},
    FoxError,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXIT_STATIC_ERROR: i32 = 65;
const EXIT_NO_INPUT: i32 = 66;
const EXIT_RUNTIME_ERROR: i32 = 70;

fn main() {
    let opts = CommandLineOptions::parse();
    init_tracing(&opts);

    let interpreter = Interpreter::default().with_config(opts.config());

    let code = match &opts.file {
        Some(file) => run_file(file, interpreter, opts.debug),
        None => match run_prompt(interpreter, opts.debug) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{}", e);
                1
            },
        },
    };

    std::process::exit(code);
}

/// Logs go to stderr; `RUST_LOG` wins over the level implied by `--debug`.
fn init_tracing(opts: &CommandLineOptions) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(opts.default_log_filter()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn read_source(filename: &str) -> Result<String, FoxError> {
    let content = std::fs::read(filename)?;
    String::from_utf8(content).map_err(|_e| errors::system(
        "The file you provided is not a valid UTF-8 file.",
        "Make sure that the file is a valid UTF-8 file.",
    ))
}

fn run_file(filename: &str, interpreter: Interpreter, debug: bool) -> i32 {
    let content = match read_source(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_NO_INPUT;
        },
    };

    let base_dir = Path::new(filename).parent().map(Path::to_path_buf).unwrap_or_default();
    let mut interpreter = interpreter.with_base_dir(base_dir);

    match run(&content, &mut interpreter, debug) {
        Ok(_) => 0,
        Err(errs) => {
            report(&errs);
            if errs.iter().any(|e| e.is_static()) {
                EXIT_STATIC_ERROR
            } else {
                EXIT_RUNTIME_ERROR
            }
        },
    }
}

fn run_prompt(interpreter: Interpreter, debug: bool) -> Result<(), FoxError> {
    let mut interpreter = interpreter;
    let mut buffer = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        buffer.clear();
        if std::io::stdin().read_line(&mut buffer)? == 0 {
            break;
        }

        let line = buffer.trim();
        if line == "exit" {
            break;
        }

        if line.is_empty() {
            continue;
        }

        match run(line, &mut interpreter, debug) {
            Ok(value) => println!("{} ===> {}", line, value),
            Err(errs) => report(&errs),
        }
    }

    Ok(())
}

fn run(source: &str, interpreter: &mut Interpreter, debug: bool) -> Result<Value, Vec<FoxError>> {
    let forest = interpreter.compile(source)?;

    if debug {
        for expr in forest.iter() {
            eprintln!("{}", AstPrinter {}.visit_expr(expr));
        }
    }

    interpreter.interpret(&forest).map_err(|e| vec![e])
}

fn report(errs: &[FoxError]) {
    for err in errs {
        eprintln!("{}", err);
    }
}
