use clap::{Arg, ArgAction, Command};
use monkey::error::RunError;
use monkey::evaluator::EvalConfig;
use monkey::repl::{self, Mode};
use monkey::{runner, Value};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    init_tracing();

    let matches = Command::new("monkey")
        .about("A tree-walking interpreter for the Monkey language")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("echo")
                .long("echo")
                .help("Print the parsed program instead of evaluating it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Maximum depth of nested function calls")
                .value_parser(clap::value_parser!(usize)),
        )
        .get_matches();

    let config = EvalConfig {
        max_call_depth: matches
            .get_one::<usize>("max-depth")
            .copied()
            .unwrap_or(EvalConfig::DEFAULT_MAX_CALL_DEPTH),
    };
    let mode = if matches.get_flag("echo") {
        Mode::Echo
    } else {
        Mode::Evaluate
    };

    match matches.get_one::<String>("file") {
        Some(file_path) if !matches.get_flag("interactive") => match run_file(file_path, mode, config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                tracing::debug!(%error, "script failed");
                if let RunError::Io { .. } = error {
                    eprintln!("Error: {}", error);
                }
                ExitCode::FAILURE
            }
        },
        _ => {
            repl::start(mode, config);
            ExitCode::SUCCESS
        }
    }
}

fn run_file(path: &str, mode: Mode, config: EvalConfig) -> Result<(), RunError> {
    let path = Path::new(path);
    let source = fs::read_to_string(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path.to_string_lossy().into_owned();

    if mode == Mode::Echo {
        let (program, errors) = monkey::parser::parse(&source);
        for error in &errors {
            error.report(&source, Some(filename.as_str()));
        }
        if !errors.is_empty() {
            return Err(RunError::Syntax(errors.len()));
        }
        println!("{}", program);
        return Ok(());
    }

    match runner::run(&source, Some(filename.as_str()), config)? {
        Value::Null => {}
        value => println!("{}", value.render()),
    }
    Ok(())
}

/// Logging is off unless `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
