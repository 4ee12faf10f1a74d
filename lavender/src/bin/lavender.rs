//! Lavender command-line interface.
//!
//! Usage:
//!   lavender                 # interactive REPL
//!   lavender file.lv args    # parse a main file, forwarding args

use std::fs;
use std::process::ExitCode;

use lavender::repl::ReplSession;
use lavender::session::Session;
use tracing::debug;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default)]
struct Config {
    filepath: String,
    debug: bool,
    dump_tokens: bool,
    bare: bool,
    stack_size: Option<usize>,
    native_stack_size: Option<usize>,
    main_file: Option<String>,
    /// Arguments after the main file, forwarded to the program. The
    /// front-end has no evaluator to hand them to; they are accepted
    /// for CLI compatibility.
    forwarded: Vec<String>,
}

/// Parse a size with a 1024-based `K`, `M`, or `G` suffix.
fn size_argument(arg: &str) -> Result<usize, String> {
    let (digits, suffix) = arg.split_at(arg.len().saturating_sub(1));
    let multiplier: usize = match suffix {
        "K" => 1024,
        "M" => 1024 * 1024,
        "G" => 1024 * 1024 * 1024,
        _ => {
            return Err(format!(
                "Argument {} must be a nonnegative integer with suffix K, M, or G",
                arg
            ))
        }
    };
    digits
        .parse::<usize>()
        .map(|n| n * multiplier)
        .map_err(|_| {
            format!(
                "Argument {} must be a nonnegative integer with suffix K, M, or G",
                arg
            )
        })
}

fn parse_args(args: &[String]) -> Result<Option<Config>, String> {
    let mut config = Config {
        filepath: ".".to_string(),
        ..Config::default()
    };
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if config.main_file.is_some() {
            config.forwarded.push(arg.clone());
        } else if arg == "-v" || arg == "--version" {
            println!("Lavender front-end version {}", VERSION);
            return Ok(None);
        } else if arg == "-fp" || arg == "--filepath" {
            i += 1;
            match args.get(i) {
                Some(path) => config.filepath = path.clone(),
                None => return Err("--filepath takes one argument".to_string()),
            }
        } else if arg == "--debug" {
            config.debug = true;
        } else if arg == "--dump-tokens" {
            config.dump_tokens = true;
        } else if arg == "--bare" {
            config.bare = true;
        } else if arg == "-ss" || arg == "--stack-size" {
            i += 1;
            match args.get(i) {
                Some(size) => config.stack_size = Some(size_argument(size)?),
                None => return Err("--stack-size takes one argument".to_string()),
            }
        } else if arg == "-nss" || arg == "--native-stack-size" {
            i += 1;
            match args.get(i) {
                Some(size) => config.native_stack_size = Some(size_argument(size)?),
                None => {
                    return Err("--native-stack-size takes one argument".to_string())
                }
            }
        } else if arg == "-?" || arg == "--help" {
            print_usage();
            return Ok(None);
        } else if arg.starts_with('-') {
            return Err(format!("Argument {} not recognized", arg));
        } else {
            config.main_file = Some(arg.clone());
        }
        i += 1;
    }
    Ok(Some(config))
}

fn print_usage() {
    println!(
        r#"Usage: lavender [options] [main file] [args]
where 'options' are zero or more of:
            -fp <directory>
     --filepath <directory> : Sets the filepath. The filepath is where
                              Lavender looks for user defined files.
                    --debug : Enables debug logging.
              --dump-tokens : Dump the main file's token stream as JSON
                              and exit.
                     --bare : Do not register the sys builtins.
                 -ss <size>
        --stack-size <size> : Sets the maximum size of the Lavender stack
                              in kibibytes (K), mebibytes (M), or gibibytes (G).
                -nss <size>
 --native-stack-size <size> : Sets the maximum size of the native stack
                              in kibibytes (K), mebibytes (M), or gibibytes (G).
                         -v
                  --version : Print version information and exit.
                         -?
                     --help : Print this information and exit."#
    );
}

fn run_file(session: Session, path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    let mut repl = match ReplSession::new(session) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    for line in source.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !repl.handle_line(line) {
            break;
        }
    }
    ExitCode::SUCCESS
}

/// Dump the token stream of a file as JSON, for debugging the lexer
/// and the parser tests.
fn dump_tokens(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    match lavender_parser::tokenize(&source) {
        Ok(toks) => {
            let items: Vec<serde_json::Value> = toks
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "token": format!("{:?}", t.token),
                        "text": t.text,
                        "span": t.span,
                    })
                })
                .collect();
            match serde_json::to_string_pretty(&items) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing tokens: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error parsing tokens: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(Some(config)) => config,
        Ok(None) => return ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::FAILURE;
        }
    };

    if config.debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lavender=debug".into()),
            )
            .init();
        debug!(?config, "starting");
    }

    let session = if config.bare {
        Session::bare()
    } else {
        Session::new()
    };

    match &config.main_file {
        Some(path) if config.dump_tokens => dump_tokens(path),
        Some(path) => {
            if !config.forwarded.is_empty() {
                debug!(args = ?config.forwarded, "forwarded arguments are unused without an evaluator");
            }
            run_file(session, path)
        }
        None => {
            let mut repl = match ReplSession::new(session) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            repl.run();
            ExitCode::SUCCESS
        }
    }
}
