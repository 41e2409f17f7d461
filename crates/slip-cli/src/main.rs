//! Slip CLI - command-line interface for the Slip Lisp dialect.

use std::env;
use std::fs;
use std::path::Path;

use log::info;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use slip::{Session, SessionConfig, Value};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// What to do with each source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Show,
}

fn run(args: Vec<String>) -> Result<(), String> {
    let mut eval_code: Option<String> = None;
    let mut interactive = false;
    let mut mode = Mode::Run;
    let mut file: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-v" | "--version" => {
                print_version();
                return Ok(());
            }
            "-e" | "--eval" => {
                i += 1;
                if i >= args.len() {
                    return Err("-e requires an argument".to_string());
                }
                eval_code = Some(args[i].clone());
            }
            "-s" | "--show" => {
                mode = Mode::Show;
            }
            "-i" | "--interactive" => {
                interactive = true;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                file = Some(arg.clone());
                break;
            }
        }
        i += 1;
    }

    let mut session = Session::new(SessionConfig::default()).map_err(|e| e.to_string())?;

    if let Some(code) = eval_code {
        process(&mut session, &code, mode)?;
        if interactive {
            start_repl(&mut session, mode)?;
        }
    } else if let Some(filepath) = file {
        let code = read_file(&filepath)?;
        info!("running {}", filepath);
        process(&mut session, &code, mode).map_err(|e| format!("Error in {}: {}", filepath, e))?;
        if interactive {
            start_repl(&mut session, mode)?;
        }
    } else {
        start_repl(&mut session, mode)?;
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"
Slip v{} - a small Lisp with a continuation-passing compiler

Usage:
  slip [options] [file]

Options:
  -h, --help         Show this help message
  -v, --version      Show version
  -e, --eval         Evaluate code from command line
  -s, --show         Print compiled listings instead of running
  -i, --interactive  Start REPL after running file

Examples:
  slip                        Start interactive REPL
  slip program.lisp           Run a source file
  slip -e "(+ 1 2)"           Evaluate code
  slip -s -e "(lambda (x) x)" Show the compiled code
  RUST_LOG=debug slip ...     Log macro expansions
"#,
        VERSION
    );
}

fn print_version() {
    println!("Slip {}", VERSION);
}

fn read_file(filepath: &str) -> Result<String, String> {
    let path = Path::new(filepath);

    if !path.exists() {
        return Err(format!("File not found: {}", filepath));
    }

    fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))
}

/// Evaluate `code` and print its value, or print its listings.
fn process(session: &mut Session, code: &str, mode: Mode) -> Result<(), String> {
    match mode {
        Mode::Run => {
            let result = session.eval(code).map_err(|e| e.to_string())?;
            if result != Value::Nil {
                println!("{}", session.serialize(&result));
            }
        }
        Mode::Show => {
            let listings = session.listings(code).map_err(|e| e.to_string())?;
            println!("{}", listings.join("\n\n"));
        }
    }
    Ok(())
}

fn start_repl(session: &mut Session, mut mode: Mode) -> Result<(), String> {
    println!("Slip v{} - Type 'exit' or Ctrl+D to quit", VERSION);
    println!();

    let mut rl = DefaultEditor::new().map_err(|e| format!("Failed to create editor: {}", e))?;

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { ". " };

        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if buffer.is_empty() && (trimmed == "exit" || trimmed == "quit") {
                    println!("Goodbye!");
                    break;
                }

                if buffer.is_empty() && trimmed.starts_with('/') {
                    if handle_command(trimmed, &mut mode) {
                        break;
                    }
                    continue;
                }

                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if is_complete(&buffer) {
                    if !buffer.trim().is_empty() {
                        rl.add_history_entry(buffer.trim()).ok();
                        if let Err(e) = process(session, &buffer, mode) {
                            eprintln!("Error: {}", e);
                        }
                    }
                    buffer.clear();
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(e) => {
                return Err(format!("Readline error: {}", e));
            }
        }
    }

    Ok(())
}

/// Check whether every list opened in `input` has been closed.
fn is_complete(input: &str) -> bool {
    let mut depth: i64 = 0;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                while let Some(s) = chars.next() {
                    match s {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                    if chars.as_str().is_empty() && s != '"' {
                        return false;
                    }
                }
            }
            ';' => {
                for s in chars.by_ref() {
                    if s == '\n' {
                        break;
                    }
                }
            }
            '#' => {
                if chars.as_str().starts_with('\\') {
                    chars.next();
                    chars.next();
                }
            }
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0
}

/// Handle a REPL command. Returns true to exit.
fn handle_command(cmd: &str, mode: &mut Mode) -> bool {
    let parts: Vec<&str> = cmd[1..].split_whitespace().collect();
    let command = parts.first().map(|s| s.to_lowercase()).unwrap_or_default();

    match command.as_str() {
        "help" => {
            println!(
                r#"
REPL Commands:
  /help     Show this help
  /show     Toggle printing compiled listings instead of running
  /clear    Clear the screen
  /exit     Exit the REPL
"#
            );
        }
        "show" => {
            *mode = match *mode {
                Mode::Run => Mode::Show,
                Mode::Show => Mode::Run,
            };
            println!("Listing mode {}", if *mode == Mode::Show { "on" } else { "off" });
        }
        "clear" => {
            print!("\x1B[2J\x1B[1;1H");
        }
        "exit" | "quit" => {
            println!("Goodbye!");
            return true;
        }
        _ => {
            println!("Unknown command: /{}", command);
            println!("Type /help for available commands");
        }
    }
    false
}
