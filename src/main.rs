#![warn(clippy::all)]

use wsc::codegen::{asm, compile_tape, compile_ws};
use wsc::diagnostic::{ansi::AnsiRenderer, json, Diagnostic};
use wsc::inst::{Instr, TapeInstr};
use wsc::interpreter;
use wsc::io::StdIo;
use wsc::parser::{parse_tape, parse_ws, ParseError};
use wsc::program::Program;

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Ansi,
    Text,
    Json,
}

/// Scan args for --json/-j, --text/-t, --ansi/-a. Return (mode, remaining).
/// Multiple format flags → error + exit(1).
fn detect_output_mode(args: Vec<String>) -> (OutputMode, Vec<String>) {
    let mut mode: Option<OutputMode> = None;
    let mut remaining = Vec::with_capacity(args.len());
    let mut conflict = false;

    for arg in args {
        match arg.as_str() {
            "--json" | "-j" => {
                if mode.is_some() { conflict = true; } else { mode = Some(OutputMode::Json); }
            }
            "--text" | "-t" => {
                if mode.is_some() { conflict = true; } else { mode = Some(OutputMode::Text); }
            }
            "--ansi" | "-a" => {
                if mode.is_some() { conflict = true; } else { mode = Some(OutputMode::Ansi); }
            }
            _ => remaining.push(arg),
        }
    }

    if conflict {
        eprintln!("error: --json, --text, and --ansi are mutually exclusive");
        std::process::exit(1);
    }

    let resolved = mode.unwrap_or_else(|| {
        // Auto-detect: isatty(stderr) && !NO_COLOR → Ansi; isatty && NO_COLOR → Text; !isatty → Json
        // SAFETY: isatty(2) is safe to call with any fd value; it returns 0 on
        // error or if the fd is not a terminal.
        let is_tty = unsafe { libc::isatty(libc::STDERR_FILENO) } != 0;
        let no_color = std::env::var("NO_COLOR").is_ok();
        if is_tty && !no_color {
            OutputMode::Ansi
        } else if is_tty {
            OutputMode::Text
        } else {
            OutputMode::Json
        }
    });

    (resolved, remaining)
}

fn report_diagnostic(d: &Diagnostic, mode: OutputMode) {
    let s = match mode {
        OutputMode::Ansi => AnsiRenderer { use_color: true }.render(d),
        OutputMode::Text => AnsiRenderer { use_color: false }.render(d),
        // JSON mode: one object per line (NDJSON) so multiple errors are parseable.
        OutputMode::Json => format!("{}\n", json::render(d)),
    };
    eprint!("{}", s);
}

fn usage() {
    eprintln!("Usage: wsc <file> [--emit asm | -o <out.s> | --dump]");
    eprintln!("       wsc help | -h     Show usage and examples");
}

fn help() {
    println!("wsc — interpreter and ARM64 compiler for two tiny languages\n");
    println!("Usage:");
    println!("  wsc <file>                 Run through the interpreter (stack language)");
    println!("  wsc <file> --emit asm      Print ARM64 assembly on stdout");
    println!("  wsc <file> -o <out.s>      Write ARM64 assembly to a file");
    println!("  wsc <file> --dump          Print the parsed instruction list as JSON\n");
    println!("The frontend is chosen by extension: .b/.bf parse as the byte-tape");
    println!("language (compile-only), anything else as the whitespace-alphabet");
    println!("stack language.\n");
    println!("Output format (errors):");
    println!("  --ansi / -a   Force ANSI colour output (default when stderr is a TTY)");
    println!("  --text / -t   Force plain text output (no colour)");
    println!("  --json / -j   Force JSON output (default when stderr is not a TTY)");
    println!("  NO_COLOR=1    Disable colour (same as --text)");
}

/// What to do with the parsed program.
enum Action {
    Run,
    EmitStdout,
    EmitFile(String),
    Dump,
}

fn parse_action(args: &[String], mode: OutputMode) -> Action {
    let mut i = 0;
    let mut action = Action::Run;
    while i < args.len() {
        match args[i].as_str() {
            "--emit" => {
                if args.get(i + 1).map(String::as_str) != Some("asm") {
                    report_diagnostic(
                        &Diagnostic::error("--emit takes exactly one target: asm"),
                        mode,
                    );
                    std::process::exit(1);
                }
                action = Action::EmitStdout;
                i += 2;
            }
            "-o" => match args.get(i + 1) {
                Some(path) => {
                    action = Action::EmitFile(path.clone());
                    i += 2;
                }
                None => {
                    report_diagnostic(&Diagnostic::error("-o takes an output path"), mode);
                    std::process::exit(1);
                }
            },
            "--dump" => {
                action = Action::Dump;
                i += 1;
            }
            other => {
                report_diagnostic(
                    &Diagnostic::error(format!("unrecognized argument: {other}")),
                    mode,
                );
                std::process::exit(1);
            }
        }
    }
    action
}

fn parse_error_diag(err: &ParseError, source: &str) -> Diagnostic {
    Diagnostic::error(err.to_string())
        .with_code(err.code())
        .with_span(err.span(), "here")
        .with_source(source.to_string())
}

fn emit(text: String, dest: Option<&str>, mode: OutputMode) {
    match dest {
        None => print!("{text}"),
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                report_diagnostic(&Diagnostic::error(format!("writing {path}: {e}")), mode);
                std::process::exit(1);
            }
        }
    }
}

fn dump<T: serde::Serialize>(instrs: &[T], mode: OutputMode) {
    match serde_json::to_string_pretty(instrs) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            report_diagnostic(&Diagnostic::error(format!("serializing program: {e}")), mode);
            std::process::exit(1);
        }
    }
}

fn run_ws(source: &str, action: Action, mode: OutputMode) {
    let instrs: Vec<Instr> = match parse_ws(source) {
        Ok(i) => i,
        Err(e) => {
            report_diagnostic(&parse_error_diag(&e, source), mode);
            std::process::exit(1);
        }
    };
    if let Action::Dump = action {
        dump(&instrs, mode);
        return;
    }
    let program = match Program::new(instrs) {
        Ok(p) => p,
        Err(e) => {
            report_diagnostic(&Diagnostic::error(e.to_string()).with_code(e.code()), mode);
            std::process::exit(1);
        }
    };
    match action {
        Action::Run | Action::Dump => {
            if let Err(e) = interpreter::exec(&program, &mut StdIo) {
                report_diagnostic(&Diagnostic::error(e.to_string()).with_code(e.code()), mode);
                std::process::exit(1);
            }
        }
        Action::EmitStdout => emit(asm::render(&compile_ws(&program)), None, mode),
        Action::EmitFile(path) => emit(asm::render(&compile_ws(&program)), Some(&path), mode),
    }
}

fn run_tape(source: &str, action: Action, mode: OutputMode) {
    let instrs: Vec<TapeInstr> = match parse_tape(source) {
        Ok(i) => i,
        Err(e) => {
            report_diagnostic(&parse_error_diag(&e, source), mode);
            std::process::exit(1);
        }
    };
    match action {
        Action::Run => {
            report_diagnostic(
                &Diagnostic::error("the byte-tape language is compile-only")
                    .with_note("use --emit asm or -o to get ARM64 assembly"),
                mode,
            );
            std::process::exit(1);
        }
        Action::Dump => dump(&instrs, mode),
        Action::EmitStdout => emit(asm::render(&compile_tape(&instrs)), None, mode),
        Action::EmitFile(path) => emit(asm::render(&compile_tape(&instrs)), Some(&path), mode),
    }
}

fn main() {
    let raw_args: Vec<String> = std::env::args().collect();
    let (mode, args) = detect_output_mode(raw_args);

    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }

    if args[1] == "--version" || args[1] == "-V" {
        println!("wsc {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    if args[1] == "help" || args[1] == "--help" || args[1] == "-h" {
        help();
        std::process::exit(0);
    }

    let path = &args[1];
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            report_diagnostic(&Diagnostic::error(format!("reading {path}: {e}")), mode);
            std::process::exit(1);
        }
    };

    let action = parse_action(&args[2..], mode);
    let is_tape = std::path::Path::new(path)
        .extension()
        .map(|ext| ext == "b" || ext == "bf")
        .unwrap_or(false);

    if is_tape {
        run_tape(&source, action, mode);
    } else {
        run_ws(&source, action, mode);
    }
}
