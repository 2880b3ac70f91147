use std::path::PathBuf;
use std::process::Command;

fn wsc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_wsc"))
}

/// Write a source file under a per-test scratch directory.
fn fixture(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wsc-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

// push 65, output-char, end: prints "A".
const PRINT_A: &str = "   \t     \t\n\t\n  \n\n\n";

#[test]
fn runs_a_stack_program() {
    let src = fixture("print_a.ws", PRINT_A);
    let out = wsc().arg(&src).output().expect("failed to run wsc");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "A");
}

#[test]
fn dump_prints_instruction_json() {
    let src = fixture("dump_me.ws", PRINT_A);
    let out = wsc().arg(&src).arg("--dump").output().expect("failed to run wsc");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Push"), "expected instruction JSON, got: {stdout}");
    assert!(stdout.contains("OutputChar"), "expected instruction JSON, got: {stdout}");
}

#[test]
fn emit_asm_prints_the_fixed_header() {
    let src = fixture("emit_me.ws", PRINT_A);
    let out = wsc().args([src.to_str().unwrap(), "--emit", "asm"]).output().expect("run");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(".global _start"));
    assert!(stdout.contains("array: .skip 30000"));
    assert!(stdout.contains("// Push(65)"));
}

#[test]
fn emit_to_file_writes_the_assembly() {
    let src = fixture("emit_file.ws", PRINT_A);
    let asm_path = src.with_extension("s");
    let out = wsc()
        .args([src.to_str().unwrap(), "-o", asm_path.to_str().unwrap()])
        .output()
        .expect("run");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let text = std::fs::read_to_string(&asm_path).expect("assembly written");
    assert!(text.contains("_start:"));
}

#[test]
fn tape_files_compile_with_path_labels() {
    let src = fixture("loop.b", "++[-].");
    let out = wsc().args([src.to_str().unwrap(), "--emit", "asm"]).output().expect("run");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("while_2:"), "expected loop label, got:\n{stdout}");
    assert!(stdout.contains("bl _output_char"));
}

#[test]
fn tape_run_is_refused() {
    let src = fixture("norun.b", "+.");
    let out = wsc().args([src.to_str().unwrap(), "--text"]).output().expect("run");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("compile-only"), "stderr: {stderr}");
}

#[test]
fn parse_errors_exit_nonzero_with_code() {
    // A lone space is a truncated command.
    let src = fixture("broken.ws", " ");
    let out = wsc().args([src.to_str().unwrap(), "--text"]).output().expect("run");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("WS-P001"), "stderr: {stderr}");
}

#[test]
fn json_mode_emits_parseable_diagnostics() {
    let src = fixture("broken2.ws", " ");
    let out = wsc().args([src.to_str().unwrap(), "--json"]).output().expect("run");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr.lines().next().expect("one NDJSON line");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON diagnostic");
    assert_eq!(v["severity"], "error");
    assert_eq!(v["code"], "WS-P001");
}

#[test]
fn duplicate_label_is_a_load_error() {
    // label "s" twice, then end.
    let src = fixture("dup_label.ws", "\n   \n\n   \n\n\n\n");
    let out = wsc().args([src.to_str().unwrap(), "--text"]).output().expect("run");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("WS-L001"), "stderr: {stderr}");
}

#[test]
fn missing_file_is_reported() {
    let out = wsc().args(["definitely-not-a-file.ws", "--text"]).output().expect("run");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("reading"), "stderr: {stderr}");
}

#[test]
fn version_flag_prints_and_exits_zero() {
    let out = wsc().arg("--version").output().expect("run");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("wsc "));
}

#[test]
fn no_args_shows_usage() {
    let out = wsc().output().expect("run");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage"));
}
