use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

fn run_shell(dir: &Path, lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_bas-shell"))
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn bas-shell");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
        writeln!(stdin, "exit").expect("write exit");
    }

    child.wait_with_output().expect("wait output")
}

#[test]
fn truncate_redirect_replaces_file_and_prompt_stays_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_shell(
        dir.path(),
        &["echo first > out.txt", "echo second > out.txt", "echo AFTER"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    let contents = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(contents, "second\n");
    assert!(stdout.contains("AFTER"), "stdout was: {stdout}");
    assert!(!stdout.contains("second"), "stdout was: {stdout}");
    assert_eq!(stdout.matches("[SHELL]> ").count(), 4, "stdout was: {stdout}");
    assert!(output.status.success());
}

#[test]
fn append_redirect_concatenates_runs() {
    let dir = tempfile::tempdir().unwrap();
    let _ = run_shell(dir.path(), &["echo one >> log.txt", "echo two >> log.txt"]);

    let contents = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
    assert_eq!(contents, "one\ntwo\n");
}

#[test]
fn output_file_round_trips_through_input_redirect() {
    let dir = tempfile::tempdir().unwrap();
    let _ = run_shell(
        dir.path(),
        &["echo hello redirected world > a.txt", "cat < a.txt > b.txt"],
    );

    let original = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
    let copy = std::fs::read_to_string(dir.path().join("b.txt")).unwrap();
    assert_eq!(original, "hello redirected world\n");
    assert_eq!(copy, original);
}

#[test]
fn input_redirect_is_undone_for_the_next_command() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.txt"), "from file\n").unwrap();
    let output = run_shell(dir.path(), &["cat < in.txt", "echo NEXT"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("from file"), "stdout was: {stdout}");
    assert!(stdout.contains("NEXT"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

#[test]
fn unopenable_target_is_reported_and_command_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_shell(dir.path(), &["echo STILL_RUNS > missing/dir/out.txt"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stderr.contains("missing/dir/out.txt: "), "stderr was: {stderr}");
    assert!(stdout.contains("STILL_RUNS"), "stdout was: {stdout}");
}

#[test]
fn earlier_redirect_survives_a_later_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_shell(dir.path(), &["echo KEPT > first.txt > missing/second.txt"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stderr.contains("missing/second.txt: "), "stderr was: {stderr}");
    let contents = std::fs::read_to_string(dir.path().join("first.txt")).unwrap();
    assert_eq!(contents, "KEPT\n");
}

#[test]
fn last_output_redirect_wins() {
    let dir = tempfile::tempdir().unwrap();
    let _ = run_shell(dir.path(), &["echo WINNER > a.txt > b.txt"]);

    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "");
    assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "WINNER\n");
}

#[test]
fn missing_filename_is_a_syntax_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_shell(dir.path(), &["echo NOT_PRINTED >", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stderr.contains("syntax error"), "stderr was: {stderr}");
    assert!(!stdout.contains("NOT_PRINTED"), "stdout was: {stdout}");
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
}

#[test]
fn bare_redirect_creates_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("touched.txt"), "old contents").unwrap();
    let output = run_shell(dir.path(), &["> touched.txt"]);

    assert!(output.stderr.is_empty(), "stderr was: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(std::fs::read_to_string(dir.path().join("touched.txt")).unwrap(), "");
}

#[test]
fn reaper_notices_never_land_in_a_redirect_target() {
    let dir = tempfile::tempdir().unwrap();
    let status = Command::new("mkfifo")
        .arg(dir.path().join("pipe"))
        .status()
        .expect("run mkfifo");
    assert!(status.success());
    // Opening the fifo for writing blocks until this reader shows up.
    std::fs::write(dir.path().join("reader.sh"), "sleep 0.6\ncat pipe > /dev/null\n").unwrap();

    // `a.txt` is already stdout while the shell waits on the fifo, and the
    // sleep finishes inside that window.
    let output = run_shell(
        dir.path(),
        &["sh reader.sh &", "sleep 0.2 &", "true > a.txt > pipe", "sleep 1"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    let captured = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
    assert_eq!(captured, "", "a.txt was: {captured}");
    assert_eq!(stdout.matches("]: Terminated").count(), 2, "stdout was: {stdout}");
}
