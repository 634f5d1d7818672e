#[cfg(unix)]
use std::io::Write;
#[cfg(unix)]
use std::path::Path;
#[cfg(unix)]
use std::process::{Command, Stdio};

#[cfg(unix)]
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

/// Write a script that sends `signal` to its parent, i.e. the shell.
#[cfg(unix)]
fn signal_parent_script(dir: &Path, signal: &str) -> String {
    let name = format!("send_{signal}.sh");
    std::fs::write(dir.join(&name), format!("kill -{signal} $PPID\nsleep 1\n")).unwrap();
    format!("sh {name}")
}

#[cfg(unix)]
#[test]
fn shell_survives_interrupt() {
    let dir = tempfile::tempdir().unwrap();
    let script = signal_parent_script(dir.path(), "INT");
    let output = run_shell(dir.path(), &[script.as_str(), "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

#[cfg(unix)]
#[test]
fn shell_ignores_quit() {
    let dir = tempfile::tempdir().unwrap();
    let script = signal_parent_script(dir.path(), "QUIT");
    let output = run_shell(dir.path(), &[script.as_str(), "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

#[cfg(unix)]
#[test]
fn interrupt_still_reaches_foreground_programs() {
    let dir = tempfile::tempdir().unwrap();
    // The child kills itself with SIGINT; if the shell had set SIG_IGN the
    // child would inherit it and print SURVIVED.
    std::fs::write(dir.path().join("self_int.sh"), "kill -INT $$\necho SURVIVED\n").unwrap();
    let output = run_shell(dir.path(), &["sh self_int.sh", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!stdout.contains("SURVIVED"), "stdout was: {stdout}");
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
}
