#[cfg(not(unix))]
compile_error!("bas-shell relies on fork/exec, dup2 and SIGCHLD and only builds on Unix");

mod builtins;
mod cli;
mod errors;
mod executor;
mod job_control;
mod jobs;
mod logging;
mod parser;
mod reaper;
mod redirect;
mod shell;
mod signals;
mod status;

use anyhow::Context;

fn main() {
    let args = cli::parse();
    if let Err(e) = logging::init_logging(args.log_level) {
        eprintln!("bas-shell: logging disabled: {e:#}");
    }

    if let Err(e) = run(args) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run(args: cli::CliArgs) -> anyhow::Result<()> {
    signals::install().context("installing signal handlers")?;
    let mut shell = shell::Shell::new(args.prompt, args.builtin_match)
        .context("saving standard streams")?;
    shell.run()?;
    Ok(())
}
