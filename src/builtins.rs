use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use clap::ValueEnum;

use crate::errors::ShellError;
use crate::parser::Command;

/// How a typed command name is compared against builtin names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BuiltinMatch {
    /// The name must equal the builtin's name.
    #[default]
    Exact,
    /// Any non-empty prefix of exactly one builtin name selects it (`e` runs `exit`).
    Prefix,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BuiltinAction {
    Continue,
    Exit,
}

type Handler = fn(&[OsString], &mut dyn Write) -> BuiltinAction;

/// The builtin table, consulted before anything is spawned.
const BUILTINS: &[(&str, Handler)] = &[("exit", builtin_exit), ("cd", builtin_cd)];

/// Find the builtin handling `name` under the given matching policy.
pub fn lookup(name: &str, mode: BuiltinMatch) -> Option<(&'static str, Handler)> {
    match mode {
        BuiltinMatch::Exact => BUILTINS.iter().copied().find(|(builtin, _)| *builtin == name),
        BuiltinMatch::Prefix => {
            if name.is_empty() {
                return None;
            }
            let mut matches = BUILTINS
                .iter()
                .copied()
                .filter(|(builtin, _)| builtin.starts_with(name));
            let first = matches.next()?;
            // Ambiguous prefixes fall through to an external lookup.
            match matches.next() {
                Some(_) => None,
                None => Some(first),
            }
        }
    }
}

/// Run the command as a builtin if it names one.
///
/// Returns `None` when the command is not a builtin and must be launched.
/// A handled command always has `should_spawn` cleared.
pub fn execute(
    command: &mut Command,
    mode: BuiltinMatch,
    stderr: &mut dyn Write,
) -> Option<BuiltinAction> {
    let (name, handler) = lookup(command.program()?.to_str()?, mode)?;
    tracing::debug!(builtin = name, "dispatching builtin");
    command.should_spawn = false;
    Some(handler(&command.arguments[1..], stderr))
}

fn builtin_exit(_args: &[OsString], _stderr: &mut dyn Write) -> BuiltinAction {
    BuiltinAction::Exit
}

fn builtin_cd(args: &[OsString], stderr: &mut dyn Write) -> BuiltinAction {
    let target = match args.first() {
        Some(dir) => PathBuf::from(dir),
        None => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home),
            None => {
                let _ = writeln!(stderr, "{}", ShellError::HomeNotSet);
                return BuiltinAction::Continue;
            }
        },
    };

    if let Err(error) = std::env::set_current_dir(&target) {
        let target = target.to_string_lossy().into_owned();
        let _ = writeln!(stderr, "{}", ShellError::ChangeDir { target, error });
    }

    BuiltinAction::Continue
}
