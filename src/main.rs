#[cfg(not(target_os = "linux"))]
compile_error!("roflcopter only supports Linux terminals");

mod animation;
mod ansi;
mod cli;
mod frames;
mod input;
mod logger;
mod signals;
mod terminal;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::{error, info, warn};

use crate::animation::{Animation, Clock, SystemClock};
use crate::cli::Cli;
use crate::frames::ROFLCOPTER;
use crate::input::{InputSource, RawStdin, StopReason};
use crate::signals::ShutdownFlag;
use crate::terminal::{FdStdin, RawStdout, StdinMode, TerminalSession, TtyOutput};

/// Process exit status. Nothing but 0 and 1 is ever reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Success,
    Failure,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Success => ExitCode::SUCCESS,
            Exit::Failure => ExitCode::FAILURE,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return usage_exit(&e).into();
        }
    };

    let _log_guard = match logger::init(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run();
    // The terminal is already restored by the time an error reaches here.
    if let Err(e) = &outcome {
        error!(error = %e, "roflcopter:fatal");
        eprintln!("{}", e);
    }
    exit_status(&outcome).into()
}

/// `--help` and `--version` succeed; any other argument problem is a failure.
fn usage_exit(err: &clap::Error) -> Exit {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Exit::Success,
        _ => Exit::Failure,
    }
}

fn exit_status(outcome: &Result<StopReason>) -> Exit {
    match outcome {
        Ok(reason) => {
            info!(reason = ?reason, "roflcopter:exit");
            Exit::Success
        }
        Err(_) => Exit::Failure,
    }
}

fn run() -> Result<StopReason> {
    let shutdown = ShutdownFlag::install()?;
    let is_tty = io::stdout().is_terminal();
    animate(
        RawStdout::new(),
        FdStdin::new(),
        is_tty,
        RawStdin,
        SystemClock,
        shutdown,
    )
}

/// Prepare the terminal, animate until asked to stop, restore the terminal.
fn animate<W, S, I, C>(
    out: W,
    stdin: S,
    is_tty: bool,
    input: I,
    clock: C,
    shutdown: ShutdownFlag,
) -> Result<StopReason>
where
    W: TtyOutput,
    S: StdinMode,
    I: InputSource,
    C: Clock,
{
    let mut session = TerminalSession::prepare(out, stdin, is_tty)?;

    let mut animation = Animation::new(&ROFLCOPTER, input, clock, shutdown);
    let outcome = animation.run(&mut session);

    // A terminal that has hung up cannot be restored; that alone does not
    // change how the run ended.
    if let Err(e) = session.teardown() {
        warn!(error = %e, "roflcopter:teardown failed");
    }

    Ok(outcome?)
}
