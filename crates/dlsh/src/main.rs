#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use dlsh::cli::{Action, HELP_TEXT, Opts, VERSION};
use dlsh::{logging, session};

fn main() -> ExitCode {
    let opts = match Opts::from_env() {
        Ok(Action::Run(opts)) => opts,
        Ok(Action::Help) => {
            println!("{HELP_TEXT}");
            return ExitCode::SUCCESS;
        }
        Ok(Action::Version) => {
            println!("dlsh {VERSION}");
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = logging::init(&logging::LogConfig::from_env()) {
        eprintln!("dlsh: logging disabled: {err}");
    }

    let code = if let Some(line) = opts.command.as_deref() {
        session::run_command(line)
    } else if io::stdin().is_terminal() {
        session::run_interactive(&opts)
    } else {
        session::run_script(io::stdin().lock())
    };
    ExitCode::from(u8::try_from(code.rem_euclid(256)).unwrap_or(1))
}
