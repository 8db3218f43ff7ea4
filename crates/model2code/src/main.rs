//! model2code binary

use std::process::ExitCode;

use model2code::{Cli, Settings, log};

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let settings = match Settings::from_cli(cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let buffer = match log::init() {
        Ok(buffer) => buffer,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match model2code::run(&settings) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    };

    if settings.verbose {
        if let Err(e) = buffer.flush_to(&mut std::io::stdout()) {
            eprintln!("Error: failed to print log: {e}");
        }
    }
    code
}
