use std::process::ExitCode;

use blenderline::{BlenderlineError, ErrorKind};

fn main() -> ExitCode {
    match blenderline::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error [{:?}]: {}", err.kind(), err);
            if let BlenderlineError::ConversionFailed { report } = &err {
                for issue in &report.issues {
                    eprintln!("  - {}", issue);
                }
            }
            match err.kind() {
                ErrorKind::Cancelled => ExitCode::from(130),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
