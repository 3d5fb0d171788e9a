//! `soffice-locate`: print the path of an installed LibreOffice executable.
//!
//! Exit status 0 with the path on stdout, or 1 with a message on stderr.

use std::process::ExitCode;

fn main() -> ExitCode {
    match soffice_locate::locate() {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("soffice-locate: {e}");
            ExitCode::FAILURE
        }
    }
}
