use std::io::Write;
use std::process::ExitCode;

fn main() -> ExitCode {
    match hostwatchd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "hostwatchd: {error}");
            ExitCode::FAILURE
        }
    }
}
