use std::process::ExitCode;

fn main() -> ExitCode {
    dtbpipe::init::run()
}
