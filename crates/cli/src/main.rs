use std::process::ExitCode;

fn main() -> ExitCode {
    freshcart_cli::run()
}
