use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().collect();
    ExitCode::from(drawlab::cli::run_with_args(&args))
}
