use std::process::ExitCode;

use clap::Parser;
use strata_sample::cli::Cli;
use strata_sample::SampleError;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<SampleError>() {
                Some(e) => {
                    log::debug!("run failed ({})", e.category());
                    eprintln!("{}", e.user_message());
                }
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
