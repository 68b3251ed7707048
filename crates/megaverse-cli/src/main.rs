//! `megaverse` command-line driver

mod cli;
mod commands;
mod logging;

use megaverse_core::CanvasError;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli::build().get_matches();
    logging::init(matches.get_flag("verbose"), matches.get_flag("json-logs"));

    let outcome = match cli::resolve_config(&matches, |key| std::env::var(key).ok()) {
        Ok(config) => commands::run(&config, &matches).await,
        Err(err) => Err(err.into()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let out_of_bounds = err
                .chain()
                .filter_map(|cause| cause.downcast_ref::<CanvasError>())
                .any(CanvasError::is_out_of_bounds);
            error!("{err:#}");
            if out_of_bounds {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
