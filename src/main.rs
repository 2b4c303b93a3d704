use std::process::ExitCode;

use rabie::config::Config;
use rabie::{app, telemetry, Server};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    let config = Config::from_env();

    let server = match Server::bind(&config.addr) {
        Ok(server) => server,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.serve(app::build()).await {
        error!("server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
