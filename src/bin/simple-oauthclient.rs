use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    use simple_oauthclient::http::client::RequestError;
    use simple_oauthclient::util::cli::*;

    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Options::parse();
    match run_cli_action(opts).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Request(RequestError::Api(e))) => {
            eprintln!("ERROR {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
