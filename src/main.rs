#![deny(clippy::unwrap_used)]

use std::process::ExitCode;

use dotenv::dotenv;
use ssh_key_manager::manager::app;
use ssh_key_manager::manager::config::resolve_config_path;
use tokio::io::BufReader;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();

    // Logs go to stderr so they never interleave with the console on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("warn".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = resolve_config_path(std::env::args().nth(1));

    let result = app::run(
        &config_path,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    if let Err(e) = &result {
        error!("{}", e);
        eprintln!("Error: {}", e);
    }

    ExitCode::from(app::exit_code(&result))
}
