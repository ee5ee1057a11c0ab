use clap::Parser;
use duckle::args::{Args, Command};
use duckle::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with {} error: {e}", e.error_type());
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().duckle_home().path();

    // This allows for running the program without a statement server. When DUCKLE_IN_TEST_MODE
    // is set and non-zero in length, then the mode will be Mode::Test, otherwise Mode::Http.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.remote_url())
            .await?
            .print(),

        Command::List(list_args) => {
            let config = Config::load(home).await?;
            commands::list(config, mode, list_args.sort()).await?.print()
        }

        Command::Categorize(categorize_args) => {
            let config = Config::load(home).await?;
            commands::categorize(
                config,
                mode,
                categorize_args.id(),
                categorize_args.category(),
            )
            .await?
            .print()
        }

        Command::Categories => {
            let config = Config::load(home).await?;
            commands::categories(config, mode).await?.print()
        }

        Command::AddCategory(add_args) => {
            let config = Config::load(home).await?;
            commands::add_category(config, mode, add_args.name())
                .await?
                .print()
        }

        Command::Upload(upload_args) => {
            let config = Config::load(home).await?;
            commands::upload(config, mode, upload_args.path())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
