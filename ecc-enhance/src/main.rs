mod cli;
mod config;
mod entity;
mod error;
mod reconcile;
mod services;
mod sheet;
mod store;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use cli::commands::records::handle_record_command;
use config::Config;
use error::EngineError;
use store::Store;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(err) = run(cli).await {
        log::debug!("command failed: {:?}", err);

        let (message, code) = match err.downcast_ref::<EngineError>() {
            Some(engine) => (engine.user_message(), exit_code(engine.status_code())),
            None => (format!("{:#}", err), 1),
        };
        eprintln!("{}", serde_json::json!({ "error": message }));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }

    let store = Store::open(&config.database).await?;
    let (kind, action) = cli.command.into_parts();
    let result = handle_record_command(&config, &store, kind, action).await;
    store.close().await;
    result
}

/// Client errors exit 2, missing records 3, everything else 1
fn exit_code(status: u16) -> i32 {
    match status {
        404 => 3,
        400..=499 => 2,
        _ => 1,
    }
}
