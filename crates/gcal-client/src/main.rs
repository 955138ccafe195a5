//! gcal CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::{Value, json};
use tracing::{Level, debug};

use gcal_core::{TracingConfig, init_tracing};

use gcal_client::cli::{AuthAction, Cli, Command, ConfigAction};
use gcal_client::commands::{self, calendar::Target};
use gcal_client::config::ClientConfig;
use gcal_client::error::{ClientError, ClientResult};

enum Output {
    Json(Value),
    Text(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = match (&cli.command, cli.debug) {
        (Command::Server, true) => TracingConfig::daemon().with_level(Level::DEBUG),
        (Command::Server, false) => TracingConfig::daemon(),
        (_, true) => TracingConfig::cli_debug(),
        (_, false) => TracingConfig::default(),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {e}");
    }

    let pretty = cli.pretty;
    match run(cli).await {
        Ok(Some(Output::Json(value))) => {
            print_json(&value, pretty);
            ExitCode::SUCCESS
        }
        Ok(Some(Output::Text(text))) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            let mut body = json!({"error": e.to_string()});
            if let ClientError::Remote(ref error) = e {
                body["code"] = json!(error.code);
                if let Some(ref parameter) = error.parameter {
                    body["parameter"] = json!(parameter);
                }
            }
            print_json(&body, pretty);
            ExitCode::FAILURE
        }
    }
}

fn print_json(value: &Value, pretty: bool) {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match text {
        Ok(text) => println!("{text}"),
        Err(e) => println!(r#"{{"error": "failed to serialize output: {e}"}}"#),
    }
}

async fn run(cli: Cli) -> ClientResult<Option<Output>> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = load_config(cli.config.as_ref())?;
    debug!(path = %config_path.display(), "configuration loaded");

    if let Some(request) = cli.command.to_request()? {
        let target = Target::from_cli(&cli, &config)?;
        return target.call(request).await.map(|v| Some(Output::Json(v)));
    }

    match &cli.command {
        Command::Server => {
            commands::server::run(&cli, &config).await?;
            Ok(None)
        }
        Command::Auth { action } => match action {
            #[cfg(feature = "google")]
            AuthAction::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => commands::auth::google(
                client_id.clone(),
                client_secret.clone(),
                credentials_file.clone(),
                *force,
                &config,
                &config_path,
            )
            .await
            .map(|v| Some(Output::Json(v))),
            #[cfg(feature = "google")]
            AuthAction::Status => commands::auth::status(&config).map(|v| Some(Output::Json(v))),
            #[cfg(feature = "google")]
            AuthAction::Logout => commands::auth::logout(&config).map(|v| Some(Output::Json(v))),
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => {
                commands::config::dump(&config, &config_path).map(|t| Some(Output::Text(t)))
            }
            ConfigAction::Validate => commands::config::validate(&config, &config_path)
                .map(|v| Some(Output::Json(v))),
            ConfigAction::Path => Ok(Some(Output::Json(commands::config::path(&config_path)))),
        },
        // Calendar commands were answered above.
        _ => Ok(None),
    }
}

/// An explicit `--config` must exist; the default file is optional.
fn load_config(explicit: Option<&PathBuf>) -> ClientResult<ClientConfig> {
    match explicit {
        Some(path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
}
