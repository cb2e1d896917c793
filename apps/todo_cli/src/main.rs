use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{
    ControllerEvent, ControllerOptions, GraphqlRemoteStore, InMemoryRemoteStore,
    ListStateController, MissingRemoteStore, RemoteStore,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::{dispatch, parse_command, Command, Outcome, HELP};
use config::{load_settings, LoadedSettings, Settings};

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Todo list backed by a hosted GraphQL todo API")]
struct Args {
    /// TOML settings file (defaults to ./todo.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Amplify `amplifyconfiguration.json` / aws-exports file to read the endpoint from.
    #[arg(long)]
    amplify_config: Option<PathBuf>,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    /// Use a throwaway in-process store instead of the remote API.
    #[arg(long)]
    offline: bool,
    #[arg(long)]
    prefill_edit_buffer: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = Some(endpoint.clone());
        }
        if let Some(api_key) = &self.api_key {
            settings.api_key = Some(api_key.clone());
        }
        if self.prefill_edit_buffer {
            settings.prefill_edit_buffer = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let LoadedSettings {
        mut settings,
        warnings,
    } = load_settings(args.config.as_deref(), args.amplify_config.as_deref())?;
    args.apply(&mut settings);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    for warning in &warnings {
        warn!("{warning}");
    }

    let store = build_store(&settings, args.offline)?;
    let controller = ListStateController::new_with_options(
        store,
        ControllerOptions {
            prefill_edit_buffer: settings.prefill_edit_buffer,
        },
    );
    tokio::spawn(print_failures(controller.subscribe_events()));
    controller.initialize().await;

    run_prompt(&controller).await
}

fn build_store(settings: &Settings, offline: bool) -> Result<Arc<dyn RemoteStore>> {
    if offline {
        info!("running against in-process store");
        return Ok(Arc::new(InMemoryRemoteStore::new()));
    }
    match settings.store_config() {
        Some(config) => {
            let store = GraphqlRemoteStore::new(config)?;
            info!(endpoint = %store.endpoint(), "using graphql todo store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("no endpoint configured; every remote call will fail (use --endpoint or --offline)");
            Ok(Arc::new(MissingRemoteStore))
        }
    }
}

async fn print_failures(mut events: broadcast::Receiver<ControllerEvent>) {
    loop {
        match events.recv().await {
            Ok(ControllerEvent::OperationFailed {
                operation, message, ..
            }) => eprintln!("! {operation} failed: {message}"),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed controller events"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn run_prompt(controller: &ListStateController) -> Result<()> {
    println!("{}", render::render(&controller.snapshot().await));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        let show_help = command == Command::Help;
        match dispatch(controller, command).await {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Continue) if show_help => println!("{HELP}"),
            Ok(Outcome::Continue) => println!("{}", render::render(&controller.snapshot().await)),
            Err(message) => println!("{message}"),
        }
    }
    Ok(())
}
