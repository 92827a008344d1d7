use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ConferenceClient, HttpTransport};
use futures::StreamExt;
use shared::domain::SpeakerId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ui::{ConferenceApp, Route};

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Conference speakers front-end")]
struct Cli {
    /// Config file; defaults to ./conference.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    graphql_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the page for a route, e.g. /conference/speakers/1.
    Render { path: String },
    /// Flip a speaker's featured flag and print the updated list.
    Toggle { speaker_id: String },
    /// Re-print the page on every change; reads `toggle <id>` and `reset`
    /// lines from stdin.
    Watch {
        #[arg(default_value = "/conference/speakers")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.graphql_url {
        settings.graphql_url = url;
        config::validate(&settings)?;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let transport = HttpTransport::with_options(&settings.graphql_url, settings.transport_options())
        .context("failed to build graphql transport")?;
    info!(endpoint = %transport.endpoint(), "graphql client ready");
    let app = ConferenceApp::new(ConferenceClient::with_transport(std::sync::Arc::new(transport)));

    match cli.command {
        Command::Render { path } => {
            println!("{}", app.render_path(&path).await);
        }
        Command::Toggle { speaker_id } => {
            let update = app
                .toggle_featured_by_id(&SpeakerId::new(speaker_id.clone()))
                .await
                .with_context(|| format!("failed to toggle speaker {speaker_id}"))?;
            info!(speaker_id = %update.id, featured = update.featured, "featured flag updated");
            println!("{}", app.render_route(&Route::Speakers).await);
        }
        Command::Watch { path } => watch(&app, &path).await?,
    }

    Ok(())
}

async fn watch(app: &ConferenceApp, path: &str) -> Result<()> {
    let mut pages = app.watch_path(path);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            page = pages.next() => match page {
                Some(page) => println!("{page}"),
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => handle_command(app, line.trim()).await,
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

async fn handle_command(app: &ConferenceApp, line: &str) {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("toggle"), Some(id)) => {
            if let Err(err) = app.toggle_featured_by_id(&SpeakerId::new(id)).await {
                eprintln!("toggle failed: {err}");
            }
        }
        (Some("reset"), None) => app.client().reset_cache().await,
        (None, _) => {}
        _ => warn!(
            command = line,
            "unrecognized command; expected `toggle <speaker_id>` or `reset`"
        ),
    }
}
