//! `framebridge simulate`: a host page and its embedded guest exchanging the
//! usual startup traffic inside the in-memory browser.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use colored::Colorize;
use framebridge::sim::Browser;
use framebridge::{EndpointConfig, Guest, Host, Message, MessageType, RouteChange, User};
use serde::Serialize;
use tracing::info;

use crate::{OutputFormat, describe};

/// Arguments for `framebridge simulate`.
#[derive(clap::Args)]
pub struct SimulateArgs {
    /// Origin of the embedding page.
    #[arg(long, default_value = "http://localhost:5173")]
    pub host_origin: String,

    /// Origin of the embedded page.
    #[arg(long, default_value = "http://localhost:8080")]
    pub guest_origin: String,

    /// Origins the host accepts (repeatable; default: the guest origin).
    #[arg(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,

    /// JSON file with the host endpoint configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Route the host navigates the guest to.
    #[arg(long, default_value = "/dashboard")]
    pub route: String,

    /// Locale pushed to the guest via STATE_SYNC.
    #[arg(long, default_value = "zh")]
    pub locale: String,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

/// Which endpoint handled a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Host,
    Guest,
}

impl Side {
    const fn label(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Guest => "guest",
        }
    }
}

/// One message as seen by the receiving endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    /// Receiving side.
    pub side: Side,
    /// The accepted message.
    pub message: Message,
}

/// Shared transcript written by handlers.
type Transcript = Arc<Mutex<Vec<Entry>>>;

fn record(transcript: &Transcript, side: Side, message: &Message) {
    transcript
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Entry {
            side,
            message: message.clone(),
        });
}

pub fn run(args: &SimulateArgs, debug: bool) -> Result<()> {
    let transcript = session(args, debug)?;

    if matches!(args.format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
        return Ok(());
    }

    for entry in &transcript {
        let side = match entry.side {
            Side::Host => entry.side.label().cyan(),
            Side::Guest => entry.side.label().magenta(),
        };
        println!(
            "{side:<5} <- {:<11} {}",
            entry.message.kind().as_str().bold(),
            describe(&entry.message)
        );
    }
    println!("{} messages delivered", transcript.len());
    Ok(())
}

/// Builds the host configuration from `--config` or the origin flags.
fn host_config(args: &SimulateArgs, debug: bool) -> Result<EndpointConfig> {
    if let Some(path) = &args.config {
        let loaded = EndpointConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        return Ok(EndpointConfig::builder()
            .target_origin(loaded.target_origin())
            .allowed_origins(loaded.allowed_origins().iter().cloned())
            .debug(loaded.debug() || debug)
            .build());
    }

    let mut builder = EndpointConfig::builder()
        .target_origin(&args.guest_origin)
        .debug(debug);
    if !args.allowed_origins.is_empty() {
        builder = builder.allowed_origins(args.allowed_origins.iter().cloned());
    }
    Ok(builder.build())
}

/// Runs the startup exchange and returns every accepted message in
/// delivery order.
///
/// The guest announces the signed-in user, `READY` and its initial route;
/// the host navigates it and pushes the locale, and the guest answers the
/// navigation with a `ROUTE_CHANGE` event.
pub fn session(args: &SimulateArgs, debug: bool) -> Result<Vec<Entry>> {
    let browser = Browser::new();
    let page = browser.open(args.host_origin.as_str());
    let (iframe, inner) = browser.embed(&page, args.guest_origin.as_str());

    let mut host = Host::new(page, host_config(args, debug)?);
    host.connect(&iframe);

    let mut guest = Guest::new(
        inner,
        EndpointConfig::builder()
            .target_origin(&args.host_origin)
            .debug(debug)
            .build(),
    );
    guest.connect();
    let guest = Arc::new(guest);

    let transcript: Transcript = Arc::default();

    for kind in [
        MessageType::Ready,
        MessageType::AuthReady,
        MessageType::Event,
    ] {
        let log = Arc::clone(&transcript);
        host.on(kind, move |message| {
            record(&log, Side::Host, message);
            Ok(())
        });
    }

    let log = Arc::clone(&transcript);
    let weak = Arc::downgrade(&guest);
    guest.on(MessageType::Navigate, move |message| {
        record(&log, Side::Guest, message);
        if let (Message::Navigate { route }, Some(guest)) = (message, weak.upgrade()) {
            guest.send(&Message::route_change(&RouteChange::new(route.as_str(), None)));
        }
        Ok(())
    });

    let log = Arc::clone(&transcript);
    guest.on(MessageType::StateSync, move |message| {
        record(&log, Side::Guest, message);
        Ok(())
    });

    guest.auth_ready(User::new(1_u64, "Test User").with_email("test@example.com"));
    guest.ready();
    guest.send(&Message::route_change(&RouteChange::new("/", None)));

    host.navigate(args.route.as_str());
    host.sync_state("locale", args.locale.as_str());

    let delivered = browser.run_until_idle();
    info!(delivered, "simulation idle");

    host.disconnect();
    drop(guest);

    let entries = transcript.lock().unwrap_or_else(PoisonError::into_inner).clone();
    Ok(entries)
}
