//! CLI for the framebridge host↔iframe message bridge.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod simulate;
mod validate;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use framebridge_proto::{Message, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "framebridge",
    version,
    about = "Validate and simulate host/iframe bridge traffic"
)]
struct Cli {
    /// Log bridge internals and enable endpoint debug tracing.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check newline-delimited JSON messages against the bridge schema.
    Validate(validate::ValidateArgs),

    /// Run a host page and an embedded guest through the bridge handshake.
    Simulate(Box<simulate::SimulateArgs>),

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    if let Err(e) = cli.dispatch() {
        eprintln!("framebridge: {e:#}");
        std::process::exit(1);
    }
}

impl Cli {
    fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Validate(args) => validate::run(&args),
            Command::Simulate(args) => simulate::run(&args, self.debug),
            Command::Completion { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Self::command(),
                    "framebridge",
                    &mut std::io::stdout(),
                );
                Ok(())
            }
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `--debug`.
fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// One-line human summary of a message's fields.
pub(crate) fn describe(message: &Message) -> String {
    match message {
        Message::Ready => String::new(),
        Message::AuthReady { user } => match (user.name(), user.email()) {
            (Some(name), Some(email)) => format!("{name} <{email}>"),
            (Some(name), None) => name.to_owned(),
            _ => Value::from(user.clone()).to_string(),
        },
        Message::Navigate { route } => route.clone(),
        Message::StateSync { key, value } => format!("{key} = {value}"),
        Message::Event { name, payload } => match payload {
            Some(payload) => format!("{name} {payload}"),
            None => name.clone(),
        },
    }
}
