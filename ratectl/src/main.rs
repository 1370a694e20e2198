//! LeuFX rate control
//!
//! Operator tool for inspecting and refreshing exchange rates and running
//! one-off conversions against the live provider chain.

use clap::{Parser, Subcommand};
use leufx_fx::{FxEngine, FxEngineConfig};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use output::Output;

/// LeuFX rate control CLI
#[derive(Parser, Debug)]
#[command(name = "ratectl")]
#[command(about = "Inspect, refresh and use LeuFX exchange rates")]
struct Args {
    /// Use only the embedded snapshot (no network)
    #[arg(long, global = true)]
    offline: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Locale for formatted amounts
    #[arg(long, global = true, default_value = "en-US")]
    locale: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cache status, provider chain and counters
    Status,

    /// Run the provider chain now
    Refresh,

    /// Convert an amount into one or more currencies
    Convert {
        amount: String,
        from: String,
        #[arg(required = true)]
        to: Vec<String>,
    },

    /// Rates of every currency against a base
    Rates {
        #[arg(long, default_value = "EUR")]
        base: String,
    },

    /// Synthetic daily series for a pair
    History {
        from: String,
        to: String,
        #[arg(long)]
        days: Option<u32>,
    },

    /// RON rate to apply on an invoice in a foreign currency
    Invoice { currency: String },

    /// List supported currencies
    Currencies {
        /// Only major currencies
        #[arg(long)]
        major: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config = FxEngineConfig::from_env();
    if args.offline {
        config.providers.enable_bnr = false;
        config.providers.enable_exchange_api = false;
    }

    let engine = FxEngine::new(config)?;
    let out = Output::new(args.json, args.locale);

    // Commands that read rates start from a fresh table.
    if !matches!(args.command, Command::Refresh | Command::Currencies { .. }) {
        let outcome = engine.force_refresh().await;
        if outcome.success {
            info!(source = ?outcome.source, rates = outcome.rates_count, "Rates loaded");
        } else {
            warn!("Provider chain failed, using embedded snapshot");
            engine.load_fallback_rates()?;
        }
    }

    match args.command {
        Command::Status => commands::status(&engine, &out),
        Command::Refresh => commands::refresh(&engine, &out).await,
        Command::Convert { amount, from, to } => commands::convert(&engine, &out, &amount, &from, &to),
        Command::Rates { base } => commands::rates(&engine, &out, &base),
        Command::History { from, to, days } => commands::history(&engine, &out, &from, &to, days),
        Command::Invoice { currency } => commands::invoice(&engine, &out, &currency),
        Command::Currencies { major } => commands::currencies(&engine, &out, major),
    }
}
