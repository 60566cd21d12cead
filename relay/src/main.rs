//! Relay Replay CLI
//!
//! Applies a JSON array of signed operations to a relay store and prints
//! every committed event as one JSON line on stdout.
//!
//! Run modes:
//!   relay-replay apply ops.json --genesis genesis.json
//!   relay-replay query '{"type":"best_known_digest"}'

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use spv_relay::common::{init_from_config, EventCategory, LogEvent, LogLevel};
use spv_relay::{
    GenesisState, Host, KvStore, MemoryStore, Query, Relay, RelayConfig, SignedOperation,
    SqliteStore,
};

#[derive(Parser)]
#[command(name = "relay-replay")]
#[command(about = "Replay host operations against an SPV relay store")]
struct Cli {
    /// SQLite database path (overrides RELAY_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print the effective configuration before running
    #[arg(long, global = true)]
    show_config: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON array of signed operations
    Apply {
        /// Operations file
        operations: PathBuf,

        /// Genesis state used when the store is empty
        #[arg(short, long, env = "RELAY_GENESIS_FILE")]
        genesis: Option<PathBuf>,

        /// Stop at the first rejected operation
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Answer one JSON-encoded query
    Query {
        /// Query, e.g. {"type":"best_known_digest"}
        query: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = RelayConfig::from_env()?;
    if cli.db.is_some() {
        config.db_path = cli.db.clone();
    }
    init_from_config(&config)?;

    if cli.show_config {
        config.print_summary();
    }

    let relay = Relay::new(config.params());
    match config.db_path.as_deref() {
        Some(path) => run(Host::new(relay, SqliteStore::new(path)?), cli.command),
        None => run(Host::new(relay, MemoryStore::new()), cli.command),
    }
}

fn run<S: KvStore>(host: Host<S>, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Apply {
            operations,
            genesis,
            stop_on_error,
        } => apply(&host, &operations, genesis.as_deref(), stop_on_error),
        Commands::Query { query } => {
            let query: Query = serde_json::from_str(&query)?;
            let response = host.query(&query)?;
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
    }
}

fn apply<S: KvStore>(
    host: &Host<S>,
    operations: &Path,
    genesis: Option<&Path>,
    stop_on_error: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !host.is_initialized()? {
        let path = genesis.ok_or("store is empty and no genesis file was given")?;
        let state: GenesisState = serde_json::from_str(&fs::read_to_string(path)?)?;
        for event in host.bootstrap(&state)? {
            println!("{}", serde_json::to_string(&event)?);
        }
        let log = LogEvent::new(LogLevel::Info, EventCategory::System, "relay bootstrapped")
            .with_data(serde_json::json!({
                "genesis": state.relay_genesis.hash.to_string(),
                "height": state.relay_genesis.height,
            }));
        tracing::info!(target: "relay::system", "{}", log.to_json());
    }

    let signed: Vec<SignedOperation> = serde_json::from_str(&fs::read_to_string(operations)?)?;
    let total = signed.len();
    let mut rejected = 0usize;

    for operation in &signed {
        match host.apply(operation) {
            Ok(events) => {
                for event in events {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
            Err(err) if err.is_fatal() || stop_on_error => return Err(err.into()),
            Err(_) => rejected += 1,
        }
    }

    let log = LogEvent::new(LogLevel::Info, EventCategory::System, "replay finished")
        .with_data(serde_json::json!({ "applied": total - rejected, "rejected": rejected }));
    tracing::info!(target: "relay::system", "{}", log.to_json());
    Ok(())
}
