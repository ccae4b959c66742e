//! Wallet connector CLI
//!
//! Runs the connection flow against JSON-RPC endpoints, e.g. a local anvil node
//! standing in for the wallet.

use clap::{Parser, Subcommand};
use dapp_wallet_connector::alert::TracingAlertSink;
use dapp_wallet_connector::injected::AddEthereumChainParameter;
use dapp_wallet_connector::provider::HttpTransport;
use dapp_wallet_connector::selector::JsonRpcSelectorFactory;
use dapp_wallet_connector::{ConnectOutcome, Result, WalletConfig, WalletConnector, WalletStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "wallet-connector")]
#[command(about = "Connect a wallet to the dApp's target chain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Config,

    /// Print the wallet_addEthereumChain parameters for the target chain
    ChainParams,

    /// Run connect() against a JSON-RPC endpoint
    Connect {
        /// Endpoint the selector connects to
        #[arg(long)]
        rpc: String,

        /// Endpoint acting as the injected wallet for chain switching
        #[arg(long)]
        injected_rpc: Option<String>,

        /// Disconnect again after a successful connection
        #[arg(long)]
        disconnect: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = WalletConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::ChainParams => {
            let params = AddEthereumChainParameter::from(&config.chain);
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Commands::Connect {
            rpc,
            injected_rpc,
            disconnect,
        } => {
            run_connect(config, rpc, injected_rpc, disconnect).await?;
        }
    }

    Ok(())
}

async fn run_connect(
    config: WalletConfig,
    rpc: String,
    injected_rpc: Option<String>,
    disconnect: bool,
) -> Result<()> {
    let store = WalletStore::new();
    store.subscribe(|action, state| {
        tracing::debug!(
            action = action.name(),
            connected = state.is_connected(),
            "Store updated"
        );
    });

    let mut connector = WalletConnector::new(
        config,
        store.clone(),
        Arc::new(JsonRpcSelectorFactory::new(rpc)),
        Arc::new(TracingAlertSink),
    )?;
    if let Some(url) = injected_rpc {
        connector = connector.with_injected(Arc::new(HttpTransport::from_url(&url)?));
    }

    match connector.connect().await {
        ConnectOutcome::Connected { account, chain_id } => {
            println!("Connected {} on chain {}", account, chain_id);
            if let Some(contract) = store.read().contract {
                println!("  Contract: {}", contract.address());
            }
        }
        ConnectOutcome::ChainSwitched { from } => {
            println!("Wallet switched from chain {}; connect again", from);
        }
        ConnectOutcome::ChainAdded { from } => {
            println!(
                "Target chain registered (wallet was on {}); connect again",
                from
            );
        }
        ConnectOutcome::SwitchPrompted { from } => {
            println!("Wallet is on chain {}; switch networks and retry", from);
        }
        ConnectOutcome::Failed(e) => {
            println!("Connection FAILED");
            println!("  Cause: {}", e);
        }
        ConnectOutcome::Busy => {
            println!("A connection attempt is already running");
        }
    }

    if disconnect {
        connector.disconnect().await;
        println!("Disconnected");
    }

    Ok(())
}
