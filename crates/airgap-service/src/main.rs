//! Main entry point for the airgap command-line host.
//!
//! The same binary runs on both sides of the airgap. On the offline device
//! `sign` builds and signs a transaction and prints the handoff URL; on the
//! online device `broadcast` verifies that payload and submits it. The
//! remaining commands are read-only helpers.

use airgap_account::AccountFactory;
use airgap_core::AirgapFactories;
use airgap_delivery::DeliveryFactory;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Command-line arguments for the airgap host.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "AIRGAP_CONFIG", default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List the supported chains
	Chains,
	/// Build and sign a transaction (offline device)
	Sign(SignArgs),
	/// Show what a payload or handoff URL contains, without verifying it
	Inspect {
		/// Handoff URL, fragment or encoded payload; "-" reads stdin
		payload: String,
	},
	/// Verify a signed payload and submit it (online device)
	Broadcast {
		/// Handoff URL, fragment or encoded payload; "-" reads stdin
		payload: String,
		/// Submit without asking for confirmation
		#[arg(short, long)]
		yes: bool,
	},
	/// Read the next nonce for an address (online device)
	Nonce {
		#[arg(long)]
		chain_id: u64,
		#[arg(long)]
		address: String,
	},
	/// Suggest EIP-1559 fees from the latest block (online device)
	Fees {
		#[arg(long)]
		chain_id: u64,
	},
}

/// Transaction fields for `sign`. Fees are in Gwei, the amount in the
/// chain's native unit.
#[derive(clap::Args, Debug, Clone)]
struct SignArgs {
	#[arg(long)]
	chain_id: u64,
	#[arg(long)]
	to: String,
	#[arg(long, default_value = "0")]
	amount: String,
	/// Sender nonce; required because the offline device cannot read it
	#[arg(long)]
	nonce: Option<String>,
	#[arg(long)]
	gas_limit: Option<String>,
	/// Legacy gas price
	#[arg(long)]
	gas_price: Option<String>,
	/// EIP-1559 max fee per gas
	#[arg(long)]
	max_fee: Option<String>,
	/// EIP-1559 max priority fee per gas
	#[arg(long)]
	priority_fee: Option<String>,
	/// Calldata as 0x-prefixed hex
	#[arg(long)]
	data: Option<String>,
}

/// Main entry point for the airgap host.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));

	// stdout carries command output
	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	match args.command {
		Command::Chains => commands::chains(),
		Command::Sign(sign) => commands::sign(&args.config, sign).await,
		Command::Inspect { payload } => commands::inspect(&payload),
		Command::Broadcast { payload, yes } => {
			commands::broadcast(&args.config, &payload, yes).await
		},
		Command::Nonce { chain_id, address } => {
			commands::nonce(&args.config, chain_id, &address).await
		},
		Command::Fees { chain_id } => commands::fees(&args.config, chain_id).await,
	}
}

/// Factories for every implementation compiled into this binary.
fn factories() -> AirgapFactories<AccountFactory, DeliveryFactory> {
	AirgapFactories {
		account_factories: airgap_account::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		delivery_factories: airgap_delivery::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	}
}
