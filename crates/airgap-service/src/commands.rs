//! Command handlers.
//!
//! Results go to stdout as JSON, except `chains` and the human-readable
//! transaction summaries, so the output of `sign` can be piped straight into
//! a QR encoder or another tool.

use crate::{factories, SignArgs};
use airgap_config::Config;
use airgap_core::{suggested_fee_spec, AirgapError, Broadcaster, EngineBuilder, TransactionInput};
use airgap_types::{format_gwei, is_supported_chain, parse_address, supported_chains};
use serde_json::json;
use std::error::Error;
use std::io::{BufRead, Read, Write};
use std::path::Path;

type CommandResult = Result<(), Box<dyn Error>>;

impl From<SignArgs> for TransactionInput {
	fn from(args: SignArgs) -> Self {
		Self {
			to: args.to,
			amount: args.amount,
			gas_limit: args.gas_limit,
			gas_price: args.gas_price,
			max_fee_per_gas: args.max_fee,
			max_priority_fee_per_gas: args.priority_fee,
			data: args.data,
			nonce: args.nonce,
		}
	}
}

async fn load_builder(path: &Path) -> Result<EngineBuilder, Box<dyn Error>> {
	let path = path
		.to_str()
		.ok_or_else(|| AirgapError::Config(format!("Invalid config path: {}", path.display())))?;
	let config = Config::from_file(path).await?;
	tracing::info!(path = %path, "Loaded configuration");
	Ok(EngineBuilder::new(config))
}

/// Reads the payload argument, taking it from stdin when it is "-".
fn read_payload(arg: &str, mut stdin: impl Read) -> Result<String, Box<dyn Error>> {
	if arg != "-" {
		return Ok(arg.to_string());
	}
	let mut buf = String::new();
	stdin.read_to_string(&mut buf)?;
	Ok(buf.trim().to_string())
}

fn confirmed(answer: &str) -> bool {
	matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_json(value: &serde_json::Value) -> CommandResult {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

fn ensure_supported(chain_id: u64) -> Result<(), AirgapError> {
	if is_supported_chain(chain_id) {
		Ok(())
	} else {
		Err(AirgapError::UnsupportedChain(chain_id))
	}
}

pub fn chains() -> CommandResult {
	for chain in supported_chains() {
		println!("{:>10}  {:<16} {}", chain.id, chain.name, chain.native_symbol);
	}
	Ok(())
}

pub async fn sign(config: &Path, args: SignArgs) -> CommandResult {
	let builder = load_builder(config).await?;
	let signer = builder.build_signer(&factories()).await?;

	let chain_id = args.chain_id;
	let payload = signer.sign(&args.into(), chain_id).await?;
	let url = signer.handoff_url(&payload)?;
	let (_, details) = Broadcaster::inspect(&url)?;

	eprint!("{}", details);
	print_json(&json!({
		"handoffUrl": url,
		"payload": payload,
	}))
}

pub fn inspect(payload: &str) -> CommandResult {
	let raw = read_payload(payload, std::io::stdin())?;
	let (payload, details) = Broadcaster::inspect(&raw)?;

	print!("{}", details);
	if payload.signature.is_none() {
		println!("Unsigned:  inspection only, cannot be broadcast");
	}
	Ok(())
}

pub async fn broadcast(config: &Path, payload: &str, yes: bool) -> CommandResult {
	if payload == "-" && !yes {
		return Err("--yes is required when the payload is read from stdin".into());
	}
	let raw = read_payload(payload, std::io::stdin())?;

	let builder = load_builder(config).await?;
	let broadcaster = builder.build_broadcaster(&factories())?;
	let verified = broadcaster.prepare(&raw)?;
	let details = verified.details();

	eprint!("{}", details);
	if !yes {
		eprint!("Broadcast this transaction? [y/N] ");
		std::io::stderr().flush()?;
		let mut answer = String::new();
		std::io::stdin().lock().read_line(&mut answer)?;
		if !confirmed(&answer) {
			tracing::info!("Broadcast cancelled");
			return Ok(());
		}
	}

	let result = broadcaster.broadcast(&verified).await?;
	print_json(&json!({
		"result": result,
		"explorerUrl": details.explorer_url,
	}))
}

pub async fn nonce(config: &Path, chain_id: u64, address: &str) -> CommandResult {
	ensure_supported(chain_id)?;
	let address = parse_address(address).map_err(AirgapError::InvalidAddress)?;

	let builder = load_builder(config).await?;
	let delivery = builder.build_delivery(&factories())?;
	let nonce = delivery.get_nonce(chain_id, &address).await?;

	print_json(&json!({
		"chainId": chain_id,
		"address": address.to_checksum(None),
		"nonce": nonce,
	}))
}

pub async fn fees(config: &Path, chain_id: u64) -> CommandResult {
	let builder = load_builder(config).await?;
	let delivery = builder.build_delivery(&factories())?;
	let estimate = builder.build_fee_resolver(delivery).estimate_fees(chain_id).await?;
	let suggestion = suggested_fee_spec(&estimate)?;

	print_json(&json!({
		"chainId": chain_id,
		"baseFeeGwei": format_gwei(estimate.base_fee),
		"priorityFeeGwei": format_gwei(estimate.priority_fee),
		"totalFeeGwei": format_gwei(estimate.total_fee),
		"suggestion": {
			"maxFeePerGas": format_gwei(suggestion.max_fee_per_gas()),
			"maxPriorityFeePerGas": format_gwei(suggestion.max_priority_fee_per_gas()),
		},
	}))
}
