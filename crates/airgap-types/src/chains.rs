//! Static chain registry.
//!
//! Every chain the pipeline can build, sign, and broadcast for is described
//! here once. The table is immutable after first access and needs no locking;
//! a lookup miss is the recoverable "unsupported chain" condition rather than
//! a fault.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Immutable description of a supported chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainDescriptor {
	/// EIP-155 chain id, always greater than zero.
	pub id: u64,
	/// Human-readable network name.
	pub name: &'static str,
	/// Ticker of the native currency.
	pub native_symbol: &'static str,
	/// Decimal places of the native currency.
	pub native_decimals: u8,
	/// Base URL of the block explorer, if the chain has one.
	pub explorer_url: Option<&'static str>,
}

impl ChainDescriptor {
	/// Builds the explorer link for a transaction hash on this chain.
	pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
		self.explorer_url
			.map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
	}
}

const fn chain(
	id: u64,
	name: &'static str,
	native_symbol: &'static str,
	explorer_url: &'static str,
) -> ChainDescriptor {
	ChainDescriptor {
		id,
		name,
		native_symbol,
		native_decimals: 18,
		explorer_url: Some(explorer_url),
	}
}

static CHAINS: Lazy<BTreeMap<u64, ChainDescriptor>> = Lazy::new(|| {
	[
		chain(1, "Ethereum", "ETH", "https://etherscan.io"),
		chain(11155111, "Sepolia", "ETH", "https://sepolia.etherscan.io"),
		chain(137, "Polygon", "POL", "https://polygonscan.com"),
		chain(42161, "Arbitrum One", "ETH", "https://arbiscan.io"),
		chain(10, "OP Mainnet", "ETH", "https://optimistic.etherscan.io"),
		chain(8453, "Base", "ETH", "https://basescan.org"),
		chain(324, "zkSync Era", "ETH", "https://explorer.zksync.io"),
		chain(43114, "Avalanche", "AVAX", "https://snowtrace.io"),
		chain(56, "BNB Smart Chain", "BNB", "https://bscscan.com"),
		chain(250, "Fantom", "FTM", "https://ftmscan.com"),
		chain(100, "Gnosis", "xDAI", "https://gnosisscan.io"),
	]
	.into_iter()
	.map(|descriptor| (descriptor.id, descriptor))
	.collect()
});

/// Looks up a chain by id.
///
/// Returns `None` for unknown ids; callers surface that as an unsupported
/// chain error.
pub fn get_chain(chain_id: u64) -> Option<&'static ChainDescriptor> {
	CHAINS.get(&chain_id)
}

/// Returns true when the chain id is present in the registry.
pub fn is_supported_chain(chain_id: u64) -> bool {
	CHAINS.contains_key(&chain_id)
}

/// All supported chains ordered by chain id.
pub fn supported_chains() -> impl Iterator<Item = &'static ChainDescriptor> {
	CHAINS.values()
}

/// Display name for a chain, falling back to the bare id for unknown chains.
pub fn chain_name(chain_id: u64) -> String {
	get_chain(chain_id)
		.map(|c| c.name.to_string())
		.unwrap_or_else(|| format!("Chain ID: {}", chain_id))
}

/// Native currency ticker, falling back to "ETH" for unknown chains.
pub fn native_symbol(chain_id: u64) -> &'static str {
	get_chain(chain_id).map(|c| c.native_symbol).unwrap_or("ETH")
}

/// Explorer link for a transaction, if the chain is known and has an explorer.
pub fn explorer_tx_url(chain_id: u64, tx_hash: &str) -> Option<String> {
	get_chain(chain_id).and_then(|c| c.explorer_tx_url(tx_hash))
}
