//! Account management for the offline signer.
//!
//! This module defines the interface the offline device uses to learn its
//! sender address and to sign a transaction's signing hash. Implementations
//! only ever see the 32-byte hash; encoding and replay protection are applied
//! by the codec afterwards.

use airgap_types::{Address, ConfigSchema, ImplementationRegistry, Signature, B256};
use async_trait::async_trait;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a key or keystore is invalid, missing, or locked.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when the implementation is misconfigured.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for signing accounts.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the configuration schema for this account implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a 32-byte signing hash.
	///
	/// The returned signature carries a raw parity bit; chain-specific
	/// replay protection is not applied here.
	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError>;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service that manages account operations.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address associated with the managed account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a signing hash with the managed account.
	pub async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.implementation.sign_hash(hash).await
	}
}
