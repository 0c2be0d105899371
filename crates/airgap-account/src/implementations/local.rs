//! Local signing account.
//!
//! Holds a secp256k1 key in memory, loaded either from a raw private key or
//! from an encrypted JSON keystore unlocked with a password. Intended for the
//! offline device only.

use crate::{AccountError, AccountInterface};
use airgap_types::{
	Address, ConfigSchema, Field, FieldType, Schema, SecretString, Signature, ValidationError,
	B256,
};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::path::Path;

/// Account backed by an in-memory private key.
#[derive(Debug)]
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex private key, with or without `0x`.
	pub fn from_private_key(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key.with_exposed(|key| {
			key.trim()
				.parse::<PrivateKeySigner>()
				.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))
		})?;
		Ok(Self { signer })
	}

	/// Decrypts an encrypted JSON keystore.
	///
	/// # Errors
	///
	/// Returns [`AccountError::InvalidKey`] if the file does not exist, is not
	/// a keystore, or the password is wrong.
	pub fn from_keystore(path: &Path, password: &SecretString) -> Result<Self, AccountError> {
		if !path.is_file() {
			return Err(AccountError::InvalidKey(format!(
				"Keystore not found at {}",
				path.display()
			)));
		}
		let signer = password
			.with_exposed(|pw| PrivateKeySigner::decrypt_keystore(path, pw))
			.map_err(|e| {
				AccountError::InvalidKey(format!(
					"Failed to decrypt keystore {}: {}",
					path.display(),
					e
				))
			})?;
		tracing::info!(address = %signer.address(), "Unlocked keystore");
		Ok(Self { signer })
	}
}

/// Configuration schema for the local account.
///
/// Exactly one key source is allowed: `private_key`, or `keystore_path`
/// together with `password`.
pub struct LocalWalletSchema;

impl LocalWalletSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		LocalWalletSchema.validate(config)
	}
}

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let non_empty = |value: &toml::Value| match value.as_str() {
			Some(s) if !s.trim().is_empty() => Ok(()),
			_ => Err("must not be empty".to_string()),
		};
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("private_key", FieldType::String).with_validator(non_empty),
				Field::new("keystore_path", FieldType::String).with_validator(non_empty),
				Field::new("password", FieldType::String),
			],
		);
		schema.validate(config)?;

		let has_key = config.get("private_key").is_some();
		let has_keystore = config.get("keystore_path").is_some();
		match (has_key, has_keystore) {
			(true, true) => Err(ValidationError::InvalidValue {
				field: "private_key".to_string(),
				message: "cannot be combined with keystore_path".to_string(),
			}),
			(false, false) => Err(ValidationError::MissingField(
				"private_key or keystore_path".to_string(),
			)),
			(false, true) if config.get("password").is_none() => {
				Err(ValidationError::MissingField("password".to_string()))
			},
			_ => Ok(()),
		}
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign hash: {}", e)))
	}
}

/// Factory function to create a local account from configuration.
///
/// # Parameters
/// - `config`: TOML table with either `private_key`, or `keystore_path` and
///   `password`
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema::validate_config(config)
		.map_err(|e| AccountError::Implementation(format!("Invalid configuration: {}", e)))?;

	let secret = |field: &str| {
		config
			.get(field)
			.and_then(|v| v.as_str())
			.map(SecretString::from)
	};

	let wallet = match (secret("private_key"), config.get("keystore_path").and_then(|v| v.as_str())) {
		(Some(private_key), _) => LocalWallet::from_private_key(&private_key)?,
		(None, Some(path)) => {
			let password = secret("password")
				.ok_or_else(|| AccountError::Implementation("password is required".to_string()))?;
			LocalWallet::from_keystore(Path::new(path), &password)?
		},
		(None, None) => {
			return Err(AccountError::Implementation(
				"private_key or keystore_path is required".to_string(),
			))
		},
	};

	Ok(Box::new(wallet))
}

/// Registry for the local account implementation.
pub struct Registry;

impl airgap_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}
