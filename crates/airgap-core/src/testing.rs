//! Test doubles shared by the core unit tests.

use airgap_account::{implementations::local::LocalWallet, AccountService};
use airgap_delivery::{DeliveryError, DeliveryInterface};
use airgap_types::{
	Address, ConfigSchema, Schema, SecretString, TransactionHash, ValidationError, B256,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Private key of the EIP-155 reference vector.
pub(crate) const TEST_KEY: &str =
	"0x4646464646464646464646464646464646464646464646464646464646464646";

/// Address of [`TEST_KEY`].
pub(crate) const SENDER: Address = Address::new([
	0x9d, 0x8a, 0x62, 0xf6, 0x56, 0xa8, 0xd1, 0x61, 0x5c, 0x12, 0x94, 0xfd, 0x71, 0xe9, 0xcf,
	0xb3, 0xe4, 0x85, 0x5a, 0x4f,
]);

pub(crate) fn test_account() -> Arc<AccountService> {
	let wallet = LocalWallet::from_private_key(&SecretString::from(TEST_KEY)).unwrap();
	Arc::new(AccountService::new(Box::new(wallet)))
}

struct NoConfig;

impl ConfigSchema for NoConfig {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Scriptable chain client.
pub(crate) struct FakeDelivery {
	pub gas_price: u128,
	pub base_fee: Option<u128>,
	pub fail_with: Option<String>,
	/// When set, submission waits for this to be notified.
	pub gate: Option<Arc<Notify>>,
	/// Notified once a submission has started.
	pub entered: Arc<Notify>,
	pub calls: AtomicUsize,
	pub submitted: Mutex<Vec<Vec<u8>>>,
}

impl Default for FakeDelivery {
	fn default() -> Self {
		Self {
			gas_price: 20_000_000_000,
			base_fee: Some(12_000_000_000),
			fail_with: None,
			gate: None,
			entered: Arc::new(Notify::new()),
			calls: AtomicUsize::new(0),
			submitted: Mutex::new(Vec::new()),
		}
	}
}

impl FakeDelivery {
	pub const NONCE: u64 = 42;
	pub const HASH: B256 = B256::repeat_byte(0xab);

	/// Number of calls made to the client.
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Raw transactions received, in order.
	pub fn submitted(&self) -> Vec<Vec<u8>> {
		self.submitted.lock().unwrap().clone()
	}

	fn record(&self) -> Result<(), DeliveryError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		match &self.fail_with {
			Some(message) => Err(DeliveryError::Network(message.clone())),
			None => Ok(()),
		}
	}
}

#[async_trait]
impl DeliveryInterface for FakeDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoConfig)
	}

	async fn get_nonce(&self, _address: &Address, _chain_id: u64) -> Result<u64, DeliveryError> {
		self.record()?;
		Ok(Self::NONCE)
	}

	async fn get_gas_price(&self, _chain_id: u64) -> Result<u128, DeliveryError> {
		self.record()?;
		Ok(self.gas_price)
	}

	async fn get_base_fee(&self, _chain_id: u64) -> Result<Option<u128>, DeliveryError> {
		self.record()?;
		Ok(self.base_fee)
	}

	async fn send_raw_transaction(
		&self,
		signed: &[u8],
		_chain_id: u64,
	) -> Result<TransactionHash, DeliveryError> {
		self.entered.notify_one();
		if let Some(gate) = &self.gate {
			gate.notified().await;
		}
		self.record()?;
		self.submitted.lock().unwrap().push(signed.to_vec());
		Ok(TransactionHash(Self::HASH))
	}
}
