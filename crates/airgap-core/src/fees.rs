//! Fee suggestions for the online device.
//!
//! Estimates are advisory: the builder never applies them on its own. The
//! user decides whether to copy a suggestion into the fee fields.

use crate::AirgapError;
use airgap_delivery::DeliveryService;
use airgap_types::{is_supported_chain, DynamicFee, FeeEstimate};
use std::sync::Arc;

/// Reads current network fees and proposes EIP-1559 values.
pub struct FeePolicyResolver {
	delivery: Arc<DeliveryService>,
	/// Tip added on top of the base fee, in wei.
	priority_fee: u128,
}

impl FeePolicyResolver {
	pub fn new(delivery: Arc<DeliveryService>, priority_fee: u128) -> Self {
		Self {
			delivery,
			priority_fee,
		}
	}

	/// Estimates base, priority and total fee for a chain.
	///
	/// Gas price and the latest block are read concurrently. Chains whose
	/// blocks carry no base fee use the gas price as the base.
	pub async fn estimate_fees(&self, chain_id: u64) -> Result<FeeEstimate, AirgapError> {
		if !is_supported_chain(chain_id) {
			return Err(AirgapError::UnsupportedChain(chain_id));
		}

		let (gas_price, base_fee) = tokio::try_join!(
			self.delivery.get_gas_price(chain_id),
			self.delivery.get_base_fee(chain_id)
		)
		.map_err(|e| AirgapError::FeeEstimationFailed(e.to_string()))?;

		let estimate = FeeEstimate::new(chain_id, base_fee.unwrap_or(gas_price), self.priority_fee);
		tracing::debug!(chain_id, %estimate, "Estimated fees");
		Ok(estimate)
	}
}

/// EIP-1559 pre-fill for an estimate: cap at the total, tip at the priority fee.
pub fn suggested_fee_spec(estimate: &FeeEstimate) -> Result<DynamicFee, AirgapError> {
	Ok(DynamicFee::new(estimate.total_fee, estimate.priority_fee)?)
}
