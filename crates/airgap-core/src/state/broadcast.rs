//! Broadcast state machine.
//!
//! The lock guards only the status bookkeeping and is never held across an
//! await. A submission gets a [`BroadcastTicket`] stamped with the session
//! epoch; abandoning the session bumps the epoch so a late answer for an old
//! ticket is dropped instead of overwriting the new session's state.

use airgap_types::{BroadcastResult, BroadcastStatus, TransactionHash};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur when driving a broadcast session.
#[derive(Debug, Error)]
pub enum BroadcastStateError {
	#[error("Invalid broadcast transition from {from} to {to}")]
	InvalidTransition {
		from: BroadcastStatus,
		to: BroadcastStatus,
	},
	#[error("A broadcast is already in progress")]
	InFlight,
	#[error("Transaction was already broadcast")]
	AlreadyBroadcast,
}

/// Static transition table - each state maps to allowed next states.
static TRANSITIONS: Lazy<HashMap<BroadcastStatus, HashSet<BroadcastStatus>>> = Lazy::new(|| {
	HashMap::from([
		(
			BroadcastStatus::Idle,
			HashSet::from([BroadcastStatus::Pending]),
		),
		(
			BroadcastStatus::Pending,
			HashSet::from([BroadcastStatus::Success, BroadcastStatus::Error]),
		),
		(BroadcastStatus::Error, HashSet::from([BroadcastStatus::Idle])),
		// terminal
		(BroadcastStatus::Success, HashSet::new()),
	])
});

fn is_valid_transition(from: BroadcastStatus, to: BroadcastStatus) -> bool {
	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

/// Proof that the holder started the current pending broadcast.
#[derive(Debug, PartialEq, Eq)]
pub struct BroadcastTicket {
	epoch: u64,
}

#[derive(Debug)]
struct SessionState {
	status: BroadcastStatus,
	epoch: u64,
	last_result: Option<BroadcastResult>,
}

impl SessionState {
	fn transition(&mut self, to: BroadcastStatus) -> Result<(), BroadcastStateError> {
		if !is_valid_transition(self.status, to) {
			return Err(BroadcastStateError::InvalidTransition {
				from: self.status,
				to,
			});
		}
		self.status = to;
		Ok(())
	}
}

/// One user's broadcast session.
#[derive(Debug)]
pub struct BroadcastSession {
	state: Mutex<SessionState>,
}

impl Default for BroadcastSession {
	fn default() -> Self {
		Self::new()
	}
}

impl BroadcastSession {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(SessionState {
				status: BroadcastStatus::Idle,
				epoch: 0,
				last_result: None,
			}),
		}
	}

	fn lock(&self) -> MutexGuard<'_, SessionState> {
		// Every update is a single assignment; a poisoned lock is still consistent.
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	pub fn status(&self) -> BroadcastStatus {
		self.lock().status
	}

	/// Outcome of the most recent completed attempt in this session.
	pub fn last_result(&self) -> Option<BroadcastResult> {
		self.lock().last_result.clone()
	}

	/// Moves the session to pending.
	///
	/// A failed session is reset to idle first, which is the user's retry.
	pub fn begin(&self) -> Result<BroadcastTicket, BroadcastStateError> {
		let mut state = self.lock();
		match state.status {
			BroadcastStatus::Pending => return Err(BroadcastStateError::InFlight),
			BroadcastStatus::Success => return Err(BroadcastStateError::AlreadyBroadcast),
			BroadcastStatus::Error => state.transition(BroadcastStatus::Idle)?,
			BroadcastStatus::Idle => {},
		}
		state.transition(BroadcastStatus::Pending)?;
		state.last_result = Some(BroadcastResult::pending());
		Ok(BroadcastTicket { epoch: state.epoch })
	}

	/// Records the outcome of the attempt identified by `ticket`.
	///
	/// Returns `None` when the ticket belongs to an abandoned session; the
	/// outcome is discarded.
	pub fn complete(
		&self,
		ticket: BroadcastTicket,
		outcome: Result<TransactionHash, String>,
	) -> Option<BroadcastResult> {
		let mut state = self.lock();
		if ticket.epoch != state.epoch {
			tracing::debug!(
				ticket_epoch = ticket.epoch,
				epoch = state.epoch,
				"Discarding result of abandoned broadcast"
			);
			return None;
		}

		let result = match outcome {
			Ok(hash) => BroadcastResult::success(hash),
			Err(detail) => BroadcastResult::failure(detail),
		};
		// Only the pending attempt of the current epoch holds a ticket.
		state.transition(result.status).ok()?;
		state.last_result = Some(result.clone());
		Some(result)
	}

	/// Clears a failed attempt so the user can retry.
	pub fn reset(&self) -> Result<(), BroadcastStateError> {
		let mut state = self.lock();
		state.transition(BroadcastStatus::Idle)?;
		state.last_result = None;
		Ok(())
	}

	/// Starts over with a fresh session; an in-flight answer is discarded.
	pub fn abandon(&self) {
		let mut state = self.lock();
		state.epoch += 1;
		state.status = BroadcastStatus::Idle;
		state.last_result = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use airgap_types::B256;

	fn hash() -> TransactionHash {
		TransactionHash(B256::repeat_byte(0x01))
	}

	#[test]
	fn test_success_path_is_terminal() {
		let session = BroadcastSession::new();
		let ticket = session.begin().unwrap();
		assert_eq!(session.status(), BroadcastStatus::Pending);

		let result = session.complete(ticket, Ok(hash())).unwrap();
		assert_eq!(result, BroadcastResult::success(hash()));
		assert_eq!(session.status(), BroadcastStatus::Success);

		assert!(matches!(
			session.begin(),
			Err(BroadcastStateError::AlreadyBroadcast)
		));
		assert!(session.reset().is_err());
	}

	#[test]
	fn test_second_begin_while_pending_rejected() {
		let session = BroadcastSession::new();
		let _ticket = session.begin().unwrap();
		assert!(matches!(session.begin(), Err(BroadcastStateError::InFlight)));
	}

	#[test]
	fn test_error_then_retry() {
		let session = BroadcastSession::new();
		let ticket = session.begin().unwrap();
		let result = session
			.complete(ticket, Err("insufficient funds".to_string()))
			.unwrap();
		assert_eq!(result.status, BroadcastStatus::Error);
		assert_eq!(result.error_detail.as_deref(), Some("insufficient funds"));

		let retry = session.begin().unwrap();
		assert_eq!(session.status(), BroadcastStatus::Pending);
		session.complete(retry, Ok(hash())).unwrap();
		assert_eq!(session.status(), BroadcastStatus::Success);
	}

	#[test]
	fn test_reset_only_from_error() {
		let session = BroadcastSession::new();
		assert!(matches!(
			session.reset(),
			Err(BroadcastStateError::InvalidTransition {
				from: BroadcastStatus::Idle,
				to: BroadcastStatus::Idle
			})
		));

		let ticket = session.begin().unwrap();
		session.complete(ticket, Err("boom".to_string()));
		session.reset().unwrap();
		assert_eq!(session.status(), BroadcastStatus::Idle);
		assert!(session.last_result().is_none());
	}

	#[test]
	fn test_abandoned_result_discarded() {
		let session = BroadcastSession::new();
		let stale = session.begin().unwrap();
		session.abandon();
		assert_eq!(session.status(), BroadcastStatus::Idle);

		assert!(session.complete(stale, Ok(hash())).is_none());
		assert_eq!(session.status(), BroadcastStatus::Idle);

		let fresh = session.begin().unwrap();
		assert!(session.complete(fresh, Ok(hash())).is_some());
	}
}
