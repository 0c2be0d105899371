//! Registry trait for self-registering implementations.
//!
//! Pluggable components (signing accounts, delivery providers) declare the
//! name they are configured under together with their factory function.

/// Base trait for implementation registries.
///
/// Each implementation module provides a Registry struct implementing this
/// trait, so the binary can map a configuration key to a constructor.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "local" for `signer.implementations.local`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
