//! Error types for drain invocations.

use sluice_worker::JobError;
use thiserror::Error;

/// Why a drain invocation produced no count.
#[derive(Debug, Error)]
pub enum DrainError {
	/// Cancelled while polling or waiting on the latch.
	#[error("drain interrupted")]
	Interrupted,

	/// Cancelled before the worker started it.
	#[error("drain cancelled before it started")]
	Cancelled,

	/// The engine is shut down and accepts no further drains.
	#[error("drain rejected: engine is shut down")]
	Rejected,

	/// The consumer returned an error.
	#[error("consumer failed: {0:#}")]
	Consumer(anyhow::Error),

	/// The consumer panicked.
	#[error("consumer panicked: {0}")]
	Panicked(String),

	/// The worker went away without reporting an outcome.
	#[error("drain abandoned by its worker")]
	Abandoned,
}

impl DrainError {
	/// Returns true for failures caused by cancellation rather than by the consumer.
	pub fn is_cancellation(&self) -> bool {
		matches!(self, Self::Interrupted | Self::Cancelled)
	}
}

impl From<JobError> for DrainError {
	fn from(err: JobError) -> Self {
		match err {
			JobError::Cancelled => Self::Cancelled,
			JobError::Panicked(msg) => Self::Panicked(msg),
			JobError::Abandoned => Self::Abandoned,
		}
	}
}

/// Result type for drain invocations.
pub type Result<T> = std::result::Result<T, DrainError>;
