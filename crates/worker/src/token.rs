use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic id source for submitted jobs.
#[derive(Debug, Default, Clone)]
pub(crate) struct SequenceClock {
	next: Arc<AtomicU64>,
}

impl SequenceClock {
	/// Creates a new clock whose first id is 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next job id.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Job-scoped cancellation token handed to every submitted job.
///
/// Cancellation is cooperative: a job observes it by racing its own suspension
/// points against [`JobToken::cancelled`].
#[derive(Debug, Clone)]
pub struct JobToken {
	id: u64,
	cancel: CancellationToken,
}

impl JobToken {
	pub(crate) fn new(id: u64, cancel: CancellationToken) -> Self {
		Self { id, cancel }
	}

	/// Returns the job id.
	pub const fn id(&self) -> u64 {
		self.id
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Returns the underlying cancellation token.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clock_starts_at_one_and_is_shared_across_clones() {
		let clock = SequenceClock::new();
		let other = clock.clone();
		assert_eq!(clock.next(), 1);
		assert_eq!(other.next(), 2);
		assert_eq!(clock.next(), 3);
	}

	#[test]
	fn cancelling_parent_reaches_job_token() {
		let root = CancellationToken::new();
		let token = JobToken::new(7, root.child_token());
		assert!(!token.is_cancelled());
		root.cancel();
		assert!(token.is_cancelled());
		assert_eq!(token.id(), 7);
	}
}
