//! Per-cycle waiting discipline.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::latch::WakeLatch;
use crate::queue::WorkQueue;

/// How long one poll cycle may wait for an item when no latch is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "crate::config::PollTimeoutRepr")]
pub enum PollTimeout {
	/// Wait until an item exists, however long that takes.
	Indefinite,
	/// Wait at most this long. Only whole seconds count; anything under one
	/// second means "do not wait".
	Limit(Duration),
}

impl Default for PollTimeout {
	fn default() -> Self {
		Self::Limit(Duration::ZERO)
	}
}

impl From<Duration> for PollTimeout {
	fn from(timeout: Duration) -> Self {
		Self::Limit(timeout)
	}
}

/// Waiting discipline chosen once at the start of each poll cycle.
#[derive(Clone)]
pub enum PollStrategy {
	/// Poll, then alternate latch waits and polls until an item shows up or the latch is sealed.
	LatchDriven(Arc<dyn WakeLatch>),
	/// Block until an item exists.
	Indefinite,
	/// Block up to the given whole-second duration.
	Bounded(Duration),
	/// Take whatever is there right now.
	NonBlocking,
}

impl PollStrategy {
	/// Picks the discipline for one cycle. A latch always wins over the timeout.
	pub fn select(timeout: PollTimeout, latch: Option<Arc<dyn WakeLatch>>) -> Self {
		if let Some(latch) = latch {
			return Self::LatchDriven(latch);
		}
		match timeout {
			PollTimeout::Indefinite => Self::Indefinite,
			// Sub-second remainders are dropped, so 0 < timeout < 1s degrades to NonBlocking.
			PollTimeout::Limit(limit) if limit.as_secs() > 0 => Self::Bounded(Duration::from_secs(limit.as_secs())),
			PollTimeout::Limit(_) => Self::NonBlocking,
		}
	}

	/// Short name used in traces.
	pub fn name(&self) -> &'static str {
		match self {
			Self::LatchDriven(_) => "latch",
			Self::Indefinite => "indefinite",
			Self::Bounded(_) => "bounded",
			Self::NonBlocking => "non_blocking",
		}
	}

	/// Produces the next item, or `None` when this cycle found nothing.
	///
	/// Cancel by dropping the future; nothing here observes cancellation itself.
	pub async fn next<T>(&self, queue: &dyn WorkQueue<T>) -> Option<T>
	where
		T: Send + 'static,
	{
		match self {
			Self::LatchDriven(latch) => {
				let mut item = queue.poll().await;
				// A wake only says data may be there; a shared queue can be emptied by someone else first.
				while item.is_none() && !latch.is_sealed() {
					latch.wait().await;
					item = queue.poll().await;
				}
				item
			}
			Self::Indefinite => Some(queue.take().await),
			Self::Bounded(timeout) => queue.poll_timeout(*timeout).await,
			Self::NonBlocking => queue.poll().await,
		}
	}
}

impl std::fmt::Debug for PollStrategy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::LatchDriven(latch) => f.debug_struct("LatchDriven").field("sealed", &latch.is_sealed()).finish(),
			Self::Indefinite => f.write_str("Indefinite"),
			Self::Bounded(timeout) => f.debug_tuple("Bounded").field(timeout).finish(),
			Self::NonBlocking => f.write_str("NonBlocking"),
		}
	}
}
