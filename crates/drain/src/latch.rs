//! Wake-latch boundary and a sealable implementation.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

/// Signal meaning "new data may be available", with a permanent sealed state.
#[async_trait]
pub trait WakeLatch: Send + Sync {
	/// Waits for the next signal, or returns at once when sealed.
	async fn wait(&self);

	/// Returns true once the latch is permanently closed. Never blocks.
	fn is_sealed(&self) -> bool;
}

/// Latch that remembers one pending signal and can be sealed for good.
///
/// A [`signal`](Self::signal) with no waiter is kept until the next
/// [`wait`](WakeLatch::wait) consumes it. [`seal`](Self::seal) wakes every
/// waiter and makes every later wait return immediately.
#[derive(Debug, Default)]
pub struct SealableLatch {
	sealed: AtomicBool,
	notify: Notify,
}

impl SealableLatch {
	/// Creates an open latch with no pending signal.
	pub fn new() -> Self {
		Self::default()
	}

	/// Wakes one waiter, or leaves a signal for the next one.
	pub fn signal(&self) {
		self.notify.notify_one();
	}

	/// Seals the latch and releases every waiter.
	pub fn seal(&self) {
		self.sealed.store(true, Ordering::Release);
		self.notify.notify_waiters();
		// Covers a waiter that checked the flag but has not parked yet.
		self.notify.notify_one();
		tracing::debug!("latch.sealed");
	}
}

#[async_trait]
impl WakeLatch for SealableLatch {
	async fn wait(&self) {
		let notified = self.notify.notified();
		tokio::pin!(notified);
		notified.as_mut().enable();
		if self.is_sealed() {
			return;
		}
		notified.await;
	}

	fn is_sealed(&self) -> bool {
		self.sealed.load(Ordering::Acquire)
	}
}
