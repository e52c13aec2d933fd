use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use sluice_worker::{JobError, JobHandle};

use crate::error::{DrainError, Result};

/// Pending or completed drain invocation.
///
/// Resolves to the number of items consumed. Dropping the handle does not
/// stop the drain; call [`cancel`](Self::cancel) for that.
#[must_use = "dropping a drain handle detaches the drain"]
#[derive(Debug)]
pub struct DrainHandle {
	inner: JobHandle<Result<u64>>,
}

impl DrainHandle {
	pub(crate) fn new(inner: JobHandle<Result<u64>>) -> Self {
		Self { inner }
	}

	/// Returns the invocation id, unique per engine and increasing in submission order.
	pub fn id(&self) -> u64 {
		self.inner.id()
	}

	/// Cancels the invocation.
	///
	/// A queued invocation resolves with [`DrainError::Cancelled`]; a running
	/// one is interrupted at its current wait and resolves with
	/// [`DrainError::Interrupted`].
	pub fn cancel(&self) {
		self.inner.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.is_cancelled()
	}

	/// Returns true once the outcome is available.
	pub fn is_finished(&self) -> bool {
		self.inner.is_finished()
	}

	/// Waits up to `timeout` for the drain to resolve. On expiry the handle is given back.
	pub async fn wait_timeout(self, timeout: Duration) -> std::result::Result<Result<u64>, Self> {
		match self.inner.wait_timeout(timeout).await {
			Ok(outcome) => Ok(flatten(outcome)),
			Err(inner) => Err(Self { inner }),
		}
	}

	/// Blocks the calling thread until the drain resolves.
	///
	/// # Panics
	///
	/// Panics when called from inside an async runtime.
	pub fn blocking_wait(self) -> Result<u64> {
		flatten(self.inner.blocking_wait())
	}
}

impl Future for DrainHandle {
	type Output = Result<u64>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.inner).poll(cx).map(flatten)
	}
}

fn flatten(outcome: std::result::Result<Result<u64>, JobError>) -> Result<u64> {
	outcome.map_err(DrainError::from)?
}
