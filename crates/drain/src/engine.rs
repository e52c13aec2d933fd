use std::sync::Arc;
use std::time::Duration;

use sluice_worker::{SerialWorker, SubmitError};
use tracing::Instrument;

use crate::config::DrainConfig;
use crate::consumer::Consumer;
use crate::drain_loop::DrainLoop;
use crate::error::{DrainError, Result};
use crate::handle::DrainHandle;
use crate::latch::WakeLatch;
use crate::queue::WorkQueue;
use crate::settings::DrainSettings;
use crate::strategy::PollTimeout;

/// Drains a shared queue into a consumer on one dedicated worker.
///
/// Every [`drain`](Self::drain) call is queued behind the previous ones and
/// runs alone; calls never block the caller. Polling configuration can be
/// changed at any time and is picked up at the next poll cycle.
pub struct DrainEngine<T> {
	queue: Arc<dyn WorkQueue<T>>,
	consumer: Arc<dyn Consumer<T>>,
	settings: DrainSettings,
	worker: SerialWorker,
}

impl<T> DrainEngine<T>
where
	T: PartialEq + Send + 'static,
{
	/// Creates an engine with a non-blocking poll and no latch.
	pub fn new(queue: Arc<dyn WorkQueue<T>>, consumer: Arc<dyn Consumer<T>>) -> Self {
		Self {
			queue,
			consumer,
			settings: DrainSettings::new(),
			worker: SerialWorker::new("sluice.drain"),
		}
	}

	/// Creates an engine with settings taken from `config`.
	pub fn from_config(queue: Arc<dyn WorkQueue<T>>, consumer: Arc<dyn Consumer<T>>, config: &DrainConfig) -> Self {
		let engine = Self::new(queue, consumer);
		engine.settings.set_poll_timeout(config.poll_timeout);
		engine
	}

	/// Sets how long each poll may wait. A zero duration means "do not wait".
	pub fn set_poll_timeout(&self, timeout: impl Into<PollTimeout>) {
		self.settings.set_poll_timeout(timeout);
	}

	/// Makes polls wait until an item arrives, without any bound.
	pub fn clear_poll_timeout(&self) {
		self.settings.clear_poll_timeout();
	}

	pub fn poll_timeout(&self) -> PollTimeout {
		self.settings.poll_timeout()
	}

	/// Installs a latch. While set, polls wait on it instead of on a timeout
	/// and stop once it is sealed and the queue is empty.
	pub fn set_latch(&self, latch: Arc<dyn WakeLatch>) {
		self.settings.set_latch(latch);
	}

	pub fn clear_latch(&self) {
		self.settings.clear_latch();
	}

	pub fn latch(&self) -> Option<Arc<dyn WakeLatch>> {
		self.settings.latch()
	}

	/// Drains until the queue yields nothing or the drain is cancelled.
	///
	/// With an indefinite poll timeout and no latch this only ends on cancellation.
	pub fn drain(&self) -> Result<DrainHandle> {
		self.submit(None)
	}

	/// Like [`drain`](Self::drain), but also stops at the first item equal to
	/// `poison`, which is not passed to the consumer.
	pub fn drain_until(&self, poison: T) -> Result<DrainHandle> {
		self.submit(Some(poison))
	}

	fn submit(&self, poison: Option<T>) -> Result<DrainHandle> {
		let drain = DrainLoop::new(Arc::clone(&self.queue), Arc::clone(&self.consumer), self.settings.clone()).with_poison(poison);
		let handle = self
			.worker
			.submit(move |token| {
				let span = tracing::debug_span!("drain", job = token.id());
				drain.run(token.cancellation_token()).instrument(span)
			})
			.map_err(|SubmitError::ShutDown| DrainError::Rejected)?;
		Ok(DrainHandle::new(handle))
	}

	/// Rejects new drains. Drains already submitted still run.
	pub fn shutdown(&self) {
		self.worker.shutdown();
	}

	/// Rejects new drains and cancels every queued and running one.
	pub fn shutdown_now(&self) {
		self.worker.shutdown_now();
	}

	pub fn is_shutdown(&self) -> bool {
		self.worker.is_shutdown()
	}

	/// Returns true once shut down and every submitted drain has resolved.
	pub fn is_terminated(&self) -> bool {
		self.worker.is_terminated()
	}

	/// Waits up to `timeout` for termination after a shutdown. Returns `true` if terminated.
	pub async fn await_termination(&self, timeout: Duration) -> bool {
		self.worker.await_termination(timeout).await
	}

	/// Shuts down and waits for every submitted drain to resolve.
	pub async fn close(&self) {
		self.worker.close().await;
	}
}

impl<T> std::fmt::Debug for DrainEngine<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DrainEngine")
			.field("settings", &self.settings)
			.field("worker", &self.worker)
			.finish_non_exhaustive()
	}
}
