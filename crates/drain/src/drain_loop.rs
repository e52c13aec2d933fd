//! Consume-until-stopped loop for one drain invocation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::consumer::Consumer;
use crate::error::{DrainError, Result};
use crate::queue::WorkQueue;
use crate::settings::DrainSettings;

/// One drain invocation: polls, checks for the poison pill, and feeds the consumer.
pub struct DrainLoop<T> {
	queue: Arc<dyn WorkQueue<T>>,
	consumer: Arc<dyn Consumer<T>>,
	settings: DrainSettings,
	poison: Option<T>,
}

impl<T> DrainLoop<T>
where
	T: PartialEq + Send + 'static,
{
	pub fn new(queue: Arc<dyn WorkQueue<T>>, consumer: Arc<dyn Consumer<T>>, settings: DrainSettings) -> Self {
		Self {
			queue,
			consumer,
			settings,
			poison: None,
		}
	}

	/// Stops the loop, without consuming it, at the first item equal to `poison`.
	#[must_use]
	pub fn with_poison(mut self, poison: Option<T>) -> Self {
		self.poison = poison;
		self
	}

	/// Runs until the queue yields nothing, the poison pill arrives, or `cancel` fires.
	///
	/// Returns the number of items handed to the consumer. Cancellation and
	/// consumer errors fail the whole invocation; the partial count is dropped.
	pub async fn run(self, cancel: CancellationToken) -> Result<u64> {
		let mut consumed = 0u64;
		tracing::debug!(poisoned = self.poison.is_some(), "drain.start");

		loop {
			let strategy = self.settings.strategy();
			tracing::trace!(strategy = strategy.name(), "drain.poll");

			let next = tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					tracing::debug!(consumed, "drain.interrupted");
					return Err(DrainError::Interrupted);
				}
				next = strategy.next(self.queue.as_ref()) => next,
			};

			let Some(item) = next else {
				tracing::debug!(consumed, "drain.exhausted");
				return Ok(consumed);
			};
			if self.poison.as_ref() == Some(&item) {
				tracing::debug!(consumed, "drain.poisoned");
				return Ok(consumed);
			}

			if let Err(err) = self.consumer.accept(item) {
				tracing::warn!(consumed, error = %err, "drain.consumer_failed");
				return Err(DrainError::Consumer(err));
			}
			consumed += 1;
		}
	}
}
