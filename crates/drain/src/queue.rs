//! Work queue boundary and an in-memory implementation.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

/// Blocking source of work items.
///
/// Every method is a suspension point and must be safe to cancel by dropping
/// the returned future: a dropped fetch must not lose an item.
#[async_trait]
pub trait WorkQueue<T>: Send + Sync
where
	T: Send + 'static,
{
	/// Waits without bound until an item is available.
	async fn take(&self) -> T;

	/// Removes the head item if one is present right now.
	async fn poll(&self) -> Option<T>;

	/// Waits up to `timeout` for an item.
	async fn poll_timeout(&self, timeout: Duration) -> Option<T>;
}

/// Unbounded FIFO queue shared between producers and a drainer.
pub struct MemoryQueue<T> {
	items: Mutex<VecDeque<T>>,
	available: Notify,
}

impl<T> Default for MemoryQueue<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> MemoryQueue<T> {
	/// Creates an empty queue.
	pub fn new() -> Self {
		Self {
			items: Mutex::new(VecDeque::new()),
			available: Notify::new(),
		}
	}

	/// Appends an item and wakes one waiting taker.
	pub async fn push(&self, item: T) {
		self.items.lock().await.push_back(item);
		self.available.notify_one();
	}

	/// Appends every item in order.
	pub async fn extend(&self, items: impl IntoIterator<Item = T>) {
		let mut queue = self.items.lock().await;
		let before = queue.len();
		queue.extend(items);
		let added = queue.len() - before;
		drop(queue);
		for _ in 0..added {
			self.available.notify_one();
		}
	}

	/// Returns current queue depth.
	pub async fn len(&self) -> usize {
		self.items.lock().await.len()
	}

	/// Returns true when no item is queued.
	pub async fn is_empty(&self) -> bool {
		self.items.lock().await.is_empty()
	}

	async fn recv(&self) -> T {
		loop {
			// Enabled before the emptiness check so a concurrent push is never missed.
			let notified = self.available.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();
			if let Some(item) = self.items.lock().await.pop_front() {
				return item;
			}
			notified.await;
		}
	}
}

#[async_trait]
impl<T> WorkQueue<T> for MemoryQueue<T>
where
	T: Send + 'static,
{
	async fn take(&self) -> T {
		self.recv().await
	}

	async fn poll(&self) -> Option<T> {
		self.items.lock().await.pop_front()
	}

	async fn poll_timeout(&self, timeout: Duration) -> Option<T> {
		tokio::time::timeout(timeout, self.recv()).await.ok()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	#[tokio::test]
	async fn fifo_order_is_preserved() {
		let queue = MemoryQueue::new();
		queue.extend([1u32, 2, 3]).await;
		queue.push(4).await;

		assert_eq!(queue.len().await, 4);
		assert_eq!(queue.poll().await, Some(1));
		assert_eq!(queue.take().await, 2);
		assert_eq!(queue.poll_timeout(Duration::from_millis(1)).await, Some(3));
		assert_eq!(queue.poll().await, Some(4));
		assert!(queue.is_empty().await);
	}

	#[tokio::test]
	async fn poll_on_empty_returns_immediately() {
		let queue: MemoryQueue<u32> = MemoryQueue::new();
		let started = tokio::time::Instant::now();
		assert_eq!(queue.poll().await, None);
		assert!(started.elapsed() < Duration::from_millis(50));
	}

	#[tokio::test]
	async fn poll_timeout_expires_on_empty_queue() {
		let queue: MemoryQueue<u32> = MemoryQueue::new();
		let started = tokio::time::Instant::now();
		assert_eq!(queue.poll_timeout(Duration::from_millis(30)).await, None);
		assert!(started.elapsed() >= Duration::from_millis(30));
	}

	#[tokio::test]
	async fn take_blocks_until_push() {
		let queue = Arc::new(MemoryQueue::new());

		let pending = tokio::time::timeout(Duration::from_millis(20), queue.take()).await;
		assert!(pending.is_err(), "take on empty should block");

		let taker = {
			let queue = Arc::clone(&queue);
			tokio::spawn(async move { queue.take().await })
		};
		tokio::time::sleep(Duration::from_millis(10)).await;
		queue.push("late").await;
		assert_eq!(taker.await.unwrap(), "late");
	}

	#[tokio::test]
	async fn push_before_take_is_not_lost() {
		let queue = MemoryQueue::new();
		queue.push(7u8).await;
		assert_eq!(tokio::time::timeout(Duration::from_millis(50), queue.take()).await, Ok(7));
	}

	#[tokio::test]
	async fn cancelled_take_does_not_swallow_an_item() {
		let queue = Arc::new(MemoryQueue::new());
		let abandoned = tokio::time::timeout(Duration::from_millis(10), queue.take()).await;
		assert!(abandoned.is_err());

		queue.push(1u32).await;
		assert_eq!(queue.poll().await, Some(1));
	}
}
