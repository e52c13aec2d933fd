/// Downstream sink for drained items.
///
/// Called synchronously on the drain worker, once per item, in queue order.
/// An error fails the current drain; the item is not retried.
pub trait Consumer<T>: Send + Sync {
	fn accept(&self, item: T) -> anyhow::Result<()>;
}

impl<T, F> Consumer<T> for F
where
	F: Fn(T) -> anyhow::Result<()> + Send + Sync,
{
	fn accept(&self, item: T) -> anyhow::Result<()> {
		self(item)
	}
}
