use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::JobToken;

/// Why a submitted job produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
	/// Cancelled before the dispatcher started it.
	#[error("job cancelled before it started")]
	Cancelled,
	/// The job panicked.
	#[error("job panicked: {0}")]
	Panicked(String),
	/// The dispatcher went away without reporting an outcome.
	#[error("job abandoned by its worker")]
	Abandoned,
}

/// Completion side shared between a [`JobHandle`] and the dispatcher.
pub(crate) struct Completion<R> {
	tx: oneshot::Sender<Result<R, JobError>>,
	finished: Arc<AtomicBool>,
}

impl<R> Completion<R> {
	pub(crate) fn complete(self, outcome: Result<R, JobError>) {
		self.finished.store(true, Ordering::Release);
		// The handle may have been dropped; the outcome is then discarded.
		let _ = self.tx.send(outcome);
	}
}

/// Awaitable, cancellable result of one submitted job.
///
/// Dropping the handle detaches it: the job still runs.
#[must_use = "dropping a job handle detaches the job"]
pub struct JobHandle<R> {
	token: JobToken,
	rx: oneshot::Receiver<Result<R, JobError>>,
	finished: Arc<AtomicBool>,
}

impl<R> JobHandle<R> {
	pub(crate) fn new(token: JobToken) -> (Self, Completion<R>) {
		let (tx, rx) = oneshot::channel();
		let finished = Arc::new(AtomicBool::new(false));
		let handle = Self {
			token,
			rx,
			finished: Arc::clone(&finished),
		};
		(handle, Completion { tx, finished })
	}

	/// Returns the job id assigned at submission.
	pub fn id(&self) -> u64 {
		self.token.id()
	}

	/// Requests cancellation of this job.
	///
	/// A job that has not started yet resolves with [`JobError::Cancelled`];
	/// a running job sees its token cancelled.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	/// Returns true once cancellation has been requested.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Returns true once an outcome is available.
	pub fn is_finished(&self) -> bool {
		self.finished.load(Ordering::Acquire)
	}

	/// Waits up to `timeout` for the outcome. On expiry the handle is given back.
	pub async fn wait_timeout(mut self, timeout: Duration) -> Result<Result<R, JobError>, Self> {
		match tokio::time::timeout(timeout, &mut self.rx).await {
			Ok(received) => Ok(received.unwrap_or(Err(JobError::Abandoned))),
			Err(_) => Err(self),
		}
	}

	/// Blocks the current thread until the outcome is available.
	///
	/// # Panics
	///
	/// Panics when called from inside an async runtime.
	pub fn blocking_wait(self) -> Result<R, JobError> {
		self.rx.blocking_recv().unwrap_or(Err(JobError::Abandoned))
	}
}

impl<R> Future for JobHandle<R> {
	type Output = Result<R, JobError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx).poll(cx).map(|received| received.unwrap_or(Err(JobError::Abandoned)))
	}
}

impl<R> std::fmt::Debug for JobHandle<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("JobHandle")
			.field("id", &self.id())
			.field("cancelled", &self.is_cancelled())
			.field("finished", &self.is_finished())
			.finish()
	}
}
