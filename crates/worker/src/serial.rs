//! Single dedicated worker that runs submitted jobs one at a time.
//!
//! Jobs are staged in an unbounded channel and executed by one dispatcher task
//! in submission order. Each job runs in its own child task that the dispatcher
//! awaits before taking the next one, so a panicking job fails only its own
//! handle and never the dispatcher.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::handle::{JobError, JobHandle};
use crate::join_ctrl::JoinCtrl;
use crate::token::SequenceClock;
use crate::{JobToken, TaskClass, join_error_panic_message};

type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One staged job: its token plus a type-erased runner that reports its own outcome.
struct Envelope {
	token: JobToken,
	run: Box<dyn FnOnce(JobToken) -> JobFuture + Send>,
}

/// Submission failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
	/// The worker was shut down and accepts no further jobs.
	#[error("worker is shut down")]
	ShutDown,
}

/// Dedicated single-task executor with strict FIFO job ordering.
pub struct SerialWorker {
	name: Arc<str>,
	tx: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
	root: CancellationToken,
	ids: SequenceClock,
	terminated: Arc<AtomicBool>,
	join: JoinCtrl,
}

impl SerialWorker {
	/// Starts a worker whose dispatcher task is labelled `name` in traces.
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		let name = name.into();
		let (tx, rx) = mpsc::unbounded_channel();
		let terminated = Arc::new(AtomicBool::new(false));
		let dispatcher = crate::spawn(TaskClass::Dispatcher, dispatch(Arc::clone(&name), rx, Arc::clone(&terminated)));

		Self {
			name,
			tx: Mutex::new(Some(tx)),
			root: CancellationToken::new(),
			ids: SequenceClock::new(),
			terminated,
			join: JoinCtrl::new(dispatcher),
		}
	}

	/// Queues a job behind every previously submitted one.
	///
	/// `task` receives the job's [`JobToken`] and is expected to observe it at
	/// its suspension points. Never blocks; fails once the worker is shut down.
	pub fn submit<F, Fut>(&self, task: F) -> Result<JobHandle<Fut::Output>, SubmitError>
	where
		F: FnOnce(JobToken) -> Fut + Send + 'static,
		Fut: Future + Send + 'static,
		Fut::Output: Send + 'static,
	{
		let mut guard = self.tx.lock();
		let Some(tx) = guard.as_ref() else {
			tracing::debug!(worker = %self.name, "worker.submit.rejected");
			return Err(SubmitError::ShutDown);
		};

		let token = JobToken::new(self.ids.next(), self.root.child_token());
		let (handle, completion) = JobHandle::new(token.clone());
		let run = Box::new(move |token: JobToken| -> JobFuture {
			Box::pin(async move {
				let outcome = if token.is_cancelled() {
					Err(JobError::Cancelled)
				} else {
					match crate::spawn(TaskClass::Job, task(token)).await {
						Ok(value) => Ok(value),
						Err(err) => Err(match join_error_panic_message(err) {
							Some(msg) => JobError::Panicked(msg),
							None => JobError::Abandoned,
						}),
					}
				};
				completion.complete(outcome);
			})
		});

		let job = token.id();
		if tx.send(Envelope { token, run }).is_err() {
			// Dispatcher died with its runtime; record that as shutdown plus termination.
			*guard = None;
			self.terminated.store(true, Ordering::Release);
			tracing::warn!(worker = %self.name, job, "worker.submit.dispatcher_gone");
			return Err(SubmitError::ShutDown);
		}
		tracing::trace!(worker = %self.name, job, "worker.submit");
		Ok(handle)
	}

	/// Stops accepting jobs. Already queued jobs still run.
	pub fn shutdown(&self) {
		if self.tx.lock().take().is_some() {
			tracing::debug!(worker = %self.name, "worker.shutdown");
		}
	}

	/// Stops accepting jobs and cancels every queued and running job.
	pub fn shutdown_now(&self) {
		self.shutdown();
		self.root.cancel();
		tracing::debug!(worker = %self.name, "worker.shutdown_now");
	}

	/// Returns true once [`Self::shutdown`] or [`Self::shutdown_now`] was called.
	pub fn is_shutdown(&self) -> bool {
		self.tx.lock().is_none()
	}

	/// Returns true once the dispatcher has exited after shutdown.
	pub fn is_terminated(&self) -> bool {
		self.terminated.load(Ordering::Acquire)
	}

	/// Waits up to `timeout` for the dispatcher to exit. Returns `true` if it did.
	///
	/// Only meaningful after shutdown; a live worker never exits on its own.
	pub async fn await_termination(&self, timeout: Duration) -> bool {
		self.join.join(Some(tokio::time::Instant::now() + timeout)).await
	}

	/// Shuts down, then waits for every queued job to finish.
	pub async fn close(&self) {
		self.shutdown();
		self.join.join(None).await;
	}
}

impl std::fmt::Debug for SerialWorker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SerialWorker")
			.field("name", &self.name)
			.field("shutdown", &self.is_shutdown())
			.field("terminated", &self.is_terminated())
			.finish()
	}
}

async fn dispatch(name: Arc<str>, mut rx: mpsc::UnboundedReceiver<Envelope>, terminated: Arc<AtomicBool>) {
	tracing::debug!(worker = %name, "worker.dispatch.start");
	while let Some(Envelope { token, run }) = rx.recv().await {
		let job = token.id();
		tracing::trace!(worker = %name, job, "worker.dispatch.job");
		run(token).await;
	}
	terminated.store(true, Ordering::Release);
	tracing::debug!(worker = %name, "worker.dispatch.exit");
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;

	#[tokio::test]
	async fn jobs_run_in_submission_order_without_overlap() {
		let worker = SerialWorker::new("test.order");
		let active = Arc::new(AtomicUsize::new(0));
		let log = Arc::new(Mutex::new(Vec::new()));

		let handles: Vec<_> = (0..5)
			.map(|i| {
				let active = Arc::clone(&active);
				let log = Arc::clone(&log);
				worker
					.submit(move |_| async move {
						assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0, "jobs overlapped");
						tokio::time::sleep(Duration::from_millis(5)).await;
						log.lock().push(i);
						active.fetch_sub(1, Ordering::SeqCst);
						i * 10
					})
					.unwrap()
			})
			.collect();

		let mut results = Vec::new();
		for handle in handles {
			results.push(handle.await.unwrap());
		}
		assert_eq!(results, vec![0, 10, 20, 30, 40]);
		assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
	}

	#[tokio::test]
	async fn submit_after_shutdown_is_rejected() {
		let worker = SerialWorker::new("test.reject");
		worker.shutdown();
		assert!(worker.is_shutdown());
		let err = worker.submit(|_| async {}).unwrap_err();
		assert_eq!(err, SubmitError::ShutDown);
	}

	#[tokio::test]
	async fn queued_jobs_finish_after_graceful_shutdown() {
		let worker = SerialWorker::new("test.graceful");
		let first = worker
			.submit(|_| async {
				tokio::time::sleep(Duration::from_millis(20)).await;
				1
			})
			.unwrap();
		let second = worker.submit(|_| async { 2 }).unwrap();

		worker.shutdown();
		assert!(worker.await_termination(Duration::from_secs(2)).await);
		assert!(worker.is_terminated());
		assert_eq!(first.await, Ok(1));
		assert_eq!(second.await, Ok(2));
	}

	#[tokio::test]
	async fn cancelled_before_start_never_runs() {
		let worker = SerialWorker::new("test.cancel_queued");
		let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
		let blocker = worker
			.submit(|_| async move {
				let _ = release_rx.await;
			})
			.unwrap();

		let ran = Arc::new(AtomicBool::new(false));
		let ran_flag = Arc::clone(&ran);
		let queued = worker
			.submit(move |_| async move {
				ran_flag.store(true, Ordering::SeqCst);
			})
			.unwrap();
		queued.cancel();
		let _ = release_tx.send(());

		assert_eq!(blocker.await, Ok(()));
		assert_eq!(queued.await, Err(JobError::Cancelled));
		assert!(!ran.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn running_job_observes_its_token() {
		let worker = SerialWorker::new("test.cancel_running");
		let handle = worker
			.submit(|token| async move {
				token.cancelled().await;
				"stopped"
			})
			.unwrap();
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!handle.is_finished());
		handle.cancel();
		assert_eq!(handle.await, Ok("stopped"));
	}

	#[tokio::test]
	async fn shutdown_now_cancels_running_and_queued_jobs() {
		let worker = SerialWorker::new("test.shutdown_now");
		let running = worker
			.submit(|token| async move {
				token.cancelled().await;
				true
			})
			.unwrap();
		let queued = worker.submit(|_| async { false }).unwrap();

		tokio::time::sleep(Duration::from_millis(10)).await;
		worker.shutdown_now();

		assert_eq!(running.await, Ok(true));
		assert_eq!(queued.await, Err(JobError::Cancelled));
		assert!(worker.await_termination(Duration::from_secs(1)).await);
	}

	#[tokio::test]
	async fn panicking_job_fails_only_its_handle() {
		let worker = SerialWorker::new("test.panic");
		let bad = worker
			.submit(|_| async {
				let missing: Option<u32> = None;
				missing.expect("job blew up")
			})
			.unwrap();
		let good = worker.submit(|_| async { 5 }).unwrap();

		match bad.await {
			Err(JobError::Panicked(msg)) => assert!(msg.contains("job blew up"), "got: {msg}"),
			other => panic!("expected panic outcome, got {other:?}"),
		}
		assert_eq!(good.await, Ok(5));
	}

	#[tokio::test]
	async fn wait_timeout_keeps_handle_usable() {
		let worker = SerialWorker::new("test.wait_timeout");
		let handle = worker
			.submit(|_| async {
				tokio::time::sleep(Duration::from_millis(50)).await;
				9
			})
			.unwrap();
		let handle = handle.wait_timeout(Duration::from_millis(5)).await.expect_err("job still sleeping");
		assert_eq!(handle.wait_timeout(Duration::from_secs(2)).await.ok(), Some(Ok(9)));
	}

	#[tokio::test]
	async fn await_termination_times_out_while_running() {
		let worker = SerialWorker::new("test.termination");
		assert!(!worker.await_termination(Duration::from_millis(10)).await);
		worker.close().await;
		assert!(worker.is_terminated());
	}

	#[test]
	fn dispatcher_lost_with_its_runtime_reads_as_terminated() {
		let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
		let worker = {
			let _enter = rt.enter();
			SerialWorker::new("test.runtime_gone")
		};
		drop(rt);
		assert!(!worker.is_shutdown());

		assert_eq!(worker.submit(|_| async {}).unwrap_err(), SubmitError::ShutDown);
		assert!(worker.is_shutdown());
		assert!(worker.is_terminated());
		assert_eq!(worker.submit(|_| async {}).unwrap_err(), SubmitError::ShutDown);
	}

	#[test]
	fn blocking_wait_from_plain_thread() {
		let worker = SerialWorker::new("test.blocking");
		let handle = worker.submit(|token| async move { token.id() }).unwrap();
		assert_eq!(handle.blocking_wait(), Ok(1));
	}
}
