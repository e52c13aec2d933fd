use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Ownership of the dispatcher's join handle.
enum JoinState {
	/// Nobody is joining; the next joiner takes the handle.
	Idle(JoinHandle<()>),
	/// One caller is awaiting the handle; the rest wait on `settled`.
	Joining,
	/// Dispatcher has exited.
	Exited,
}

/// Lets any number of callers wait for the dispatcher task to exit.
pub(crate) struct JoinCtrl {
	state: Mutex<JoinState>,
	settled: Notify,
}

impl JoinCtrl {
	pub(crate) fn new(handle: JoinHandle<()>) -> Self {
		Self {
			state: Mutex::new(JoinState::Idle(handle)),
			settled: Notify::new(),
		}
	}

	/// Waits for exit, or until `deadline` passes. Returns `true` once exited.
	pub(crate) async fn join(&self, deadline: Option<Instant>) -> bool {
		loop {
			let mut st = self.state.lock().await;
			let mut handle = match std::mem::replace(&mut *st, JoinState::Joining) {
				JoinState::Exited => {
					*st = JoinState::Exited;
					return true;
				}
				JoinState::Joining => {
					// Registered under the lock so the owner's notify_waiters() cannot slip past.
					let settled = self.settled.notified();
					drop(st);
					if !wait_until(settled, deadline).await {
						return false;
					}
					continue;
				}
				JoinState::Idle(handle) => handle,
			};
			drop(st);

			let exited = wait_until(&mut handle, deadline).await;
			*self.state.lock().await = if exited { JoinState::Exited } else { JoinState::Idle(handle) };
			self.settled.notify_waiters();
			return exited;
		}
	}
}

async fn wait_until<F: std::future::Future>(fut: F, deadline: Option<Instant>) -> bool {
	match deadline {
		None => {
			fut.await;
			true
		}
		Some(deadline) => tokio::time::timeout_at(deadline, fut).await.is_ok(),
	}
}
