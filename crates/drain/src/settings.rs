use std::sync::Arc;

use parking_lot::RwLock;

use crate::latch::WakeLatch;
use crate::strategy::{PollStrategy, PollTimeout};

#[derive(Default)]
struct SettingsState {
	poll_timeout: PollTimeout,
	latch: Option<Arc<dyn WakeLatch>>,
}

/// Live polling configuration shared by an engine and its in-flight drains.
///
/// Writes take effect at the start of the next poll cycle; a cycle already
/// waiting keeps the discipline it started with.
#[derive(Clone, Default)]
pub struct DrainSettings {
	state: Arc<RwLock<SettingsState>>,
}

impl DrainSettings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_poll_timeout(&self, timeout: impl Into<PollTimeout>) {
		self.state.write().poll_timeout = timeout.into();
	}

	/// Makes every later cycle wait without bound. Not the same as a zero timeout.
	pub fn clear_poll_timeout(&self) {
		self.state.write().poll_timeout = PollTimeout::Indefinite;
	}

	pub fn poll_timeout(&self) -> PollTimeout {
		self.state.read().poll_timeout
	}

	pub fn set_latch(&self, latch: Arc<dyn WakeLatch>) {
		self.state.write().latch = Some(latch);
	}

	pub fn clear_latch(&self) {
		self.state.write().latch = None;
	}

	pub fn latch(&self) -> Option<Arc<dyn WakeLatch>> {
		self.state.read().latch.clone()
	}

	/// Snapshots both fields under one read lock and picks the cycle's discipline.
	pub fn strategy(&self) -> PollStrategy {
		let state = self.state.read();
		PollStrategy::select(state.poll_timeout, state.latch.clone())
	}
}

impl std::fmt::Debug for DrainSettings {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.read();
		f.debug_struct("DrainSettings")
			.field("poll_timeout", &state.poll_timeout)
			.field("latch", &state.latch.is_some())
			.finish()
	}
}
