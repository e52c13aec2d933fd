#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Single-worker queue draining.
//!
//! A [`DrainEngine`] removes items from a shared [`WorkQueue`] and hands them to
//! a [`Consumer`] until the queue comes up empty, a poison pill arrives, or the
//! drain is cancelled. Each poll cycle picks one waiting discipline:
//! * a [`WakeLatch`], when installed, is awaited between non-blocking polls
//! * otherwise the [`PollTimeout`] selects an unbounded, bounded or immediate poll
//!
//! Drains run one at a time on a dedicated worker, in submission order, and
//! resolve through a cancellable [`DrainHandle`].

pub mod config;
mod consumer;
mod drain_loop;
mod engine;
pub mod error;
mod handle;
mod latch;
mod queue;
mod settings;
mod strategy;

pub use config::{ConfigError, DrainConfig};
pub use consumer::Consumer;
pub use drain_loop::DrainLoop;
pub use engine::DrainEngine;
pub use error::{DrainError, Result};
pub use handle::DrainHandle;
pub use latch::{SealableLatch, WakeLatch};
pub use queue::{MemoryQueue, WorkQueue};
pub use settings::DrainSettings;
pub use strategy::{PollStrategy, PollTimeout};
