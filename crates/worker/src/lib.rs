#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Serial worker runtime primitives.
//!
//! This crate provides the execution substrate for queue drainers:
//! * [`SerialWorker`]: one dedicated task running submitted jobs strictly in order
//! * [`JobHandle`]: awaitable, cancellable outcome of one job
//! * [`JobToken`]: cooperative cancellation scoped to one job
//! * [`spawn`]: runtime entry that works inside or outside Tokio

mod class;
mod handle;
mod join_ctrl;
mod panic;
mod serial;
mod spawn;
mod token;

pub use class::TaskClass;
pub use handle::{JobError, JobHandle};
pub use panic::join_error_panic_message;
pub use serial::{SerialWorker, SubmitError};
pub use spawn::spawn;
pub use token::JobToken;
