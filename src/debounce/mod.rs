//! Adaptive debounce: how long to wait before searching, and the timers
//! that enforce it.
//!
//! [`compute_delay`] is a pure function of the query, the typing speed and
//! the learned patterns. [`Scheduler`] implementations arm and cancel the
//! timers; the controller cancels the pending timer on every query change so
//! only the last one can fire.

mod delay;
mod scheduler;

pub use delay::{DebounceTuning, compute_delay};
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
