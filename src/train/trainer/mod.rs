//! Trainer host for callbacks and writers
//!
//! The `Trainer` owns the step counters and drives the lifecycle:
//! - `before_train` / `after_train`
//! - `begin_epoch` / `trigger_epoch`
//! - `step` / `end_step`
//! - `trigger` for explicit mid-epoch flushes
//!
//! `train` runs the whole loop around a caller-supplied step closure.

mod core;
mod result;
mod train_loop;

pub use self::core::Trainer;
pub use result::TrainResult;
