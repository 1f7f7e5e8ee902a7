//! Callback system for training events
//!
//! Provides extensible hooks for training loop events:
//! - `on_train_begin` / `on_train_end`
//! - `on_epoch_begin` / `on_epoch_end`
//! - `on_step_begin` / `on_step_end`
//! - `on_trigger`
//!
//! Writers are callbacks that also receive scalars and images:
//! - `ConsoleWriter` logs buffered scalars on each trigger
//! - `TfEventWriter` streams everything to TensorBoard event files
//! - `JsonWriter` keeps every scalar in `scalars.json`
//!
//! # Example
//!
//! ```rust
//! use entrenar_writers::train::callback::{TrainerCallback, CallbackContext, CallbackAction};
//!
//! struct PrintCallback;
//!
//! impl TrainerCallback for PrintCallback {
//!     fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
//!         println!("Epoch {} finished at step {}", ctx.epoch_num, ctx.global_step);
//!         CallbackAction::Continue
//!     }
//! }
//! ```

mod checkpoint;
mod console;
mod json;
mod manager;
mod tensorboard;
mod traits;
mod writer;

// Re-export all public types
pub use checkpoint::{BestSaver, ModelSaver, Mode, StateDict};
pub use console::{format_significant, ConsoleWriter};
pub use json::{read_summaries, JsonWriter, SummaryRecord, COUNTER_KEYS, SUMMARY_FILE};
pub use manager::CallbackManager;
pub use tensorboard::{EventSink, TfEventWriter};
pub use traits::{CallbackAction, CallbackContext, TrainerCallback};
pub use writer::{Image, Writer};
