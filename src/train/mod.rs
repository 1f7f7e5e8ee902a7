//! Training-loop host and its callbacks
//!
//! - `Trainer` owns the step counters and drives the lifecycle
//! - `callback` holds the hook trait, the writers and the checkpoint savers
//! - `TrainerHandle` is the shared view writers read counters from

pub mod callback;
mod handle;
mod trainer;

pub use callback::{
    BestSaver, CallbackAction, CallbackContext, CallbackManager, ConsoleWriter, Image, JsonWriter,
    ModelSaver, Mode, StateDict, SummaryRecord, TfEventWriter, TrainerCallback, Writer,
};
pub use handle::{ScalarHistory, StepCounters, TrainerHandle};
pub use trainer::{TrainResult, Trainer};
