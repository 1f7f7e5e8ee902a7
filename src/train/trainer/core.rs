//! Core Trainer struct and lifecycle calls

use std::sync::Arc;
use std::time::Instant;

use crate::dist::Distributed;
use crate::error::Result;
use crate::train::callback::{
    CallbackAction, CallbackContext, CallbackManager, Image, StateDict, TrainerCallback, Writer,
};
use crate::train::handle::{StepCounters, TrainerHandle};

/// Host driving callbacks and writers through a training run
///
/// The trainer owns the step counters. Each lifecycle call updates them
/// first and then dispatches the matching event, so anything added during a
/// step is tagged with that step.
///
/// # Example
///
/// ```no_run
/// use entrenar_writers::train::{ConsoleWriter, JsonWriter, Trainer};
///
/// let mut trainer = Trainer::new();
/// trainer.add_writer(ConsoleWriter::default());
/// trainer.add_writer(JsonWriter::in_run_dir("runs/demo")?);
///
/// trainer.train(10, 100, |t| {
///     t.add_scalar("loss", 0.5);
///     Ok(())
/// })?;
/// # Ok::<(), entrenar_writers::WriterError>(())
/// ```
pub struct Trainer {
    pub(crate) handle: TrainerHandle,

    /// Callback manager
    pub(crate) callbacks: CallbackManager,

    /// Source of checkpoint state
    pub(crate) model: Option<Box<dyn StateDict + Send>>,

    pub(crate) num_epochs: usize,
    pub(crate) steps_per_epoch: usize,

    /// Training start time
    pub(crate) start_time: Option<Instant>,
}

impl Trainer {
    /// Create a single-process trainer
    pub fn new() -> Self {
        Self::with_handle(TrainerHandle::default())
    }

    /// Create a trainer for one process of a distributed run
    pub fn with_dist(dist: Arc<dyn Distributed>) -> Self {
        Self::with_handle(TrainerHandle::new(dist))
    }

    fn with_handle(handle: TrainerHandle) -> Self {
        Self {
            callbacks: CallbackManager::new(handle.clone()),
            handle,
            model: None,
            num_epochs: 0,
            steps_per_epoch: 0,
            start_time: None,
        }
    }

    /// Add a callback to the trainer
    pub fn add_callback<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    /// Add a writer to the trainer
    pub fn add_writer<W: Writer + 'static>(&mut self, writer: W) {
        self.callbacks.add_writer(writer);
    }

    /// Add writers built elsewhere, e.g. from configuration
    pub fn add_writers(&mut self, writers: impl IntoIterator<Item = Box<dyn Writer>>) {
        for writer in writers {
            self.callbacks.add_boxed_writer(writer);
        }
    }

    /// Attach the model whose state savers checkpoint
    pub fn set_model<M: StateDict + Send + 'static>(&mut self, model: M) {
        self.model = Some(Box::new(model));
    }

    /// Shared view of the counters and scalar history
    pub fn handle(&self) -> &TrainerHandle {
        &self.handle
    }

    pub fn counters(&self) -> StepCounters {
        self.handle.counters()
    }

    /// Restore counters, e.g. when resuming from a checkpoint
    pub fn set_counters(&mut self, counters: StepCounters) {
        self.handle.set_counters(counters);
    }

    /// Get reference to callback manager
    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    /// Get mutable reference to callback manager
    pub fn callbacks_mut(&mut self) -> &mut CallbackManager {
        &mut self.callbacks
    }

    /// Build callback context from current state
    pub(crate) fn build_context(&self) -> CallbackContext {
        let counters = self.handle.counters();
        CallbackContext {
            epoch_num: counters.epoch_num,
            num_epochs: self.num_epochs,
            local_step: counters.local_step,
            steps_per_epoch: self.steps_per_epoch,
            global_step: counters.global_step,
            elapsed_secs: self.start_time.map_or(0.0, |t| t.elapsed().as_secs_f64()),
            state: None,
        }
    }

    /// Context carrying a fresh state snapshot, for triggers
    fn trigger_context(&self) -> Result<CallbackContext> {
        let mut ctx = self.build_context();
        if let Some(model) = &self.model {
            ctx.state = Some(Arc::new(model.state_dict()?));
        }
        Ok(ctx)
    }

    /// Start of training
    ///
    /// Errors from callbacks, such as an unreadable summary file, abort the
    /// run before any step is taken.
    pub fn before_train(
        &mut self,
        num_epochs: usize,
        steps_per_epoch: usize,
    ) -> Result<CallbackAction> {
        self.num_epochs = num_epochs;
        self.steps_per_epoch = steps_per_epoch;
        self.start_time = Some(Instant::now());
        let ctx = self.build_context();
        self.callbacks.on_train_begin(&ctx)
    }

    /// Enter the next epoch: `epoch_num += 1`, `local_step = 0`
    pub fn begin_epoch(&mut self) -> CallbackAction {
        self.handle.advance_epoch();
        let ctx = self.build_context();
        self.callbacks.on_epoch_begin(&ctx)
    }

    /// Enter the next step: `global_step += 1`, `local_step += 1`
    pub fn step(&mut self) -> CallbackAction {
        self.handle.advance_step();
        let ctx = self.build_context();
        self.callbacks.on_step_begin(&ctx)
    }

    /// Finish the current step
    pub fn end_step(&mut self) -> CallbackAction {
        let ctx = self.build_context();
        self.callbacks.on_step_end(&ctx)
    }

    /// Record a scalar at the current counters
    pub fn add_scalar(&mut self, name: &str, value: f64) {
        self.callbacks.add_scalar(name, value);
    }

    /// Record an image at the current global step
    pub fn add_image(&mut self, name: &str, image: &Image) {
        self.callbacks.add_image(name, image);
    }

    /// End-of-epoch trigger
    pub fn trigger_epoch(&mut self) -> Result<CallbackAction> {
        let ctx = self.trigger_context()?;
        Ok(self.callbacks.on_epoch_end(&ctx))
    }

    /// Explicit trigger outside the epoch boundary
    pub fn trigger(&mut self) -> Result<CallbackAction> {
        let ctx = self.trigger_context()?;
        Ok(self.callbacks.on_trigger(&ctx))
    }

    /// End of training
    pub fn after_train(&mut self) {
        let ctx = self.build_context();
        self.callbacks.on_train_end(&ctx);
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}
