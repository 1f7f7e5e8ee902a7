//! Callback manager for dispatching events to callbacks and writers

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};
use super::writer::{Image, Writer};
use crate::error::Result;
use crate::train::handle::TrainerHandle;

enum Slot {
    Callback(Box<dyn TrainerCallback>),
    Writer(Box<dyn Writer>),
}

impl Slot {
    fn callback(&mut self) -> &mut dyn TrainerCallback {
        match self {
            Slot::Callback(cb) => cb.as_mut(),
            Slot::Writer(w) => w.as_mut(),
        }
    }

    fn writer(&mut self) -> Option<&mut dyn Writer> {
        match self {
            Slot::Writer(w) => Some(w.as_mut()),
            Slot::Callback(_) => None,
        }
    }
}

/// Manages callbacks and writers in registration order
///
/// Writers are callbacks too: they see every lifecycle event. In addition
/// they receive each scalar and image added through the manager, as well as
/// scalars that callbacks queue on the handle while being dispatched.
pub struct CallbackManager {
    slots: Vec<Slot>,
    handle: TrainerHandle,
}

impl CallbackManager {
    /// Create new callback manager bound to `handle`
    pub fn new(handle: TrainerHandle) -> Self {
        Self { slots: Vec::new(), handle }
    }

    /// Handle shared with every registered callback
    pub fn handle(&self) -> &TrainerHandle {
        &self.handle
    }

    /// Add a callback
    pub fn add<C: TrainerCallback + 'static>(&mut self, mut callback: C) {
        callback.bind(self.handle.clone());
        self.slots.push(Slot::Callback(Box::new(callback)));
    }

    /// Add a writer
    pub fn add_writer<W: Writer + 'static>(&mut self, writer: W) {
        self.add_boxed_writer(Box::new(writer));
    }

    /// Add an already boxed writer, e.g. one built from configuration
    pub fn add_boxed_writer(&mut self, mut writer: Box<dyn Writer>) {
        writer.bind(self.handle.clone());
        self.slots.push(Slot::Writer(writer));
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get number of callbacks and writers
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Callback(cb) => cb.name(),
                Slot::Writer(w) => w.name(),
            })
            .collect()
    }

    /// Record a scalar and hand it to every writer
    pub fn add_scalar(&mut self, name: &str, value: f64) {
        self.handle.record(name, value);
        for writer in self.slots.iter_mut().filter_map(Slot::writer) {
            writer.add_scalar(name, value);
        }
    }

    /// Hand an image to every writer
    pub fn add_image(&mut self, name: &str, image: &Image) {
        for writer in self.slots.iter_mut().filter_map(Slot::writer) {
            writer.add_image(name, image);
        }
    }

    fn deliver_emitted(&mut self) {
        for (name, value) in self.handle.drain_emitted() {
            self.add_scalar(&name, value);
        }
    }

    fn dispatch(
        &mut self,
        ctx: &CallbackContext,
        mut event: impl FnMut(&mut dyn TrainerCallback, &CallbackContext) -> CallbackAction,
    ) -> CallbackAction {
        for i in 0..self.slots.len() {
            let action = event(self.slots[i].callback(), ctx);
            self.deliver_emitted();
            if action != CallbackAction::Continue {
                return action;
            }
        }
        CallbackAction::Continue
    }

    /// Fire train begin event
    ///
    /// The first error aborts dispatch and is returned to the host.
    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> Result<CallbackAction> {
        for i in 0..self.slots.len() {
            let action = self.slots[i].callback().on_train_begin(ctx)?;
            self.deliver_emitted();
            if action == CallbackAction::Stop {
                return Ok(CallbackAction::Stop);
            }
        }
        Ok(CallbackAction::Continue)
    }

    /// Fire train end event
    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for i in 0..self.slots.len() {
            self.slots[i].callback().on_train_end(ctx);
            self.deliver_emitted();
        }
    }

    /// Fire epoch begin event
    pub fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(ctx, |cb, ctx| cb.on_epoch_begin(ctx))
    }

    /// Fire epoch end event
    pub fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        stop_only(self.dispatch(ctx, |cb, ctx| cb.on_epoch_end(ctx)))
    }

    /// Fire step begin event
    pub fn on_step_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        stop_only(self.dispatch(ctx, |cb, ctx| cb.on_step_begin(ctx)))
    }

    /// Fire step end event
    pub fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        stop_only(self.dispatch(ctx, |cb, ctx| cb.on_step_end(ctx)))
    }

    /// Fire an explicit trigger
    pub fn on_trigger(&mut self, ctx: &CallbackContext) -> CallbackAction {
        stop_only(self.dispatch(ctx, |cb, ctx| cb.on_trigger(ctx)))
    }
}

/// Outside of epoch begin, skipping has no meaning and is treated as continue
fn stop_only(action: CallbackAction) -> CallbackAction {
    match action {
        CallbackAction::Stop => CallbackAction::Stop,
        _ => CallbackAction::Continue,
    }
}

impl Default for CallbackManager {
    fn default() -> Self {
        Self::new(TrainerHandle::default())
    }
}
