//! Core traits and types for the callback system
//!
//! This module provides the foundational types for training callbacks:
//! - `CallbackContext` - State passed to callbacks
//! - `CallbackAction` - Actions a callback can request
//! - `TrainerCallback` - The trait all callbacks implement

use std::sync::Arc;

use crate::error::Result;
use crate::train::handle::{StepCounters, TrainerHandle};

/// Context passed to callbacks with current training state
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    /// Current epoch (1-based once the first epoch has begun)
    pub epoch_num: usize,
    /// Total epochs planned
    pub num_epochs: usize,
    /// Current step within epoch
    pub local_step: usize,
    /// Total steps in epoch
    pub steps_per_epoch: usize,
    /// Global step count
    pub global_step: usize,
    /// Training duration in seconds
    pub elapsed_secs: f64,
    /// Serialized model state, present on triggers when a model is attached
    pub state: Option<Arc<serde_json::Value>>,
}

impl CallbackContext {
    /// Counters carried by this context
    pub fn counters(&self) -> StepCounters {
        StepCounters {
            epoch_num: self.epoch_num,
            global_step: self.global_step,
            local_step: self.local_step,
        }
    }
}

/// Action to take after a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally
    Continue,
    /// Stop training
    Stop,
    /// Skip rest of current epoch
    SkipEpoch,
}

/// Trait for training callbacks
///
/// Implement this trait to hook into training events. All methods have
/// default no-op implementations, so you only need to implement the
/// events you care about.
pub trait TrainerCallback: Send {
    /// Attach the host trainer's live state
    ///
    /// Called once when the callback is registered.
    fn bind(&mut self, _handle: TrainerHandle) {}

    /// Called before training starts
    ///
    /// Errors here are fatal: the trainer does not start.
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        Ok(CallbackAction::Continue)
    }

    /// Called after training ends
    fn on_train_end(&mut self, _ctx: &CallbackContext) {}

    /// Called before each epoch
    fn on_epoch_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each epoch (the epoch trigger)
    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called before each training step
    fn on_step_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each training step
    fn on_step_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called on an explicit trigger requested by the host
    fn on_trigger(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Get callback name for logging
    fn name(&self) -> &'static str {
        "TrainerCallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_context_default() {
        let ctx = CallbackContext::default();
        assert_eq!(ctx.epoch_num, 0);
        assert_eq!(ctx.global_step, 0);
        assert!(ctx.state.is_none());
    }

    #[test]
    fn test_callback_action_clone_copy() {
        let action = CallbackAction::Continue;
        let cloned = action;
        assert_eq!(action, cloned);
        assert_ne!(CallbackAction::Stop, CallbackAction::SkipEpoch);
    }

    #[test]
    fn test_callback_context_counters() {
        let ctx = CallbackContext {
            epoch_num: 3,
            num_epochs: 10,
            local_step: 7,
            steps_per_epoch: 100,
            global_step: 207,
            ..Default::default()
        };
        assert_eq!(
            ctx.counters(),
            StepCounters { epoch_num: 3, global_step: 207, local_step: 7 }
        );
    }

    #[test]
    fn test_default_trainer_callback_impl() {
        struct MinimalCallback;
        impl TrainerCallback for MinimalCallback {
            fn name(&self) -> &'static str {
                "MinimalCallback"
            }
        }

        let mut cb = MinimalCallback;
        cb.bind(TrainerHandle::default());
        let ctx = CallbackContext::default();
        assert_eq!(cb.on_train_begin(&ctx).unwrap(), CallbackAction::Continue);
        assert_eq!(cb.on_epoch_begin(&ctx), CallbackAction::Continue);
        assert_eq!(cb.on_epoch_end(&ctx), CallbackAction::Continue);
        assert_eq!(cb.on_step_begin(&ctx), CallbackAction::Continue);
        assert_eq!(cb.on_step_end(&ctx), CallbackAction::Continue);
        assert_eq!(cb.on_trigger(&ctx), CallbackAction::Continue);
        cb.on_train_end(&ctx);
        assert_eq!(cb.name(), "MinimalCallback");
    }
}
