//! Shared view of the host trainer
//!
//! Writers read step counters at the moment a scalar is added, not when the
//! next lifecycle event fires, so they keep a cloned `TrainerHandle` instead
//! of a snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::dist::{Distributed, SingleProcess};

/// Trainer progress counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounters {
    /// Current epoch (1-based once training starts)
    pub epoch_num: usize,
    /// Steps since training began
    pub global_step: usize,
    /// Steps since the current epoch began
    pub local_step: usize,
}

#[derive(Debug, Default)]
struct Counters {
    epoch_num: AtomicUsize,
    global_step: AtomicUsize,
    local_step: AtomicUsize,
}

/// Scalar observations keyed by name, as `(global_step, value)`
pub type ScalarHistory = HashMap<String, Vec<(usize, f64)>>;

/// Cloneable handle onto the host's live state
#[derive(Clone)]
pub struct TrainerHandle {
    counters: Arc<Counters>,
    dist: Arc<dyn Distributed>,
    history: Arc<Mutex<ScalarHistory>>,
    outbox: Arc<Mutex<Vec<(String, f64)>>>,
}

impl TrainerHandle {
    /// Handle for a process with the given role
    pub fn new(dist: Arc<dyn Distributed>) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            dist,
            history: Arc::new(Mutex::new(HashMap::new())),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Current counters
    pub fn counters(&self) -> StepCounters {
        StepCounters {
            epoch_num: self.counters.epoch_num.load(Ordering::Relaxed),
            global_step: self.counters.global_step.load(Ordering::Relaxed),
            local_step: self.counters.local_step.load(Ordering::Relaxed),
        }
    }

    pub fn global_step(&self) -> usize {
        self.counters.global_step.load(Ordering::Relaxed)
    }

    pub fn epoch_num(&self) -> usize {
        self.counters.epoch_num.load(Ordering::Relaxed)
    }

    pub fn local_step(&self) -> usize {
        self.counters.local_step.load(Ordering::Relaxed)
    }

    /// Overwrite all counters, e.g. when resuming
    pub fn set_counters(&self, counters: StepCounters) {
        self.counters.epoch_num.store(counters.epoch_num, Ordering::Relaxed);
        self.counters.global_step.store(counters.global_step, Ordering::Relaxed);
        self.counters.local_step.store(counters.local_step, Ordering::Relaxed);
    }

    /// Enter the next epoch: `epoch_num += 1`, `local_step = 0`
    pub fn advance_epoch(&self) {
        self.counters.epoch_num.fetch_add(1, Ordering::Relaxed);
        self.counters.local_step.store(0, Ordering::Relaxed);
    }

    /// Enter the next step: both step counters advance by one
    pub fn advance_step(&self) {
        self.counters.global_step.fetch_add(1, Ordering::Relaxed);
        self.counters.local_step.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether this process is the primary rank
    pub fn is_master(&self) -> bool {
        self.dist.is_master()
    }

    /// Distributed role of this process
    pub fn dist(&self) -> &dyn Distributed {
        self.dist.as_ref()
    }

    /// Record an observation at the current global step
    pub fn record(&self, name: &str, value: f64) {
        let step = self.global_step();
        if let Ok(mut history) = self.history.lock() {
            history.entry(name.to_string()).or_default().push((step, value));
        }
    }

    /// Full history of one scalar
    pub fn history(&self, name: &str) -> Vec<(usize, f64)> {
        self.history
            .lock()
            .ok()
            .and_then(|h| h.get(name).cloned())
            .unwrap_or_default()
    }

    /// Most recent observation of one scalar
    pub fn latest(&self, name: &str) -> Option<(usize, f64)> {
        self.history.lock().ok()?.get(name)?.last().copied()
    }

    /// Queue a scalar for delivery to every writer
    ///
    /// Callbacks cannot reach the writers while they are being dispatched;
    /// the manager drains this queue after each callback returns.
    pub fn emit_scalar(&self, name: impl Into<String>, value: f64) {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push((name.into(), value));
        }
    }

    /// Take everything queued with `emit_scalar`
    pub fn drain_emitted(&self) -> Vec<(String, f64)> {
        self.outbox.lock().map(|mut o| std::mem::take(&mut *o)).unwrap_or_default()
    }
}

impl Default for TrainerHandle {
    fn default() -> Self {
        Self::new(Arc::new(SingleProcess))
    }
}

impl std::fmt::Debug for TrainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainerHandle")
            .field("counters", &self.counters())
            .field("rank", &self.dist.rank())
            .field("world_size", &self.dist.world_size())
            .finish()
    }
}
