//! Checkpoint callbacks saving model state on triggers
//!
//! - `ModelSaver` keeps the most recent `step-<N>.json` snapshots
//! - `BestSaver` keeps the snapshot with the best value of one scalar

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;
use serde::Serialize;

use super::console::format_significant;
use super::traits::{CallbackAction, CallbackContext, TrainerCallback};
use crate::error::{Result, WriterError};
use crate::logging::{default_sink, SharedSink};
use crate::paths;
use crate::train::handle::TrainerHandle;

/// Model state that can be checkpointed
pub trait StateDict {
    fn state_dict(&self) -> Result<serde_json::Value>;
}

impl<T: Serialize> StateDict for T {
    fn state_dict(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|source| WriterError::State { source })
    }
}

fn write_state(path: &Path, state: &serde_json::Value) -> Result<()> {
    let json = serde_json::to_string_pretty(state).map_err(|e| WriterError::json(path, e))?;
    fs::write(path, json).map_err(|e| WriterError::io(format!("writing {}", path.display()), e))
}

/// Save the trainer's state every trigger, keeping the newest files
///
/// Files are named `step-<global_step>.json`. Existing files in the
/// directory are picked up at the start of training so the retention limit
/// also covers earlier runs.
pub struct ModelSaver {
    checkpoint_dir: PathBuf,
    max_to_keep: usize,
    /// Oldest first: (modified, step, path)
    checkpoints: BinaryHeap<Reverse<(SystemTime, usize, PathBuf)>>,
    sink: SharedSink,
    handle: TrainerHandle,
}

impl ModelSaver {
    /// Saver writing into `<run_dir>/checkpoints`
    pub fn in_run_dir(run_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(run_dir.as_ref().join("checkpoints"))
    }

    /// Saver writing into `checkpoint_dir`, created if missing
    pub fn new(checkpoint_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            checkpoint_dir: paths::makedir(checkpoint_dir)?,
            max_to_keep: 10,
            checkpoints: BinaryHeap::new(),
            sink: default_sink(),
            handle: TrainerHandle::default(),
        })
    }

    /// Keep at most `max_to_keep` checkpoint files
    pub fn max_to_keep(mut self, max_to_keep: usize) -> Self {
        self.max_to_keep = max_to_keep;
        self
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    /// Path of the checkpoint for `global_step`
    pub fn checkpoint_path(&self, global_step: usize) -> PathBuf {
        self.checkpoint_dir.join(format!("step-{global_step}.json"))
    }

    /// Tracked checkpoint files, oldest first
    pub fn checkpoints(&self) -> Vec<PathBuf> {
        let mut entries: Vec<_> = self.checkpoints.iter().map(|Reverse(e)| e.clone()).collect();
        entries.sort();
        entries.into_iter().map(|(_, _, path)| path).collect()
    }

    fn add_checkpoint(&mut self, path: PathBuf, step: usize) {
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        // A second save at the same step overwrote the file; track it once
        self.checkpoints.retain(|Reverse((_, _, tracked))| *tracked != path);
        self.checkpoints.push(Reverse((modified, step, path)));

        while self.checkpoints.len() > self.max_to_keep {
            let Some(Reverse((_, _, oldest))) = self.checkpoints.pop() else {
                break;
            };
            if let Err(e) = fs::remove_file(&oldest) {
                let err = WriterError::io(format!("removing {}", oldest.display()), e);
                self.sink.exception(
                    &format!("Failed to remove checkpoint at {}.", oldest.display()),
                    &err,
                );
            }
        }
    }

    fn scan(&mut self) -> Result<()> {
        let pattern = Regex::new(r"^step-([0-9]+)\.json$").map_err(|source| WriterError::Pattern {
            pattern: "step-*.json".to_string(),
            source,
        })?;
        let entries = fs::read_dir(&self.checkpoint_dir).map_err(|e| {
            WriterError::io(format!("listing {}", self.checkpoint_dir.display()), e)
        })?;

        self.checkpoints.clear();
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                WriterError::io(format!("listing {}", self.checkpoint_dir.display()), e)
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(step) = pattern
                .captures(&name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<usize>().ok())
            {
                found.push((entry.path(), step));
            }
        }
        for (path, step) in found {
            self.add_checkpoint(path, step);
        }
        Ok(())
    }

    fn trigger(&mut self, ctx: &CallbackContext) {
        if !self.handle.is_master() {
            return;
        }
        let Some(state) = ctx.state.as_deref() else {
            self.sink.warn("No model state attached to the trainer; skipping checkpoint.");
            return;
        };

        let step = self.handle.global_step();
        let path = self.checkpoint_path(step);
        match write_state(&path, state) {
            Ok(()) => {
                self.sink.info(&format!("Checkpoint saved to {}.", path.display()));
                self.add_checkpoint(path, step);
            }
            Err(err) => self
                .sink
                .exception(&format!("Failed to save checkpoint to {}.", path.display()), &err),
        }
    }
}

impl TrainerCallback for ModelSaver {
    fn bind(&mut self, handle: TrainerHandle) {
        self.handle = handle;
    }

    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        self.scan()?;
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.trigger(ctx);
        CallbackAction::Continue
    }

    fn on_trigger(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.trigger(ctx);
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        "ModelSaver"
    }
}

/// Direction in which a monitored scalar improves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Min,
    Max,
}

impl Mode {
    pub fn suffix(self) -> &'static str {
        match self {
            Mode::Min => "min",
            Mode::Max => "max",
        }
    }

    fn improves(self, value: f64, best: f64) -> bool {
        match self {
            Mode::Min => value < best,
            Mode::Max => value > best,
        }
    }
}

/// Save the state whenever a monitored scalar reaches a new best
///
/// Looks at the latest observation of `key`; it is only considered when it
/// was recorded at the current global step. After every considered trigger
/// the best value so far is published as `<key>/min` or `<key>/max`.
pub struct BestSaver {
    key: String,
    mode: Mode,
    filename: Option<String>,
    checkpoint_dir: PathBuf,
    best: Option<(usize, f64)>,
    sink: SharedSink,
    handle: TrainerHandle,
}

impl BestSaver {
    pub fn new(key: impl Into<String>, mode: Mode, checkpoint_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            key: key.into(),
            mode,
            filename: None,
            checkpoint_dir: paths::makedir(checkpoint_dir)?,
            best: None,
            sink: default_sink(),
            handle: TrainerHandle::default(),
        })
    }

    /// Keep the state with the smallest value of `key`
    pub fn min(key: impl Into<String>, checkpoint_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(key, Mode::Min, checkpoint_dir)
    }

    /// Keep the state with the largest value of `key`
    pub fn max(key: impl Into<String>, checkpoint_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(key, Mode::Max, checkpoint_dir)
    }

    /// Override the default `<key>-<min|max>.json` file name
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Best `(global_step, value)` seen so far
    pub fn best(&self) -> Option<(usize, f64)> {
        self.best
    }

    pub fn save_path(&self) -> PathBuf {
        let filename = self.filename.clone().unwrap_or_else(|| {
            format!("{}-{}.json", self.key.replace('/', "-"), self.mode.suffix())
        });
        self.checkpoint_dir.join(filename)
    }

    fn trigger(&mut self, ctx: &CallbackContext) {
        let Some((step, value)) = self.handle.latest(&self.key) else {
            return;
        };
        if step != self.handle.global_step() {
            return;
        }

        let improved = self.best.is_none_or(|(_, best)| self.mode.improves(value, best));
        if improved {
            self.best = Some((step, value));
            self.save(ctx, value);
        }

        if let Some((_, best)) = self.best {
            self.handle.emit_scalar(format!("{}/{}", self.key, self.mode.suffix()), best);
        }
    }

    fn save(&self, ctx: &CallbackContext, value: f64) {
        if !self.handle.is_master() {
            return;
        }
        let Some(state) = ctx.state.as_deref() else {
            self.sink.warn("No model state attached to the trainer; skipping checkpoint.");
            return;
        };

        let path = self.save_path();
        match write_state(&path, state) {
            Ok(()) => self.sink.info(&format!(
                "Checkpoint saved to {} ({}={}).",
                path.display(),
                self.key,
                format_significant(value, 5)
            )),
            Err(err) => self.sink.exception(
                &format!("Failed to save best checkpoint to {}.", path.display()),
                &err,
            ),
        }
    }
}

impl TrainerCallback for BestSaver {
    fn bind(&mut self, handle: TrainerHandle) {
        self.handle = handle;
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.trigger(ctx);
        CallbackAction::Continue
    }

    fn on_trigger(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.trigger(ctx);
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Min => "MinSaver",
            Mode::Max => "MaxSaver",
        }
    }
}
