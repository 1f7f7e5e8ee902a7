//! JSON writer persisting scalar summaries to `scalars.json`

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};
use super::writer::Writer;
use crate::error::{Result, WriterError};
use crate::logging::{default_sink, SharedSink};
use crate::paths;
use crate::train::handle::{StepCounters, TrainerHandle};

/// File name of the summary log inside the save directory
pub const SUMMARY_FILE: &str = "scalars.json";

/// Keys every record carries; a metric may not reuse them
pub const COUNTER_KEYS: [&str; 3] = ["epoch_num", "global_step", "local_step"];

/// One persisted scalar observation
///
/// Serialized flat: `{"epoch_num":1,"global_step":10,"local_step":2,"acc":0.9}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct SummaryRecord {
    pub epoch_num: usize,
    pub global_step: usize,
    pub local_step: usize,
    /// Metric name to value; one entry per record when written by `JsonWriter`
    #[serde(flatten)]
    pub scalars: BTreeMap<String, f64>,
}

/// On-disk shape; serde_json writes non-finite floats as `null`
#[derive(Deserialize)]
struct RawRecord {
    epoch_num: usize,
    global_step: usize,
    local_step: usize,
    #[serde(flatten)]
    scalars: BTreeMap<String, Option<f64>>,
}

impl From<RawRecord> for SummaryRecord {
    fn from(raw: RawRecord) -> Self {
        Self {
            epoch_num: raw.epoch_num,
            global_step: raw.global_step,
            local_step: raw.local_step,
            scalars: raw
                .scalars
                .into_iter()
                .map(|(name, value)| (name, value.unwrap_or(f64::NAN)))
                .collect(),
        }
    }
}

impl SummaryRecord {
    pub fn new(counters: StepCounters, name: impl Into<String>, value: f64) -> Self {
        Self {
            epoch_num: counters.epoch_num,
            global_step: counters.global_step,
            local_step: counters.local_step,
            scalars: BTreeMap::from([(name.into(), value)]),
        }
    }

    /// Value of `name` in this record
    pub fn get(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied()
    }
}

/// Appends one record per scalar and rewrites `scalars.json` on triggers
///
/// Records on every process, not only the primary one. At the start of
/// training an existing file replaces the in-memory list, so a resumed run
/// continues the same log.
pub struct JsonWriter {
    save_dir: PathBuf,
    save_path: PathBuf,
    summaries: Vec<SummaryRecord>,
    sink: SharedSink,
    handle: TrainerHandle,
}

impl JsonWriter {
    /// JSON writer under `<run_dir>/summaries`
    pub fn in_run_dir(run_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(run_dir.as_ref().join("summaries"))
    }

    /// JSON writer saving `scalars.json` into `save_dir`, created if missing
    pub fn new(save_dir: impl AsRef<Path>) -> Result<Self> {
        let save_dir = paths::makedir(save_dir)?;
        let save_path = save_dir.join(SUMMARY_FILE);
        Ok(Self {
            save_dir,
            save_path,
            summaries: Vec::new(),
            sink: default_sink(),
            handle: TrainerHandle::default(),
        })
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Full path of `scalars.json`
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// In-memory summary list
    pub fn summaries(&self) -> &[SummaryRecord] {
        &self.summaries
    }

    /// Replace the in-memory list with the file contents, if the file exists
    pub fn load(&mut self) -> Result<()> {
        self.summaries = Vec::new();
        if !self.save_path.exists() {
            return Ok(());
        }
        let file = File::open(&self.save_path).map_err(|e| {
            WriterError::io(format!("reading {}", self.save_path.display()), e)
        })?;
        self.summaries = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| WriterError::json(&self.save_path, e))?;
        Ok(())
    }

    /// Write the whole list to `scalars.json`
    pub fn save(&self) -> Result<()> {
        let context = || format!("saving {}", self.save_path.display());
        let file = File::create(&self.save_path).map_err(|e| WriterError::io(context(), e))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer(&mut out, &self.summaries)
            .map_err(|e| WriterError::json(&self.save_path, e))?;
        out.flush().map_err(|e| WriterError::io(context(), e))
    }

    /// Save, logging instead of propagating any failure
    fn trigger(&self) {
        if let Err(err) = self.save() {
            self.sink.exception(
                &format!("Error occurred when saving JSON file \"{}\".", self.save_path.display()),
                &err,
            );
        }
    }
}

impl TrainerCallback for JsonWriter {
    fn bind(&mut self, handle: TrainerHandle) {
        self.handle = handle;
    }

    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> Result<CallbackAction> {
        self.load()?;
        Ok(CallbackAction::Continue)
    }

    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        self.trigger();
        CallbackAction::Continue
    }

    fn on_trigger(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        self.trigger();
        CallbackAction::Continue
    }

    fn on_train_end(&mut self, _ctx: &CallbackContext) {
        self.trigger();
    }

    fn name(&self) -> &'static str {
        "JsonWriter"
    }
}

impl Writer for JsonWriter {
    fn handle(&self) -> &TrainerHandle {
        &self.handle
    }

    fn write_scalar(&mut self, name: &str, value: f64) {
        if COUNTER_KEYS.contains(&name) {
            self.sink.warn(&format!(
                "Scalar name '{name}' collides with a step counter; not recorded in {}",
                self.save_path.display()
            ));
            return;
        }
        self.summaries.push(SummaryRecord::new(self.handle.counters(), name, value));
    }
}

/// Read a summary file written by `JsonWriter`
pub fn read_summaries(path: impl AsRef<Path>) -> Result<Vec<SummaryRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| WriterError::io(format!("reading {}", path.display()), e))?;
    serde_json::from_str(&text).map_err(|e| WriterError::json(path, e))
}
