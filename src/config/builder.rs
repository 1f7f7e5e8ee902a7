//! Build writers and savers from configuration

use super::schema::WritersConfig;
use crate::error::Result;
use crate::logging::SharedSink;
use crate::matching::NameMatcher;
use crate::train::callback::{ConsoleWriter, JsonWriter, ModelSaver, TfEventWriter, Writer};

impl WritersConfig {
    /// Build the enabled writers in console, TensorBoard, JSON order
    ///
    /// Directories are created eagerly; an invalid console pattern or an
    /// uncreatable directory fails the whole build.
    pub fn build_writers(&self, sink: SharedSink) -> Result<Vec<Box<dyn Writer>>> {
        let mut writers: Vec<Box<dyn Writer>> = Vec::new();

        if self.console.enabled {
            let matcher = NameMatcher::new(self.console.scalars.iter().cloned())?;
            writers.push(Box::new(ConsoleWriter::with_matcher(matcher).with_sink(sink.clone())));
        }

        if self.tensorboard.enabled {
            let dir = self
                .tensorboard
                .save_dir
                .clone()
                .unwrap_or_else(|| self.run_dir.join("tensorboard"));
            writers.push(Box::new(TfEventWriter::new(dir)?.with_sink(sink.clone())));
        }

        if self.json.enabled {
            let dir = self.json.save_dir.clone().unwrap_or_else(|| self.run_dir.join("summaries"));
            writers.push(Box::new(JsonWriter::new(dir)?.with_sink(sink.clone())));
        }

        Ok(writers)
    }

    /// Build the periodic checkpoint saver, if enabled
    pub fn build_model_saver(&self, sink: SharedSink) -> Result<Option<ModelSaver>> {
        if !self.checkpoint.enabled {
            return Ok(None);
        }
        let dir = self.checkpoint.dir.clone().unwrap_or_else(|| self.run_dir.join("checkpoints"));
        let saver = ModelSaver::new(dir)?
            .max_to_keep(self.checkpoint.max_to_keep)
            .with_sink(sink);
        Ok(Some(saver))
    }
}
