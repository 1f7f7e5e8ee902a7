//! TensorBoard event-file writer

use std::path::{Path, PathBuf};

use tensorboard_rs::summary_writer::SummaryWriter;

use super::traits::{CallbackContext, TrainerCallback};
use super::writer::{Image, Writer};
use crate::error::Result;
use crate::logging::{default_sink, SharedSink};
use crate::paths;
use crate::train::handle::TrainerHandle;

/// Destination for TensorBoard summaries
///
/// Implemented for `tensorboard_rs`'s `SummaryWriter`; tests substitute a
/// recording sink.
pub trait EventSink: Send {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize);

    /// `rgb` is row-major interleaved RGB, `height * width * 3` bytes
    fn add_image(&mut self, tag: &str, rgb: &[u8], width: usize, height: usize, step: usize);

    fn flush(&mut self);
}

impl EventSink for SummaryWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) {
        SummaryWriter::add_scalar(self, tag, value, step);
    }

    fn add_image(&mut self, tag: &str, rgb: &[u8], width: usize, height: usize, step: usize) {
        // The library reads `dims[1]` as width and `dims[2]` as height
        SummaryWriter::add_image(self, tag, rgb, &[3, width, height], step);
    }

    fn flush(&mut self) {
        SummaryWriter::flush(self);
    }
}

/// Forwards every scalar and image straight to a TensorBoard event file
///
/// Values are tagged with the host's global step at the time of the call.
/// The event file is closed once at the end of training; later writes are
/// dropped with a warning.
pub struct TfEventWriter<S: EventSink = SummaryWriter> {
    save_dir: PathBuf,
    writer: Option<S>,
    sink: SharedSink,
    handle: TrainerHandle,
}

impl TfEventWriter<SummaryWriter> {
    /// Event writer under `<run_dir>/tensorboard`
    pub fn in_run_dir(run_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(run_dir.as_ref().join("tensorboard"))
    }

    /// Event writer saving into `save_dir`, created if missing
    pub fn new(save_dir: impl AsRef<Path>) -> Result<Self> {
        let save_dir = paths::makedir(save_dir)?;
        let writer = SummaryWriter::new(&save_dir);
        Ok(Self::with_event_sink(save_dir, writer))
    }
}

impl<S: EventSink> TfEventWriter<S> {
    /// Wrap an already opened event sink
    pub fn with_event_sink(save_dir: impl AsRef<Path>, writer: S) -> Self {
        Self {
            save_dir: paths::normalize(save_dir),
            writer: Some(writer),
            sink: default_sink(),
            handle: TrainerHandle::default(),
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Flush and release the event file; later calls do nothing
    pub fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.flush();
        }
    }

    fn open_writer(&mut self, tag: &str) -> Option<&mut S> {
        if self.writer.is_none() {
            self.sink.warn(&format!(
                "TensorBoard writer for {} is closed; dropping '{tag}'",
                self.save_dir.display()
            ));
        }
        self.writer.as_mut()
    }
}

impl<S: EventSink> TrainerCallback for TfEventWriter<S> {
    fn bind(&mut self, handle: TrainerHandle) {
        self.handle = handle;
    }

    fn on_train_end(&mut self, _ctx: &CallbackContext) {
        self.close();
    }

    fn name(&self) -> &'static str {
        "TfEventWriter"
    }
}

impl<S: EventSink> Writer for TfEventWriter<S> {
    fn handle(&self) -> &TrainerHandle {
        &self.handle
    }

    fn master_only(&self) -> bool {
        true
    }

    fn write_scalar(&mut self, name: &str, value: f64) {
        let step = self.handle.global_step();
        if let Some(writer) = self.open_writer(name) {
            writer.add_scalar(name, value as f32, step);
        }
    }

    fn write_image(&mut self, name: &str, image: &Image) {
        let step = self.handle.global_step();
        if let Some(writer) = self.open_writer(name) {
            writer.add_image(name, &image.to_rgb(), image.width(), image.height(), step);
        }
    }
}

impl<S: EventSink> Drop for TfEventWriter<S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::Rank;
    use crate::logging::{LogLevel, MemorySink};
    use crate::train::handle::StepCounters;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, PartialEq)]
    enum Event {
        Scalar(String, f32, usize),
        Image(String, Vec<u8>, usize, usize, usize),
        Flush,
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Event>>>);

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl EventSink for Recorder {
        fn add_scalar(&mut self, tag: &str, value: f32, step: usize) {
            self.0.lock().unwrap().push(Event::Scalar(tag.into(), value, step));
        }

        fn add_image(&mut self, tag: &str, rgb: &[u8], width: usize, height: usize, step: usize) {
            self.0.lock().unwrap().push(Event::Image(tag.into(), rgb.to_vec(), width, height, step));
        }

        fn flush(&mut self) {
            self.0.lock().unwrap().push(Event::Flush);
        }
    }

    fn recording_writer() -> (TfEventWriter<Recorder>, Recorder, MemorySink) {
        let recorder = Recorder::default();
        let sink = MemorySink::new();
        let writer = TfEventWriter::with_event_sink("runs/./x/tensorboard", recorder.clone())
            .with_sink(Arc::new(sink.clone()));
        (writer, recorder, sink)
    }

    #[test]
    fn test_scalars_tagged_with_global_step() {
        let (mut w, recorder, _) = recording_writer();
        let handle = TrainerHandle::default();
        w.bind(handle.clone());

        handle.set_counters(StepCounters { epoch_num: 1, global_step: 7, local_step: 7 });
        w.add_scalar("loss", 0.25);
        handle.advance_step();
        w.add_scalar("loss", 0.5);

        assert_eq!(
            recorder.events(),
            vec![
                Event::Scalar("loss".into(), 0.25, 7),
                Event::Scalar("loss".into(), 0.5, 8),
            ]
        );
    }

    #[test]
    fn test_images_forward_interleaved_rgb() {
        let (mut w, recorder, _) = recording_writer();
        let data: Vec<u8> = (0..3 * 2 * 4).collect();
        let img = Image::new(data, 3, 2, 4).unwrap();
        w.add_image("samples", &img);

        let events = recorder.events();
        let Event::Image(tag, rgb, width, height, step) = &events[0] else {
            panic!("expected an image event, got {events:?}");
        };
        assert_eq!((tag.as_str(), *width, *height, *step), ("samples", 4, 2, 0));
        assert_eq!(rgb, &img.to_rgb());
        assert_eq!(&rgb[..6], &[0, 8, 16, 1, 9, 17]);
    }

    #[test]
    fn test_gray_and_rgba_images_become_rgb() {
        let (mut w, recorder, _) = recording_writer();
        w.add_image("gray", &Image::new(vec![7; 4], 1, 2, 2).unwrap());
        w.add_image("rgba", &Image::new(vec![9; 16], 4, 2, 2).unwrap());

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        for event in events {
            let Event::Image(_, rgb, width, height, _) = event else {
                panic!("expected an image event");
            };
            assert_eq!(rgb.len(), width * height * 3);
        }
    }

    #[test]
    fn test_train_end_closes_exactly_once() {
        let (mut w, recorder, _) = recording_writer();
        let ctx = CallbackContext::default();
        w.on_train_end(&ctx);
        w.on_train_end(&ctx);
        w.close();
        assert!(w.is_closed());
        assert_eq!(recorder.events(), vec![Event::Flush]);
    }

    #[test]
    fn test_writes_after_close_are_dropped_with_warning() {
        let (mut w, recorder, sink) = recording_writer();
        w.on_train_end(&CallbackContext::default());
        recorder.events();

        w.add_scalar("loss", 1.0);
        assert!(recorder.events().is_empty());
        let warnings = sink.messages(LogLevel::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'loss'"));
    }

    #[test]
    fn test_non_master_writes_nothing() {
        let (mut w, recorder, _) = recording_writer();
        w.bind(TrainerHandle::new(Arc::new(Rank::new(1, 2))));
        w.add_scalar("loss", 1.0);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_save_dir_is_normalized() {
        let (w, _, _) = recording_writer();
        assert_eq!(w.save_dir(), Path::new("runs/x/tensorboard"));
        assert_eq!(w.name(), "TfEventWriter");
    }

    #[test]
    fn test_event_file_created_in_run_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut w = TfEventWriter::in_run_dir(tmp.path()).unwrap();
        w.add_scalar("loss", 1.0);
        w.on_train_end(&CallbackContext::default());

        let dir = tmp.path().join("tensorboard");
        assert_eq!(w.save_dir(), paths::normalize(&dir));
        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.contains("tfevents")), "{names:?}");
    }

    #[test]
    fn test_event_file_accepts_every_channel_count() {
        let tmp = tempfile::tempdir().unwrap();
        let mut w = TfEventWriter::in_run_dir(tmp.path()).unwrap();
        let gradient: Vec<u8> = (0..2 * 4).map(|v| v * 30).collect();

        w.add_image("gray", &Image::new(gradient.clone(), 1, 2, 4).unwrap());
        w.add_image("rgb", &Image::new(gradient.repeat(3), 3, 2, 4).unwrap());
        w.add_image("rgba", &Image::new(gradient.repeat(4), 4, 2, 4).unwrap());
        w.on_train_end(&CallbackContext::default());

        let dir = tmp.path().join("tensorboard");
        let size: u64 = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().metadata().unwrap().len())
            .sum();
        assert!(size > 0);
    }

    #[test]
    fn test_unwritable_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(TfEventWriter::new(blocker.join("tb")).is_err());
    }
}
