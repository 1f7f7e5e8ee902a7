//! Metric writers for training loops
//!
//! Writers are training callbacks that record scalars and images:
//! - `ConsoleWriter` logs the latest matching scalars on each trigger
//! - `TfEventWriter` streams every value to TensorBoard event files
//! - `JsonWriter` keeps a full history in `scalars.json`
//!
//! Checkpoint savers, a minimal `Trainer` host and a YAML configuration
//! layer round out the crate.
//!
//! # Example
//!
//! ```no_run
//! use entrenar_writers::{init_logging, default_sink, WritersConfig};
//! use entrenar_writers::train::Trainer;
//!
//! init_logging();
//! let config = WritersConfig::from_yaml_file("writers.yaml")?;
//!
//! let mut trainer = Trainer::new();
//! trainer.add_writers(config.build_writers(default_sink())?);
//! trainer.train(5, 100, |t| {
//!     t.add_scalar("train/loss", 0.25);
//!     Ok(())
//! })?;
//! # Ok::<(), entrenar_writers::WriterError>(())
//! ```

pub mod config;
pub mod dist;
pub mod error;
pub mod logging;
pub mod matching;
pub mod paths;
pub mod train;

pub use config::WritersConfig;
pub use dist::{Distributed, Rank, SingleProcess};
pub use error::{Result, WriterError};
pub use logging::{default_sink, init_logging, LogSink, MemorySink, SharedSink, TracingSink};
pub use matching::NameMatcher;
