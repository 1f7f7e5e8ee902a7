//! Declarative writer configuration
//!
//! A `WritersConfig` is read from YAML and turns into the writers and
//! checkpoint saver a trainer should run with.

mod builder;
mod schema;

pub use schema::{CheckpointSpec, ConsoleSpec, JsonSpec, TensorBoardSpec, WritersConfig};
