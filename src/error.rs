//! Pipeline error type.
//!
//! In-memory stages are total functions: once a pipeline is composed, the
//! only runtime failure is acquiring the text source. Everything else is
//! caught while parsing or validating the pipeline, before any stage runs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while composing or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The text source could not be opened or read.
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `collect_map` saw the same key twice.
    #[error("duplicate key '{key}' while collecting to map")]
    DuplicateKey { key: String },

    /// Malformed pipeline text.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The pipeline text contained no stages.
    #[error("pipeline is empty")]
    EmptyPipeline,

    /// A pipeline needs a source and at least one further stage.
    #[error("pipeline must have at least 2 stages")]
    TooFewStages,

    /// The first stage cannot produce records on its own.
    #[error("{stage} cannot be the first stage (try CONSOLE, LITERAL, or RANGE)")]
    InvalidSource { stage: &'static str },
}
