use super::config::ConfigError;
use crate::core::chem::ChemError;
use crate::core::io::tsv_writer::WriterError;
use crate::core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fragment store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("Failed to persist results: {source}")]
    Output {
        #[from]
        source: WriterError,
    },

    #[error("Query structure could not be prepared: {source}")]
    Query { source: ChemError },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Job {job} failed: {source}")]
    JobFailed {
        job: usize,
        source: Box<EngineError>,
    },

    #[error("Job {job} panicked: {message}")]
    JobPanicked { job: usize, message: String },

    #[error("Run was cancelled before all jobs reported back")]
    Cancelled,

    #[error("No search provider registered under '{0}'")]
    UnknownProvider(String),

    #[error("Remote search failed: {0}")]
    Remote(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Unwraps nested [`EngineError::JobFailed`] layers to the originating error.
    pub fn root_cause(&self) -> &EngineError {
        match self {
            EngineError::JobFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
