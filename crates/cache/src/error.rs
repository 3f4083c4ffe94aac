use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("master call not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed feature file {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("failed to decode WAV {path}: {reason}")]
    WavDecode { path: String, reason: String },

    #[error(transparent)]
    Dsp(#[from] callcoach_dsp::DspError),
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl From<CacheError> for callcoach_core::EngineError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound(id) => callcoach_core::EngineError::FileNotFound(id),
            CacheError::Io { path, source } => {
                callcoach_core::EngineError::FileNotFound(format!("{path}: {source}"))
            }
            CacheError::Corrupt { path, reason } => {
                callcoach_core::EngineError::ProcessingError(format!("{path}: {reason}"))
            }
            CacheError::WavDecode { path, reason } => {
                callcoach_core::EngineError::FileNotFound(format!("{path}: {reason}"))
            }
            CacheError::Dsp(e) => callcoach_core::EngineError::ProcessingError(e.to_string()),
        }
    }
}
