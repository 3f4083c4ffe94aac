//! DSP-local error taxonomy, converted into [`callcoach_core::EngineError`]
//! at the engine boundary.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DspError {
    #[error("signal too short for this operation: need at least {needed} samples, got {got}")]
    SignalTooShort { needed: usize, got: usize },

    #[error("FFT size must be a power of two, got {0}")]
    NotPowerOfTwo(usize),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("internal FFT failure: {0}")]
    FftFailure(String),
}

pub type Result<T> = std::result::Result<T, DspError>;

impl From<DspError> for callcoach_core::EngineError {
    fn from(err: DspError) -> Self {
        match err {
            DspError::SignalTooShort { .. } => {
                callcoach_core::EngineError::InsufficientData(err.to_string())
            }
            DspError::NotPowerOfTwo(_) | DspError::InvalidParameter(_) => {
                callcoach_core::EngineError::InvalidParams(err.to_string())
            }
            DspError::FftFailure(_) => callcoach_core::EngineError::ProcessingError(err.to_string()),
        }
    }
}
