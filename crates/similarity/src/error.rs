use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimilarityError {
    #[error("cannot compare an empty feature sequence")]
    EmptySequence,
    #[error("feature vectors have mismatched dimensionality: {lhs} vs {rhs}")]
    DimensionMismatch { lhs: usize, rhs: usize },
}

pub type Result<T> = std::result::Result<T, SimilarityError>;

impl From<SimilarityError> for callcoach_core::EngineError {
    fn from(err: SimilarityError) -> Self {
        match err {
            SimilarityError::EmptySequence => {
                callcoach_core::EngineError::InsufficientData(err.to_string())
            }
            SimilarityError::DimensionMismatch { .. } => {
                callcoach_core::EngineError::ProcessingError(err.to_string())
            }
        }
    }
}
