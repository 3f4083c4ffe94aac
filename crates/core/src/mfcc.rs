//! MFCC feature vectors and sequences (spec §3).

use crate::error::{EngineError, Result};

/// One MFCC feature vector: `N'` cepstral coefficients produced from a
/// single frame.
pub type MfccVector = Vec<f32>;

/// An ordered, append-only list of feature vectors, all of identical
/// length. Owned either by a master-call cache entry (immutable after
/// publication) or by a session (append-only while active).
#[derive(Debug, Clone, Default)]
pub struct MfccSequence {
    num_coefficients: usize,
    frames: Vec<MfccVector>,
}

impl MfccSequence {
    /// An empty sequence that will accept vectors of `num_coefficients`
    /// length.
    pub fn new(num_coefficients: usize) -> Self {
        Self {
            num_coefficients,
            frames: Vec::new(),
        }
    }

    /// Build a sequence from already-computed frames, inferring the
    /// coefficient count from the first frame (or 0 if empty). All frames
    /// must share that length.
    pub fn from_frames(frames: Vec<MfccVector>) -> Result<Self> {
        let num_coefficients = frames.first().map(|f| f.len()).unwrap_or(0);
        if frames.iter().any(|f| f.len() != num_coefficients) {
            return Err(EngineError::ProcessingError(
                "MFCC frames in a sequence must share one coefficient count".into(),
            ));
        }
        Ok(Self {
            num_coefficients,
            frames,
        })
    }

    /// Append a feature vector, enforcing the fixed-length invariant.
    pub fn push(&mut self, vector: MfccVector) -> Result<()> {
        if self.frames.is_empty() && self.num_coefficients == 0 {
            self.num_coefficients = vector.len();
        }
        if vector.len() != self.num_coefficients {
            return Err(EngineError::ProcessingError(format!(
                "expected {} coefficients, got {}",
                self.num_coefficients,
                vector.len()
            )));
        }
        self.frames.push(vector);
        Ok(())
    }

    /// Number of coefficients per frame.
    pub fn num_coefficients(&self) -> usize {
        self.num_coefficients
    }

    /// Number of accumulated frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Borrow the accumulated frames in order.
    pub fn frames(&self) -> &[MfccVector] {
        &self.frames
    }

    /// Drop all accumulated frames, keeping the configured coefficient
    /// count for subsequent pushes.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
