//! Core data types shared across the call-coaching audio engine:
//! sample-level audio utilities, MFCC feature vectors/sequences, and the
//! closed error taxonomy at the engine boundary.

pub mod audio;
pub mod error;
pub mod mfcc;

pub use audio::{all_finite, downmix_to_mono, Sample};
pub use error::{EngineError, Result};
pub use mfcc::{MfccSequence, MfccVector};
