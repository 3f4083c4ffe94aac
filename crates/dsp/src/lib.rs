//! DSP front end and frame-level analyzers for the call-coaching audio
//! engine: MFCC extraction, voice activity detection, pitch tracking, and
//! harmonic/cadence analysis.

pub mod cadence;
pub mod dct;
pub mod error;
pub mod fft;
pub mod harmonic;
pub mod mel;
pub mod mfcc;
pub mod pitch;
pub mod vad;

pub use cadence::{CadenceAnalyzer, CadenceProfile, SyllableInterval};
pub use error::{DspError, Result};
pub use fft::RealFft;
pub use harmonic::{HarmonicAnalyzer, HarmonicProfile};
pub use mel::MelFilterBank;
pub use mfcc::MfccExtractor;
pub use pitch::{PitchEstimate, PitchStatistics, PitchTracker, Vibrato};
pub use vad::{VadEvent, VadState, VoiceActivityDetector};
