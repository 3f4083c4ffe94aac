//! Multi-tenant session manager and public API for the call-coaching
//! audio engine: binds master calls, streams audio chunks into per-session
//! MFCC/VAD state, and scores similarity against a bound master.

pub mod engine;
pub mod error;
pub mod session;

pub use engine::Engine;
pub use error::{EngineError, Result};
