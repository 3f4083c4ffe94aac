//! Master-call feature cache: memory-resident MFCC sequences backed by a
//! `.mfc` disk tier and on-demand recompute from source WAV audio.

pub mod cache;
pub mod error;
pub mod mfc;
pub mod wav;

pub use cache::MasterCallCache;
pub use error::{CacheError, Result};
pub use mfc::{read_mfc, write_mfc, LoadedMfc};
pub use wav::{read_wav, DecodedWav};
