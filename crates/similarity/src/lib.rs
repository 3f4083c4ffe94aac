//! Dynamic time warping similarity scoring between MFCC feature
//! sequences.

pub mod dtw;
pub mod error;

pub use dtw::{distance_to_similarity, dtw_distance, similarity};
pub use error::{Result, SimilarityError};
