//! `.mfc` feature file codec.
//!
//! Grounded on `HuntmasterAudioEngine::Impl::{loadFeaturesFromFile,
//! saveFeaturesToFile}`: a little binary layout of `u32 numFrames`,
//! `u32 numCoeffs`, followed by `numFrames * numCoeffs` raw `f32`s.
//! New files are written with a 4-byte magic and version ahead of those
//! two fields; readers accept both layouts so caches built before the
//! magic was introduced keep loading.

use std::io::{Read, Write};

use callcoach_config::constants::mfcc::NUM_COEFFICIENTS;
use callcoach_core::mfcc::{MfccSequence, MfccVector};

use crate::error::{CacheError, Result};

const MAGIC: &[u8; 4] = b"MFC1";
const VERSION: u32 = 1;

/// Upper bound on a `.mfc` file's declared `num_coefficients`, rejecting a
/// corrupt or adversarially crafted header before it is used to size an
/// allocation or a session's feature vectors.
const MAX_NUM_COEFFICIENTS: usize = 2 * NUM_COEFFICIENTS as usize;

fn io_err(path: &str, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_string(),
        source,
    }
}

fn corrupt(path: &str, reason: impl Into<String>) -> CacheError {
    CacheError::Corrupt {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Result of reading a `.mfc` file: the feature sequence, plus the sample
/// rate it was computed at when known (versioned files only — legacy
/// files predate the field and leave this `None`, so a caller falls back
/// to its own configured default).
pub struct LoadedMfc {
    pub sequence: MfccSequence,
    pub sample_rate: Option<u32>,
}

/// Serialize a sequence to the versioned `.mfc` layout.
pub fn write_mfc(path: &str, sequence: &MfccSequence, sample_rate: u32) -> Result<()> {
    let mut file = std::fs::File::create(path).map_err(|e| io_err(path, e))?;
    write_mfc_to(&mut file, sequence, sample_rate).map_err(|e| io_err(path, e))?;
    Ok(())
}

fn write_mfc_to(
    writer: &mut impl Write,
    sequence: &MfccSequence,
    sample_rate: u32,
) -> std::io::Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&sample_rate.to_le_bytes())?;
    let num_frames = sequence.len() as u32;
    let num_coefficients = sequence.num_coefficients() as u32;
    writer.write_all(&num_frames.to_le_bytes())?;
    writer.write_all(&num_coefficients.to_le_bytes())?;
    for frame in sequence.frames() {
        for &value in frame {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Read a `.mfc` file, accepting both the versioned (magic-prefixed) and
/// legacy (bare `numFrames`/`numCoeffs`) layouts.
pub fn read_mfc(path: &str) -> Result<LoadedMfc> {
    let mut file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| io_err(path, e))?;
    parse_mfc(path, &bytes)
}

fn parse_mfc(path: &str, bytes: &[u8]) -> Result<LoadedMfc> {
    let (body, sample_rate) = if bytes.len() >= 12 && &bytes[0..4] == MAGIC {
        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(corrupt(path, format!("unsupported .mfc version {version}")));
        }
        let sample_rate = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        (&bytes[12..], Some(sample_rate))
    } else {
        (&bytes[..], None)
    };

    if body.len() < 8 {
        return Err(corrupt(path, "truncated header"));
    }
    let num_frames = u32::from_le_bytes(body[0..4].try_into().unwrap()) as usize;
    let num_coefficients = u32::from_le_bytes(body[4..8].try_into().unwrap()) as usize;
    if num_frames == 0 || num_coefficients == 0 {
        return Err(corrupt(path, "zero frames or coefficients"));
    }
    if num_coefficients > MAX_NUM_COEFFICIENTS {
        return Err(corrupt(
            path,
            format!(
                "num_coefficients {num_coefficients} exceeds sanity bound of {MAX_NUM_COEFFICIENTS}"
            ),
        ));
    }

    let expected_len = 8 + num_frames * num_coefficients * 4;
    if body.len() < expected_len {
        return Err(corrupt(
            path,
            format!(
                "expected {} payload bytes, found {}",
                expected_len - 8,
                body.len() - 8
            ),
        ));
    }

    let mut frames: Vec<MfccVector> = Vec::with_capacity(num_frames);
    let mut offset = 8;
    for _ in 0..num_frames {
        let mut frame = Vec::with_capacity(num_coefficients);
        for _ in 0..num_coefficients {
            let value = f32::from_le_bytes(body[offset..offset + 4].try_into().unwrap());
            frame.push(value);
            offset += 4;
        }
        frames.push(frame);
    }

    let sequence = MfccSequence::from_frames(frames).map_err(|e| corrupt(path, e.to_string()))?;
    Ok(LoadedMfc {
        sequence,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sequence() -> MfccSequence {
        MfccSequence::from_frames(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn round_trips_through_versioned_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mfc");
        let path_str = path.to_str().unwrap();

        let seq = sample_sequence();
        write_mfc(path_str, &seq, 44_100).unwrap();
        let loaded = read_mfc(path_str).unwrap();

        assert_eq!(loaded.sample_rate, Some(44_100));
        assert_eq!(loaded.sequence.num_coefficients(), seq.num_coefficients());
        assert_eq!(loaded.sequence.frames(), seq.frames());
    }

    #[test]
    fn reads_legacy_headerless_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.mfc");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for value in [1.0f32, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();

        let loaded = read_mfc(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.sample_rate, None);
        assert_eq!(loaded.sequence.len(), 2);
        assert_eq!(loaded.sequence.frames()[0], vec![1.0, 2.0]);
        assert_eq!(loaded.sequence.frames()[1], vec![3.0, 4.0]);
    }

    #[test]
    fn rejects_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.mfc");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(&13u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        assert!(read_mfc(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = read_mfc("/nonexistent/path/does-not-exist.mfc");
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }

    #[test]
    fn rejects_num_coefficients_above_sanity_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge_coeffs.mfc");
        let bogus_coefficients = (MAX_NUM_COEFFICIENTS + 1) as u32;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&bogus_coefficients.to_le_bytes());
        for _ in 0..bogus_coefficients {
            bytes.extend_from_slice(&0f32.to_le_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            read_mfc(path.to_str().unwrap()),
            Err(CacheError::Corrupt { .. })
        ));
    }
}
