//! WAV decoding for master-call source recordings, delegated to `hound`
//! (spec.md Non-goals explicitly excludes a hand-rolled codec).

use callcoach_core::{downmix_to_mono, Sample};

use crate::error::{CacheError, Result};

/// Decoded master-call audio: mono samples normalized to `[-1, 1]` plus
/// the file's native sample rate.
pub struct DecodedWav {
    pub samples: Vec<Sample>,
    pub sample_rate: u32,
}

pub fn read_wav(path: &str) -> Result<DecodedWav> {
    let mut reader = hound::WavReader::open(path).map_err(|e| CacheError::WavDecode {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let spec = reader.spec();

    let interleaved: Vec<Sample> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| CacheError::WavDecode {
                path: path.to_string(),
                reason: e.to_string(),
            })?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| CacheError::WavDecode {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?
        }
    };

    let samples = downmix_to_mono(&interleaved, spec.channels as usize);
    Ok(DecodedWav {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &std::path::Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_mono_int16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_test_wav(&path, 1, 16_000, &[0, 16384, -16384, 32767]);

        let decoded = read_wav(path.to_str().unwrap()).unwrap();
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.samples.len(), 4);
        assert!((decoded.samples[1] - 0.5).abs() < 0.01);
    }

    #[test]
    fn downmixes_stereo_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_test_wav(&path, 2, 8_000, &[32767, -32767, 0, 0]);

        let decoded = read_wav(path.to_str().unwrap()).unwrap();
        assert_eq!(decoded.samples.len(), 2);
        assert!(decoded.samples[0].abs() < 0.01);
    }

    #[test]
    fn missing_file_errors() {
        assert!(read_wav("/nonexistent/file.wav").is_err());
    }
}
