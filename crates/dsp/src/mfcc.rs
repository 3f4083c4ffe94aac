//! MFCC front-end: pre-emphasis, windowing, FFT, mel filtering, log, DCT,
//! and optional liftering, framed over a hop.

use std::collections::HashMap;

use callcoach_config::MfccConfig;
use callcoach_core::{MfccSequence, Sample};
use parking_lot::Mutex;

use crate::dct::{apply_lifter, Dct2};
use crate::error::{DspError, Result};
use crate::fft::RealFft;
use crate::mel::MelFilterBank;

/// Bound on the per-frame result cache before it is cleared and rebuilt,
/// mirroring the master-call cache's size-capped clear-all eviction.
const FRAME_CACHE_CAPACITY: usize = 512;

/// An MFCC extractor configured for one `(frame_size, hop_size,
/// num_coefficients, num_filters, sample_rate)` combination. Safe to share
/// across threads: the DSP tables are immutable after construction, and
/// the one piece of mutable state (the per-frame result cache) sits behind
/// its own lock, following the teacher's single-consolidated-lock pattern.
pub struct MfccExtractor {
    config: MfccConfig,
    window: Vec<f32>,
    fft: RealFft,
    mel: MelFilterBank,
    dct: Dct2,
    frame_cache: Mutex<HashMap<u64, Vec<f32>>>,
    prev_sample: Mutex<f32>,
}

impl MfccExtractor {
    pub fn new(config: MfccConfig) -> Result<Self> {
        if config.num_coefficients == 0 || config.num_coefficients > config.num_filters {
            return Err(DspError::InvalidParameter(
                "num_coefficients must be nonzero and at most num_filters".to_string(),
            ));
        }
        let fft = RealFft::new(config.frame_size)?;
        let mel = MelFilterBank::new(
            config.sample_rate,
            config.frame_size,
            config.num_filters,
            0.0,
        );
        let dct = Dct2::new(config.num_filters, config.num_coefficients);
        let window = hamming_window(config.frame_size);
        Ok(Self {
            config,
            window,
            fft,
            mel,
            dct,
            frame_cache: Mutex::new(HashMap::new()),
            prev_sample: Mutex::new(0.0),
        })
    }

    /// Clear the pre-emphasis filter's carried-over sample, starting the
    /// next `extract_frame`/`extract_sequence` call as if at the
    /// beginning of a sequence.
    pub fn reset(&self) {
        *self.prev_sample.lock() = 0.0;
    }

    pub fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.config.hop_size
    }

    pub fn num_coefficients(&self) -> usize {
        self.config.num_coefficients
    }

    /// Extract one MFCC vector from exactly `frame_size` samples. Frames
    /// that hash to an entry already in the per-extractor cache (repeated
    /// silence, looped test fixtures) skip the FFT/mel/DCT pipeline.
    pub fn extract_frame(&self, frame: &[Sample]) -> Result<Vec<f32>> {
        if frame.len() != self.config.frame_size {
            return Err(DspError::InvalidParameter(format!(
                "expected a frame of {} samples, got {}",
                self.config.frame_size,
                frame.len()
            )));
        }

        let prev_sample = *self.prev_sample.lock();
        let key = hash_frame(frame, prev_sample);
        if let Some(cached) = self.frame_cache.lock().get(&key) {
            *self.prev_sample.lock() = frame[frame.len() - 1];
            return Ok(cached.clone());
        }

        let emphasized = pre_emphasize(frame, self.config.pre_emphasis, prev_sample);
        *self.prev_sample.lock() = frame[frame.len() - 1];

        let mut windowed: Vec<f32> = emphasized
            .iter()
            .zip(self.window.iter())
            .map(|(s, w)| s * w)
            .collect();

        let power = self.fft.power_spectrum(&mut windowed)?;
        let filter_energies = self.mel.apply(&power);
        let log_energies: Vec<f32> = filter_energies
            .iter()
            .map(|&e| (e + callcoach_config::constants::mfcc::LOG_ENERGY_FLOOR).ln())
            .collect();

        let mut coefficients = self.dct.transform(&log_energies);
        apply_lifter(&mut coefficients, self.config.lifter_length);

        let mut cache = self.frame_cache.lock();
        if cache.len() >= FRAME_CACHE_CAPACITY {
            cache.clear();
        }
        cache.insert(key, coefficients.clone());

        Ok(coefficients)
    }

    /// Extract a full [`MfccSequence`] from a buffer, framing it at
    /// `(frame_size, hop_size)`. Any trailing samples that don't fill a
    /// complete frame are dropped. Treated as one independent sequence:
    /// the pre-emphasis filter state starts fresh at `0.0` regardless of
    /// any prior `extract_frame`/`extract_sequence` call on this
    /// extractor.
    pub fn extract_sequence(&self, samples: &[Sample]) -> Result<MfccSequence> {
        self.reset();
        let mut seq = MfccSequence::new(self.config.num_coefficients);
        if samples.len() < self.config.frame_size {
            return Ok(seq);
        }
        let mut start = 0;
        while start + self.config.frame_size <= samples.len() {
            let frame = &samples[start..start + self.config.frame_size];
            let coefficients = self.extract_frame(frame)?;
            seq.push(coefficients)
                .map_err(|e| DspError::InvalidParameter(e.to_string()))?;
            start += self.config.hop_size;
        }
        Ok(seq)
    }
}

/// FNV-1a over each sample's raw bit pattern plus the carried-over
/// pre-emphasis sample. A cache key, not a content digest: two distinct
/// frames hashing alike would share a cache slot, an accepted risk for a
/// bounded performance cache over a correctness path. The carried-over
/// sample must be folded in since it is part of the pre-emphasis input,
/// not just the frame's own bytes.
fn hash_frame(frame: &[Sample], prev_sample: f32) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &sample in frame.iter().chain(std::iter::once(&prev_sample)) {
        for byte in sample.to_bits().to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    hash
}

/// First-order pre-emphasis filter, `y[n] = x[n] - alpha * x[n-1]`, with
/// `x[-1]` carried over from the previous call as `prev_sample` so the
/// filter state persists across frames within the same sequence.
fn pre_emphasize(frame: &[Sample], alpha: f32, prev_sample: f32) -> Vec<f32> {
    if frame.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(frame.len());
    out.push(frame[0] - alpha * prev_sample);
    for i in 1..frame.len() {
        out.push(frame[i] - alpha * frame[i - 1]);
    }
    out
}

fn hamming_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|n| {
            0.54 - 0.46 * (2.0 * std::f32::consts::PI * n as f32 / (size - 1) as f32).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MfccConfig {
        MfccConfig {
            frame_size: 512,
            hop_size: 256,
            num_coefficients: 13,
            num_filters: 26,
            pre_emphasis: 0.97,
            lifter_length: 22,
            sample_rate: 44_100,
        }
    }

    fn sine_wave(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * std::f32::consts::PI * freq * n as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn extract_frame_produces_requested_coefficient_count() {
        let extractor = MfccExtractor::new(test_config()).unwrap();
        let frame = sine_wave(440.0, 44_100, 512);
        let coeffs = extractor.extract_frame(&frame).unwrap();
        assert_eq!(coeffs.len(), 13);
    }

    #[test]
    fn extract_frame_rejects_wrong_length() {
        let extractor = MfccExtractor::new(test_config()).unwrap();
        assert!(extractor.extract_frame(&vec![0.0; 100]).is_err());
    }

    #[test]
    fn extract_sequence_frames_with_correct_hop() {
        let extractor = MfccExtractor::new(test_config()).unwrap();
        let samples = sine_wave(440.0, 44_100, 512 + 256 * 3);
        let seq = extractor.extract_sequence(&samples).unwrap();
        // frames at offsets 0, 256, 512, 768 all fit within len (512+768=1280)
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.num_coefficients(), 13);
    }

    #[test]
    fn extract_sequence_on_short_buffer_is_empty() {
        let extractor = MfccExtractor::new(test_config()).unwrap();
        let samples = vec![0.0f32; 100];
        let seq = extractor.extract_sequence(&samples).unwrap();
        assert!(seq.is_empty());
    }

    #[test]
    fn deterministic_across_calls() {
        let extractor = MfccExtractor::new(test_config()).unwrap();
        let frame = sine_wave(220.0, 44_100, 512);
        let a = extractor.extract_frame(&frame).unwrap();
        extractor.reset();
        let b = extractor.extract_frame(&frame).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pre_emphasis_state_carries_between_frames() {
        let extractor = MfccExtractor::new(test_config()).unwrap();
        let frame = sine_wave(220.0, 44_100, 512);
        let first = extractor.extract_frame(&frame).unwrap();
        // Same frame content again, but the carried-over previous sample
        // now differs (it's the first call's last sample, not 0), so the
        // pre-emphasized signal - and therefore the result - differs.
        let second = extractor.extract_frame(&frame).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn frame_cache_does_not_conflate_distinct_frames() {
        let extractor = MfccExtractor::new(test_config()).unwrap();
        let low = sine_wave(220.0, 44_100, 512);
        let high = sine_wave(880.0, 44_100, 512);
        let a = extractor.extract_frame(&low).unwrap();
        let b = extractor.extract_frame(&high).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn pre_emphasis_preserves_length() {
        let frame = vec![1.0, 2.0, 3.0, 4.0];
        let out = pre_emphasize(&frame, 0.97, 0.0);
        assert_eq!(out.len(), frame.len());
    }

    #[test]
    fn pre_emphasis_uses_carried_over_sample_as_leading_term() {
        let frame = vec![1.0, 2.0, 3.0, 4.0];
        let fresh = pre_emphasize(&frame, 0.97, 0.0);
        let carried = pre_emphasize(&frame, 0.97, 5.0);
        assert_eq!(fresh[0], 1.0);
        assert_eq!(carried[0], 1.0 - 0.97 * 5.0);
        // Everything after the leading sample only depends on the frame.
        assert_eq!(fresh[1..], carried[1..]);
    }

    #[test]
    fn hamming_window_tapers_to_edges() {
        let w = hamming_window(512);
        assert!(w[0] < w[256]);
        assert!(w[511] < w[256]);
    }
}
