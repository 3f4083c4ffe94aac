//! Rhythm/cadence analysis: onset detection, autocorrelation-based tempo
//! estimation, and syllable-level timing statistics over a whole
//! recording's audio.

use callcoach_config::CadenceConfig;

/// One detected onset's offset into the analyzed signal, in seconds.
pub type OnsetTime = f32;

/// Per-syllable timing derived from consecutive onsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyllableInterval {
    pub start_secs: f32,
    pub duration_secs: f32,
}

/// Full cadence analysis result for one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct CadenceProfile {
    pub onsets_secs: Vec<OnsetTime>,
    pub tempo_bpm: f32,
    /// 1 = perfectly even inter-onset intervals, 0 = maximally irregular.
    pub rhythmic_regularity: f32,
    /// Normalized entropy of the inter-onset-interval distribution.
    pub rhythmic_complexity: f32,
    /// Fraction of onsets falling off the estimated beat grid.
    pub syncopation: f32,
    pub syllables: Vec<SyllableInterval>,
    /// Mean syllable duration in seconds, 0 if syllable analysis is
    /// disabled or too few onsets were found to form one.
    pub avg_syllable_duration_secs: f32,
    /// Syllables per second over the analyzed recording.
    pub syllable_rate: f32,
}

/// Stateless cadence analyzer; takes a full buffer of samples at once
/// (tempo/rhythm statistics need the whole recording, unlike the
/// frame-at-a-time MFCC/VAD/pitch/harmonic analyzers).
pub struct CadenceAnalyzer {
    config: CadenceConfig,
    sample_rate: u32,
}

impl CadenceAnalyzer {
    pub fn new(config: CadenceConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
        }
    }

    pub fn analyze(&self, samples: &[f32]) -> CadenceProfile {
        let onset_function = self.onset_detection_function(samples);
        let onsets = self.pick_onsets(&onset_function);
        let tempo = self.estimate_tempo(&onset_function);

        let intervals = inter_onset_intervals(&onsets);
        let regularity = rhythmic_regularity(&intervals);
        let complexity = rhythmic_complexity(&intervals);
        let syncopation = self.syncopation(&onsets, tempo);
        let syllables = if self.config.enable_syllable_analysis {
            syllables_from_onsets(&onsets, self.config.min_syllable_gap_secs)
        } else {
            Vec::new()
        };

        let avg_syllable_duration_secs = if syllables.is_empty() {
            0.0
        } else {
            syllables.iter().map(|s| s.duration_secs).sum::<f32>() / syllables.len() as f32
        };
        let total_secs = samples.len() as f32 / self.sample_rate as f32;
        let syllable_rate = if total_secs > 0.0 {
            syllables.len() as f32 / total_secs
        } else {
            0.0
        };

        CadenceProfile {
            onsets_secs: onsets,
            tempo_bpm: tempo,
            rhythmic_regularity: regularity,
            rhythmic_complexity: complexity,
            syncopation,
            syllables,
            avg_syllable_duration_secs,
            syllable_rate,
        }
    }

    /// Framed energy, differenced and half-wave rectified — a standard
    /// cheap onset detection function.
    fn onset_detection_function(&self, samples: &[f32]) -> Vec<f32> {
        let frame_size = self.config.onset_frame_size;
        let hop_size = self.config.onset_hop_size;
        if samples.len() < frame_size {
            return Vec::new();
        }

        let mut energies = Vec::new();
        let mut start = 0;
        while start + frame_size <= samples.len() {
            let frame = &samples[start..start + frame_size];
            let energy: f32 = frame.iter().map(|s| s * s).sum();
            energies.push(energy);
            start += hop_size;
        }

        let mut onset_fn = vec![0.0f32; energies.len()];
        for i in 1..energies.len() {
            onset_fn[i] = (energies[i] - energies[i - 1]).max(0.0);
        }
        onset_fn
    }

    fn pick_onsets(&self, onset_function: &[f32]) -> Vec<OnsetTime> {
        if onset_function.is_empty() {
            return Vec::new();
        }
        let mean = onset_function.iter().sum::<f32>() / onset_function.len() as f32;
        let variance = onset_function
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f32>()
            / onset_function.len() as f32;
        let stddev = variance.sqrt();
        let threshold = mean + self.config.onset_threshold_k * stddev;

        let hop_secs = self.config.onset_hop_size as f32 / self.sample_rate as f32;
        let mut onsets = Vec::new();
        for i in 1..onset_function.len() - 1 {
            let is_local_peak =
                onset_function[i] > onset_function[i - 1] && onset_function[i] >= onset_function[i + 1];
            if is_local_peak && onset_function[i] > threshold {
                onsets.push(i as f32 * hop_secs);
            }
        }
        onsets
    }

    fn estimate_tempo(&self, onset_function: &[f32]) -> f32 {
        if onset_function.len() < 4 {
            return 0.0;
        }
        let hop_secs = self.config.onset_hop_size as f32 / self.sample_rate as f32;
        let min_lag = (60.0 / self.config.max_tempo_bpm / hop_secs).max(1.0) as usize;
        let max_lag = ((60.0 / self.config.min_tempo_bpm / hop_secs) as usize)
            .min(onset_function.len() - 1);

        if min_lag >= max_lag {
            return 0.0;
        }

        let mut best_lag = min_lag;
        let mut best_score = f32::MIN;
        for lag in min_lag..=max_lag {
            let score = autocorrelation_at_lag(onset_function, lag);
            if score > best_score {
                best_score = score;
                best_lag = lag;
            }
        }

        60.0 / (best_lag as f32 * hop_secs)
    }

    fn syncopation(&self, onsets: &[OnsetTime], tempo_bpm: f32) -> f32 {
        if onsets.is_empty() || tempo_bpm <= 0.0 {
            return 0.0;
        }
        let beat_period = 60.0 / tempo_bpm;
        let mut total_offset = 0.0f32;
        for &onset in onsets {
            let phase = (onset % beat_period) / beat_period;
            let offset_from_beat = phase.min(1.0 - phase);
            total_offset += offset_from_beat;
        }
        (total_offset / onsets.len() as f32 * 2.0).clamp(0.0, 1.0)
    }
}

fn autocorrelation_at_lag(signal: &[f32], lag: usize) -> f32 {
    signal
        .iter()
        .zip(signal.iter().skip(lag))
        .map(|(a, b)| a * b)
        .sum()
}

fn inter_onset_intervals(onsets: &[OnsetTime]) -> Vec<f32> {
    onsets.windows(2).map(|w| w[1] - w[0]).collect()
}

fn rhythmic_regularity(intervals: &[f32]) -> f32 {
    if intervals.len() < 2 {
        return 1.0;
    }
    let mean = intervals.iter().sum::<f32>() / intervals.len() as f32;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance =
        intervals.iter().map(|i| (i - mean).powi(2)).sum::<f32>() / intervals.len() as f32;
    let cv = variance.sqrt() / mean;
    (1.0 - cv).clamp(0.0, 1.0)
}

fn rhythmic_complexity(intervals: &[f32]) -> f32 {
    if intervals.len() < 2 {
        return 0.0;
    }
    // Bucket intervals into coarse bins, then compute normalized Shannon
    // entropy of the resulting distribution.
    const NUM_BINS: usize = 8;
    let min = intervals.iter().cloned().fold(f32::MAX, f32::min);
    let max = intervals.iter().cloned().fold(f32::MIN, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return 0.0;
    }
    let mut counts = vec![0usize; NUM_BINS];
    for &i in intervals {
        let bin = (((i - min) / (max - min)) * (NUM_BINS - 1) as f32).round() as usize;
        counts[bin.min(NUM_BINS - 1)] += 1;
    }
    let total = intervals.len() as f32;
    let entropy: f32 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f32 / total;
            -p * p.log2()
        })
        .sum();
    let max_entropy = (NUM_BINS as f32).log2();
    (entropy / max_entropy).clamp(0.0, 1.0)
}

fn syllables_from_onsets(onsets: &[OnsetTime], min_gap_secs: f32) -> Vec<SyllableInterval> {
    if onsets.is_empty() {
        return Vec::new();
    }
    let mut merged: Vec<OnsetTime> = vec![onsets[0]];
    for &onset in &onsets[1..] {
        if onset - *merged.last().unwrap() >= min_gap_secs {
            merged.push(onset);
        }
    }
    merged
        .windows(2)
        .map(|w| SyllableInterval {
            start_secs: w[0],
            duration_secs: w[1] - w[0],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CadenceConfig {
        CadenceConfig {
            onset_frame_size: 256,
            onset_hop_size: 128,
            onset_threshold_k: 1.0,
            min_tempo_bpm: 40.0,
            max_tempo_bpm: 240.0,
            min_syllable_gap_secs: 0.05,
            enabled: true,
            enable_syllable_analysis: true,
        }
    }

    fn pulse_train(sample_rate: u32, secs: f32, bpm: f32) -> Vec<f32> {
        let period_samples = (sample_rate as f32 * 60.0 / bpm) as usize;
        let total_samples = (sample_rate as f32 * secs) as usize;
        let mut samples = vec![0.0f32; total_samples];
        let mut pos = 0;
        while pos + 100 < total_samples {
            for i in 0..100 {
                samples[pos + i] = 0.8;
            }
            pos += period_samples;
        }
        samples
    }

    #[test]
    fn detects_onsets_in_pulse_train() {
        let analyzer = CadenceAnalyzer::new(config(), 8_000);
        let signal = pulse_train(8_000, 4.0, 120.0);
        let profile = analyzer.analyze(&signal);
        assert!(!profile.onsets_secs.is_empty());
    }

    #[test]
    fn estimates_tempo_near_120_bpm() {
        let analyzer = CadenceAnalyzer::new(config(), 8_000);
        let signal = pulse_train(8_000, 6.0, 120.0);
        let profile = analyzer.analyze(&signal);
        assert!(profile.tempo_bpm > 0.0);
        assert!(
            (profile.tempo_bpm - 120.0).abs() < 30.0
                || (profile.tempo_bpm - 60.0).abs() < 15.0
                || (profile.tempo_bpm - 240.0).abs() < 30.0,
            "got {}",
            profile.tempo_bpm
        );
    }

    #[test]
    fn silence_yields_empty_profile() {
        let analyzer = CadenceAnalyzer::new(config(), 8_000);
        let signal = vec![0.0f32; 8_000];
        let profile = analyzer.analyze(&signal);
        assert!(profile.onsets_secs.is_empty());
        assert_eq!(profile.tempo_bpm, 0.0);
    }

    #[test]
    fn regularity_is_one_for_single_interval() {
        assert_eq!(rhythmic_regularity(&[]), 1.0);
        assert_eq!(rhythmic_regularity(&[0.5]), 1.0);
    }

    #[test]
    fn regular_intervals_score_high_regularity() {
        let intervals = vec![0.5, 0.5, 0.5, 0.5];
        assert!(rhythmic_regularity(&intervals) > 0.9);
    }

    #[test]
    fn syllable_analysis_respects_enable_flag() {
        let mut disabled = config();
        disabled.enable_syllable_analysis = false;
        let analyzer = CadenceAnalyzer::new(disabled, 8_000);
        let signal = pulse_train(8_000, 4.0, 120.0);
        let profile = analyzer.analyze(&signal);
        assert!(profile.syllables.is_empty());
        assert!(!profile.onsets_secs.is_empty());
        assert_eq!(profile.avg_syllable_duration_secs, 0.0);
        assert_eq!(profile.syllable_rate, 0.0);
    }

    #[test]
    fn syllable_rate_and_duration_are_populated_when_enabled() {
        let analyzer = CadenceAnalyzer::new(config(), 8_000);
        let signal = pulse_train(8_000, 4.0, 120.0);
        let profile = analyzer.analyze(&signal);
        if !profile.syllables.is_empty() {
            assert!(profile.avg_syllable_duration_secs > 0.0);
            assert!(profile.syllable_rate > 0.0);
        }
    }

    #[test]
    fn syllables_merge_within_min_gap() {
        let onsets = vec![0.0, 0.01, 0.5, 1.0];
        let syllables = syllables_from_onsets(&onsets, 0.05);
        // 0.0 and 0.01 merge (gap < 0.05), leaving 3 onsets => 2 intervals
        assert_eq!(syllables.len(), 2);
    }
}
