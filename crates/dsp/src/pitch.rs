//! YIN fundamental frequency estimation, with rolling statistics and
//! vibrato detection over a stream of frame-level estimates.

use callcoach_config::PitchConfig;

/// Result of tracking one frame's pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Estimated fundamental frequency in Hz, or `None` if unvoiced /
    /// below the confidence floor.
    pub frequency_hz: Option<f32>,
    /// `1 - d'(tau*)`, in `[0, 1]`; higher is more confident.
    pub confidence: f32,
    /// Whether this frame's confidence cleared the configured floor.
    pub is_voiced: bool,
}

/// Mean/spread/stability over the pitch history accumulated so far.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchStatistics {
    /// Mean pitch in Hz.
    pub mean: f32,
    /// Standard deviation of pitch in Hz.
    pub standard_deviation: f32,
    /// `max - min` pitch in Hz.
    pub range: f32,
    /// `1 / (1 + standard_deviation / mean)`, in `(0, 1]`; higher is steadier.
    pub stability: f32,
}

/// Vibrato characteristics estimated from the zero crossings of the
/// mean-centered recent pitch history.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vibrato {
    /// Oscillation rate in Hz.
    pub rate: f32,
    /// Standard deviation of the centered recent history, in Hz.
    pub extent: f32,
    /// `1 / (1 + coefficient of variation)` of cycle lengths, in `(0, 1]`.
    pub regularity: f32,
}

/// Number of voiced estimates the recent-history window is capped at,
/// matching the original engine's "last ~10 seconds" retention policy.
const HISTORY_SECONDS: f32 = 10.0;

/// Minimum voiced estimates required before vibrato analysis is attempted.
const MIN_VIBRATO_ESTIMATES: usize = 12;

/// Below this centered-history standard deviation (Hz), modulation is
/// treated as negligible rather than vibrato.
const MIN_VIBRATO_EXTENT_HZ: f32 = 0.1;

/// Stateful YIN pitch tracker. Smooths successive voiced estimates with a
/// one-pole filter and accumulates rolling statistics for vibrato
/// detection.
pub struct PitchTracker {
    config: PitchConfig,
    sample_rate: u32,
    hop_size: usize,
    smoothed_hz: Option<f32>,
    history: Vec<f32>,
}

impl PitchTracker {
    /// `hop_size` is the stride in samples between successive
    /// `track_frame` calls, used only to convert the pitch history into
    /// a duration for vibrato-rate estimation.
    pub fn new(config: PitchConfig, sample_rate: u32, hop_size: usize) -> Self {
        Self {
            config,
            sample_rate,
            hop_size: hop_size.max(1),
            smoothed_hz: None,
            history: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.smoothed_hz = None;
        self.history.clear();
    }

    /// Estimate the fundamental frequency of one frame via YIN's absolute
    /// threshold walk over the cumulative mean normalized difference
    /// function.
    pub fn track_frame(&mut self, frame: &[f32]) -> PitchEstimate {
        let max_lag = (self.sample_rate as f32 / self.config.min_f0_hz) as usize;
        let min_lag = (self.sample_rate as f32 / self.config.max_f0_hz).max(1.0) as usize;
        let max_lag = max_lag.min(frame.len().saturating_sub(1));

        if max_lag <= min_lag || frame.len() < 2 * max_lag {
            return PitchEstimate {
                frequency_hz: None,
                confidence: 0.0,
                is_voiced: false,
            };
        }

        let diff = difference_function(frame, max_lag);
        let cmnd = cumulative_mean_normalized_difference(&diff);

        let tau = absolute_threshold_walk(&cmnd, min_lag, self.config.yin_threshold);

        let estimate = match tau {
            Some(tau) => {
                let confidence = (1.0 - cmnd[tau]).clamp(0.0, 1.0);
                let is_voiced = confidence >= self.config.min_confidence;
                if !is_voiced {
                    PitchEstimate {
                        frequency_hz: None,
                        confidence,
                        is_voiced: false,
                    }
                } else {
                    let refined_tau = parabolic_interpolation(&cmnd, tau);
                    let hz = self.sample_rate as f32 / refined_tau;
                    let smoothed = self.smooth(hz);
                    PitchEstimate {
                        frequency_hz: Some(smoothed),
                        confidence,
                        is_voiced: true,
                    }
                }
            }
            None => PitchEstimate {
                frequency_hz: None,
                confidence: 0.0,
                is_voiced: false,
            },
        };

        if let Some(hz) = estimate.frequency_hz {
            self.push_history(hz);
        }

        estimate
    }

    fn smooth(&mut self, hz: f32) -> f32 {
        let smoothed = match self.smoothed_hz {
            Some(prev) => {
                self.config.smoothing_alpha * hz + (1.0 - self.config.smoothing_alpha) * prev
            }
            None => hz,
        };
        self.smoothed_hz = Some(smoothed);
        smoothed
    }

    fn push_history(&mut self, hz: f32) {
        self.history.push(hz);
        let max_entries =
            (HISTORY_SECONDS * self.sample_rate as f32 / self.hop_size as f32) as usize;
        if self.history.len() > max_entries.max(1) {
            self.history.remove(0);
        }
    }

    /// Mean pitch across all voiced frames seen so far.
    pub fn mean_hz(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f32>() / self.history.len() as f32)
    }

    /// Standard deviation of pitch across all voiced frames seen so far.
    pub fn stddev_hz(&self) -> Option<f32> {
        let mean = self.mean_hz()?;
        Some(stddev_around(&self.history, mean))
    }

    /// Rolling mean/standard-deviation/range/stability over the voiced
    /// pitch history. All fields are `0.0` until the first voiced frame.
    pub fn statistics(&self) -> PitchStatistics {
        if self.history.is_empty() {
            return PitchStatistics::default();
        }
        let mean = self.mean_hz().unwrap();
        let standard_deviation = stddev_around(&self.history, mean);
        let min = self.history.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = self
            .history
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max);
        let stability = if mean > 0.0 {
            1.0 / (1.0 + standard_deviation / mean)
        } else {
            0.0
        };
        PitchStatistics {
            mean,
            standard_deviation,
            range: max - min,
            stability,
        }
    }

    /// Vibrato rate/extent/regularity estimated from the zero crossings
    /// of the mean-centered recent pitch history. Requires at least
    /// [`MIN_VIBRATO_ESTIMATES`] voiced frames; returns all zeros
    /// otherwise, or when the modulation is too small to be vibrato.
    pub fn vibrato(&self) -> Vibrato {
        if self.history.len() < MIN_VIBRATO_ESTIMATES {
            return Vibrato::default();
        }

        let mean = self.history.iter().sum::<f32>() / self.history.len() as f32;
        let extent = stddev_around(&self.history, mean);
        if extent < MIN_VIBRATO_EXTENT_HZ {
            return Vibrato::default();
        }

        let centered: Vec<f32> = self.history.iter().map(|&p| p - mean).collect();
        let zero_crossings: Vec<usize> = centered
            .windows(2)
            .enumerate()
            .filter(|(_, w)| (w[0] <= 0.0 && w[1] > 0.0) || (w[0] >= 0.0 && w[1] < 0.0))
            .map(|(i, _)| i + 1)
            .collect();
        if zero_crossings.len() < 4 {
            return Vibrato {
                rate: 0.0,
                extent,
                regularity: 0.0,
            };
        }

        let hop_secs = self.hop_size as f32 / self.sample_rate as f32;
        let duration_secs = centered.len() as f32 * hop_secs;
        let rate = if duration_secs > 0.0 {
            (zero_crossings.len() as f32 / 2.0) / duration_secs
        } else {
            0.0
        };

        let mut cycle_lengths = Vec::new();
        let mut i = 2;
        while i < zero_crossings.len() {
            let prev = zero_crossings[i - 2];
            let cur = zero_crossings[i];
            cycle_lengths.push((cur - prev) as f32 * hop_secs);
            i += 2;
        }
        let regularity = if cycle_lengths.len() >= 2 {
            let cmean = cycle_lengths.iter().sum::<f32>() / cycle_lengths.len() as f32;
            let cstd = stddev_around(&cycle_lengths, cmean);
            if cmean > 0.0 {
                1.0 / (1.0 + cstd / cmean)
            } else {
                0.0
            }
        } else {
            0.0
        };

        Vibrato {
            rate,
            extent,
            regularity,
        }
    }
}

fn stddev_around(values: &[f32], mean: f32) -> f32 {
    let variance =
        values.iter().map(|&v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32;
    variance.sqrt()
}

fn difference_function(frame: &[f32], max_lag: usize) -> Vec<f32> {
    let mut diff = vec![0.0f32; max_lag + 1];
    for tau in 1..=max_lag {
        let mut sum = 0.0f32;
        for i in 0..frame.len() - tau {
            let delta = frame[i] - frame[i + tau];
            sum += delta * delta;
        }
        diff[tau] = sum;
    }
    diff
}

fn cumulative_mean_normalized_difference(diff: &[f32]) -> Vec<f32> {
    let mut cmnd = vec![1.0f32; diff.len()];
    let mut running_sum = 0.0f32;
    for tau in 1..diff.len() {
        running_sum += diff[tau];
        cmnd[tau] = if running_sum == 0.0 {
            1.0
        } else {
            diff[tau] * tau as f32 / running_sum
        };
    }
    cmnd
}

fn absolute_threshold_walk(cmnd: &[f32], min_lag: usize, threshold: f32) -> Option<usize> {
    let mut tau = min_lag.max(1);
    while tau < cmnd.len() {
        if cmnd[tau] < threshold {
            // Walk forward while the function keeps decreasing, to find
            // the local minimum rather than the first dip below threshold.
            let mut best = tau;
            while best + 1 < cmnd.len() && cmnd[best + 1] < cmnd[best] {
                best += 1;
            }
            return Some(best);
        }
        tau += 1;
    }
    None
}

fn parabolic_interpolation(cmnd: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f32;
    }
    let (s0, s1, s2) = (cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
    let denom = s0 - 2.0 * s1 + s2;
    if denom.abs() < f32::EPSILON {
        tau as f32
    } else {
        tau as f32 + (s0 - s2) / (2.0 * denom)
    }
}
