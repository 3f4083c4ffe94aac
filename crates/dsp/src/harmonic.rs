//! Spectral shape and harmonic-structure analysis over a single frame's
//! power spectrum, relative to a known (or estimated) fundamental.

use callcoach_config::HarmonicConfig;

use crate::fft::RealFft;

/// Per-frame harmonic/spectral analysis result.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicProfile {
    pub spectral_centroid_hz: f32,
    pub spectral_spread_hz: f32,
    pub spectral_rolloff_hz: f32,
    pub spectral_flatness: f32,
    /// Amplitude of each harmonic partial found near `n * f0`, in
    /// ascending order; `None` entries mean no peak was found within the
    /// search window.
    pub harmonic_amplitudes: Vec<Option<f32>>,
    /// Frequencies (Hz) of the strongest formant peaks, in ascending order.
    pub formants_hz: Vec<f32>,
    /// Harmonic-to-noise ratio in dB; higher means a cleaner tone.
    pub harmonic_to_noise_ratio_db: f32,
    /// RMS deviation of harmonic partials from exact integer multiples of
    /// `f0`, normalized by `f0` — 0 is perfectly harmonic.
    pub inharmonicity: f32,
    pub brightness: f32,
    pub resonance: f32,
    pub rasp: f32,
}

/// Analyzes one frame at a time against a caller-supplied fundamental
/// frequency estimate.
pub struct HarmonicAnalyzer {
    config: HarmonicConfig,
    fft: RealFft,
    sample_rate: u32,
    window: Vec<f32>,
}

impl HarmonicAnalyzer {
    pub fn new(config: HarmonicConfig, fft_size: usize, sample_rate: u32) -> crate::error::Result<Self> {
        Ok(Self {
            config,
            fft: RealFft::new(fft_size)?,
            sample_rate,
            window: hann_window(fft_size),
        })
    }

    /// Analyze one raw frame given its fundamental frequency estimate in
    /// Hz. Pass `None` when the frame is unvoiced; harmonic/formant
    /// fields are then left empty.
    pub fn analyze(&self, frame: &mut [f32], f0_hz: Option<f32>) -> crate::error::Result<HarmonicProfile> {
        for (sample, w) in frame.iter_mut().zip(self.window.iter()) {
            *sample *= w;
        }
        let power = self.fft.power_spectrum(frame)?;
        let bin_hz = self.sample_rate as f32 / self.fft.size() as f32;

        let centroid = spectral_centroid(&power, bin_hz);
        let spread = spectral_spread(&power, bin_hz, centroid);
        let rolloff = spectral_rolloff(&power, bin_hz, self.config.rolloff_threshold);
        let flatness = spectral_flatness(&power);

        let located_harmonics = match f0_hz {
            Some(f0) if f0 > 0.0 => self.find_harmonics(&power, bin_hz, f0),
            _ => Vec::new(),
        };
        let harmonics: Vec<Option<f32>> = located_harmonics.iter().map(|h| h.map(|(_, a)| a)).collect();
        let formants = find_formants(&power, bin_hz, self.config.max_formants);
        let hnr = harmonic_to_noise_ratio(&power, &harmonics);
        let inharmonicity = match f0_hz {
            Some(f0) if f0 > 0.0 => inharmonicity(&located_harmonics, f0),
            _ => 0.0,
        };

        let nyquist = self.sample_rate as f32 / 2.0;
        let brightness = (centroid / nyquist).clamp(0.0, 1.0);
        let resonance = if formants.is_empty() {
            0.0
        } else {
            (1.0 - (formants[0] / nyquist).clamp(0.0, 1.0)).clamp(0.0, 1.0)
        };
        let rasp = flatness;

        Ok(HarmonicProfile {
            spectral_centroid_hz: centroid,
            spectral_spread_hz: spread,
            spectral_rolloff_hz: rolloff,
            spectral_flatness: flatness,
            harmonic_amplitudes: harmonics,
            formants_hz: formants,
            harmonic_to_noise_ratio_db: hnr,
            inharmonicity,
            brightness,
            resonance,
            rasp,
        })
    }

    /// Locate each expected harmonic partial, returning its actual peak
    /// frequency and amplitude when found within the search window.
    fn find_harmonics(&self, power: &[f32], bin_hz: f32, f0_hz: f32) -> Vec<Option<(f32, f32)>> {
        (1..=self.config.num_harmonics)
            .map(|n| {
                let target_hz = f0_hz * n as f32;
                let window_hz = target_hz * self.config.harmonic_search_window;
                find_peak_near(power, bin_hz, target_hz, window_hz)
            })
            .collect()
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|n| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

fn spectral_centroid(power: &[f32], bin_hz: f32) -> f32 {
    let total: f32 = power.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f32 = power
        .iter()
        .enumerate()
        .map(|(i, &p)| i as f32 * bin_hz * p)
        .sum();
    weighted / total
}

fn spectral_spread(power: &[f32], bin_hz: f32, centroid: f32) -> f32 {
    let total: f32 = power.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let variance: f32 = power
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let hz = i as f32 * bin_hz;
            (hz - centroid).powi(2) * p
        })
        .sum::<f32>()
        / total;
    variance.sqrt()
}

fn spectral_rolloff(power: &[f32], bin_hz: f32, threshold: f32) -> f32 {
    let total: f32 = power.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let target = total * threshold;
    let mut cumulative = 0.0f32;
    for (i, &p) in power.iter().enumerate() {
        cumulative += p;
        if cumulative >= target {
            return i as f32 * bin_hz;
        }
    }
    (power.len() - 1) as f32 * bin_hz
}

fn spectral_flatness(power: &[f32]) -> f32 {
    let floor = 1e-10f32;
    let n = power.len() as f32;
    let log_sum: f32 = power.iter().map(|&p| (p + floor).ln()).sum();
    let geometric_mean = (log_sum / n).exp();
    let arithmetic_mean: f32 = power.iter().sum::<f32>() / n;
    if arithmetic_mean <= 0.0 {
        0.0
    } else {
        (geometric_mean / arithmetic_mean).clamp(0.0, 1.0)
    }
}

fn find_peak_near(power: &[f32], bin_hz: f32, target_hz: f32, window_hz: f32) -> Option<(f32, f32)> {
    let center_bin = (target_hz / bin_hz).round() as isize;
    let window_bins = (window_hz / bin_hz).ceil().max(1.0) as isize;
    let lo = (center_bin - window_bins).max(0) as usize;
    let hi = ((center_bin + window_bins) as usize).min(power.len().saturating_sub(1));
    if lo > hi {
        return None;
    }
    power[lo..=hi]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(offset, &amplitude)| ((lo + offset) as f32 * bin_hz, amplitude))
}

fn find_formants(power: &[f32], bin_hz: f32, max_formants: usize) -> Vec<f32> {
    let mut peaks: Vec<(usize, f32)> = Vec::new();
    for i in 1..power.len().saturating_sub(1) {
        if power[i] > power[i - 1] && power[i] > power[i + 1] {
            peaks.push((i, power[i]));
        }
    }
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
    peaks.truncate(max_formants);
    peaks.sort_by_key(|(i, _)| *i);
    peaks.into_iter().map(|(i, _)| i as f32 * bin_hz).collect()
}

fn harmonic_to_noise_ratio(power: &[f32], harmonics: &[Option<f32>]) -> f32 {
    let harmonic_energy: f32 = harmonics.iter().filter_map(|h| *h).map(|a| a * a).sum();
    let total_energy: f32 = power.iter().sum();
    let noise_energy = (total_energy - harmonic_energy).max(1e-10);
    if harmonic_energy <= 0.0 {
        return -96.0;
    }
    10.0 * (harmonic_energy / noise_energy).log10()
}

/// RMS deviation of located harmonic peaks from exact integer multiples of
/// `f0_hz`, normalized by `f0_hz`. 0 for a perfectly harmonic spectrum.
fn inharmonicity(harmonics: &[Option<(f32, f32)>], f0_hz: f32) -> f32 {
    let deviations: Vec<f32> = harmonics
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.map(|(freq, _)| (freq, (i + 1) as f32 * f0_hz)))
        .map(|(actual, expected)| (actual - expected) / f0_hz)
        .collect();
    if deviations.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = deviations.iter().map(|d| d * d).sum::<f32>() / deviations.len() as f32;
    mean_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HarmonicConfig {
        HarmonicConfig {
            rolloff_threshold: 0.85,
            num_harmonics: 4,
            harmonic_search_window: 0.05,
            max_formants: 3,
            enabled: true,
        }
    }

    fn sine_wave(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * std::f32::consts::PI * freq * n as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn centroid_tracks_tone_frequency() {
        let analyzer = HarmonicAnalyzer::new(config(), 2048, 44_100).unwrap();
        let mut frame = sine_wave(440.0, 44_100, 2048);
        let profile = analyzer.analyze(&mut frame, Some(440.0)).unwrap();
        assert!((profile.spectral_centroid_hz - 440.0).abs() < 100.0);
    }

    #[test]
    fn harmonics_found_for_pure_tone() {
        let analyzer = HarmonicAnalyzer::new(config(), 2048, 44_100).unwrap();
        let mut frame = sine_wave(440.0, 44_100, 2048);
        let profile = analyzer.analyze(&mut frame, Some(440.0)).unwrap();
        assert!(profile.harmonic_amplitudes[0].is_some());
    }

    #[test]
    fn no_f0_skips_harmonic_search() {
        let analyzer = HarmonicAnalyzer::new(config(), 2048, 44_100).unwrap();
        let mut frame = sine_wave(440.0, 44_100, 2048);
        let profile = analyzer.analyze(&mut frame, None).unwrap();
        assert!(profile.harmonic_amplitudes.is_empty());
    }

    #[test]
    fn flatness_in_unit_range() {
        let analyzer = HarmonicAnalyzer::new(config(), 2048, 44_100).unwrap();
        let mut frame = sine_wave(440.0, 44_100, 2048);
        let profile = analyzer.analyze(&mut frame, Some(440.0)).unwrap();
        assert!(profile.spectral_flatness >= 0.0 && profile.spectral_flatness <= 1.0);
    }

    #[test]
    fn hann_window_tapers_to_zero_at_edges() {
        let w = hann_window(512);
        assert!(w[0].abs() < 1e-6);
        assert!(w[511].abs() < 1e-6);
        assert!(w[256] > w[0]);
    }

    #[test]
    fn analyze_applies_window_before_fft() {
        let analyzer = HarmonicAnalyzer::new(config(), 2048, 44_100).unwrap();
        let original = sine_wave(440.0, 44_100, 2048);
        let mut frame = original.clone();
        analyzer.analyze(&mut frame, Some(440.0)).unwrap();
        // The Hann window attenuates the frame in place; near the last
        // sample it nearly zeroes it out, unlike the raw tone.
        assert_ne!(frame[2047], original[2047]);
        assert!(frame[2047].abs() < 1e-4);
    }

    #[test]
    fn rolloff_below_nyquist() {
        let analyzer = HarmonicAnalyzer::new(config(), 2048, 44_100).unwrap();
        let mut frame = sine_wave(440.0, 44_100, 2048);
        let profile = analyzer.analyze(&mut frame, Some(440.0)).unwrap();
        assert!(profile.spectral_rolloff_hz <= 22_050.0);
    }
}
