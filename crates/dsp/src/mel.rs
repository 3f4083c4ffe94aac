//! Triangular mel filter bank construction and application.

/// A bank of triangular mel-scale filters over a linear FFT magnitude/power
/// spectrum.
pub struct MelFilterBank {
    num_filters: usize,
    filters: Vec<Vec<f32>>,
}

impl MelFilterBank {
    /// Build `num_filters` overlapping triangular filters spanning
    /// `[fmin_hz, sample_rate / 2]`, over a spectrum with `num_bins =
    /// fft_size / 2 + 1` linear bins.
    pub fn new(sample_rate: u32, fft_size: usize, num_filters: usize, fmin_hz: f32) -> Self {
        let fmax = sample_rate as f32 / 2.0;
        let mel_min = hz_to_mel(fmin_hz);
        let mel_max = hz_to_mel(fmax);

        let mel_points: Vec<f32> = (0..num_filters + 2)
            .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (num_filters + 1) as f32)
            .collect();
        let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz(m)).collect();
        let bin_points: Vec<usize> = hz_points
            .iter()
            .map(|&hz| ((fft_size + 1) as f32 * hz / sample_rate as f32).floor() as usize)
            .collect();

        let num_bins = fft_size / 2 + 1;
        let mut filters = vec![vec![0.0f32; num_bins]; num_filters];

        for i in 0..num_filters {
            let start = bin_points[i];
            let center = bin_points[i + 1];
            let end = bin_points[i + 2];

            if start == center && center == end {
                // Collapsed filter: rising and falling edges are both
                // empty ranges. Give the single bin full weight instead
                // of leaving this filter all zeros.
                filters[i][center.min(num_bins - 1)] = 1.0;
                continue;
            }

            for j in start..center.min(num_bins) {
                if center > start {
                    filters[i][j] = (j - start) as f32 / (center - start) as f32;
                }
            }
            for j in center..end.min(num_bins) {
                if end > center {
                    filters[i][j] = (end - j) as f32 / (end - center) as f32;
                }
            }
        }

        Self {
            num_filters,
            filters,
        }
    }

    pub fn num_filters(&self) -> usize {
        self.num_filters
    }

    /// Apply the filter bank to a power spectrum, returning one energy
    /// value per filter.
    pub fn apply(&self, power_spectrum: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                filter
                    .iter()
                    .zip(power_spectrum.iter())
                    .map(|(w, p)| w * p)
                    .sum()
            })
            .collect()
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hz_mel_roundtrip() {
        let hz = 1000.0;
        let back = mel_to_hz(hz_to_mel(hz));
        assert!((hz - back).abs() < 0.01);
    }

    #[test]
    fn filter_bank_has_requested_filter_count() {
        let fb = MelFilterBank::new(44_100, 512, 26, 0.0);
        assert_eq!(fb.num_filters(), 26);
    }

    #[test]
    fn apply_produces_one_energy_per_filter() {
        let fb = MelFilterBank::new(44_100, 512, 26, 0.0);
        let spectrum = vec![1.0f32; 512 / 2 + 1];
        let energies = fb.apply(&spectrum);
        assert_eq!(energies.len(), 26);
        assert!(energies.iter().all(|&e| e >= 0.0));
    }

    #[test]
    fn collapsed_single_bin_filter_gets_full_weight() {
        // A tiny FFT size next to a high filter count forces some
        // adjacent mel points onto the same linear bin.
        let fb = MelFilterBank::new(8_000, 8, 40, 0.0);
        let collapsed = fb
            .filters
            .iter()
            .find(|f| f.iter().filter(|&&w| w > 0.0).count() == 1);
        let collapsed = collapsed.expect("at least one filter should collapse to a single bin");
        assert!(collapsed.iter().any(|&w| (w - 1.0).abs() < 1e-6));
    }

    #[test]
    fn each_filter_triangle_peaks_at_one() {
        let fb = MelFilterBank::new(44_100, 2048, 26, 0.0);
        for filter in &fb.filters {
            let peak = filter.iter().cloned().fold(0.0f32, f32::max);
            assert!(peak <= 1.0 + 1e-4);
        }
    }
}
