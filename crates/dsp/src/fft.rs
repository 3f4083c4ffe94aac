//! Real-to-complex forward FFT, wrapped for reuse across frames.
//!
//! A single planner is built once per analysis size and reused for every
//! frame; `realfft` amortizes the twiddle-factor setup across calls.

use realfft::num_complex::Complex;
use realfft::RealFftPlanner;
use std::sync::Arc;

use crate::error::{DspError, Result};

/// A reusable real-to-complex FFT of a fixed size.
pub struct RealFft {
    size: usize,
    fft: Arc<dyn realfft::RealToComplex<f32>>,
}

impl RealFft {
    /// `size` must be a power of two.
    pub fn new(size: usize) -> Result<Self> {
        if !size.is_power_of_two() {
            return Err(DspError::NotPowerOfTwo(size));
        }
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        Ok(Self { size, fft })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of non-redundant complex bins (`size / 2 + 1`).
    pub fn num_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Transform `input` (length must equal `size`; consumed in place by
    /// `realfft`) into its complex spectrum.
    pub fn process(&self, input: &mut [f32]) -> Result<Vec<Complex<f32>>> {
        if input.len() != self.size {
            return Err(DspError::InvalidParameter(format!(
                "expected input of length {}, got {}",
                self.size,
                input.len()
            )));
        }
        let mut spectrum = vec![Complex::new(0.0f32, 0.0f32); self.num_bins()];
        self.fft
            .process(input, &mut spectrum)
            .map_err(|e| DspError::FftFailure(e.to_string()))?;
        Ok(spectrum)
    }

    /// Transform and return the power spectrum `|X(f)|^2`.
    pub fn power_spectrum(&self, input: &mut [f32]) -> Result<Vec<f32>> {
        let spectrum = self.process(input)?;
        Ok(spectrum.iter().map(|c| c.norm_sqr()).collect())
    }
}
