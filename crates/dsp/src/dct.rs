//! Type-II discrete cosine transform, used to decorrelate log mel energies
//! into cepstral coefficients, plus the standard cepstral lifter.

/// A precomputed DCT-II basis for a fixed (input, output) size pair.
pub struct Dct2 {
    num_coefficients: usize,
    basis: Vec<Vec<f32>>,
}

impl Dct2 {
    /// `num_inputs` log filter-bank energies in, `num_coefficients`
    /// decorrelated coefficients out.
    pub fn new(num_inputs: usize, num_coefficients: usize) -> Self {
        let norm = (2.0 / num_inputs as f32).sqrt();
        let basis = (0..num_coefficients)
            .map(|k| {
                (0..num_inputs)
                    .map(|n| {
                        norm * ((std::f32::consts::PI / num_inputs as f32)
                            * (n as f32 + 0.5)
                            * k as f32)
                            .cos()
                    })
                    .collect()
            })
            .collect();
        Self {
            num_coefficients,
            basis,
        }
    }

    pub fn num_coefficients(&self) -> usize {
        self.num_coefficients
    }

    pub fn transform(&self, input: &[f32]) -> Vec<f32> {
        self.basis
            .iter()
            .map(|row| row.iter().zip(input.iter()).map(|(b, x)| b * x).sum())
            .collect()
    }
}

/// Apply the standard sinusoidal cepstral lifter in place. `length == 0`
/// disables liftering.
pub fn apply_lifter(coefficients: &mut [f32], length: usize) {
    if length == 0 {
        return;
    }
    let l = length as f32;
    for (n, c) in coefficients.iter_mut().enumerate() {
        let weight = 1.0 + (l / 2.0) * (std::f32::consts::PI * n as f32 / l).sin();
        *c *= weight;
    }
}
