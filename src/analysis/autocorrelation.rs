//! Normalized autocorrelation via the Wiener-Khinchin identity.
//!
//! A direct autocorrelation is O(L^2) per window. Instead we forward-FFT
//! the zero-padded window, replace each bin with its squared magnitude,
//! and inverse-FFT. The real part of the result is the autocorrelation,
//! and dividing by the lag-0 value (the global maximum) normalizes it so
//! a perfectly periodic signal peaks at 1.0 at its period.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub struct SpectralAutocorrelator {
    window_length: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    /// Transform buffer of size N = next power of two >= window_length.
    bins: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    output: Vec<f32>,
}

impl SpectralAutocorrelator {
    pub fn new(window_length: usize) -> Self {
        assert!(window_length > 0);
        let transform_size = window_length.next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(transform_size);
        let inverse = planner.plan_fft_inverse(transform_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            window_length,
            forward,
            inverse,
            bins: vec![Complex::new(0.0, 0.0); transform_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            output: vec![0.0; window_length],
        }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Transform size actually used (zero-padded power of two).
    pub fn transform_size(&self) -> usize {
        self.bins.len()
    }

    /// Compute the normalized autocorrelation of `window`.
    ///
    /// The returned slice has the same length as the window; only the
    /// unpadded region is meaningful. An all-zero window yields an
    /// all-zero autocorrelation rather than NaN.
    ///
    /// A window of the wrong length is a programmer error.
    pub fn compute(&mut self, window: &[f32]) -> &[f32] {
        assert_eq!(
            window.len(),
            self.window_length,
            "window length does not match the planned transform"
        );

        for (bin, &sample) in self.bins.iter_mut().zip(window) {
            *bin = Complex::new(sample, 0.0);
        }
        for bin in self.bins[window.len()..].iter_mut() {
            *bin = Complex::new(0.0, 0.0);
        }

        self.forward.process_with_scratch(&mut self.bins, &mut self.scratch);

        // Power spectrum: |X|^2, imaginary part zeroed.
        for bin in self.bins.iter_mut() {
            *bin = Complex::new(bin.re * bin.re + bin.im * bin.im, 0.0);
        }

        self.inverse.process_with_scratch(&mut self.bins, &mut self.scratch);

        // Lag 0 carries the total energy and is the global maximum; it is
        // zero only for a silent window.
        let zero_lag = self.bins[0].re;
        if zero_lag <= 0.0 {
            self.output.fill(0.0);
            return &self.output;
        }
        for (out, bin) in self.output.iter_mut().zip(self.bins.iter()) {
            *out = bin.re / zero_lag;
        }
        &self.output
    }

    /// The most recently computed autocorrelation.
    pub fn last(&self) -> &[f32] {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(length: usize, period: f32) -> Vec<f32> {
        (0..length)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / period).sin())
            .collect()
    }

    #[test]
    fn transform_size_is_padded_to_power_of_two() {
        let ac = SpectralAutocorrelator::new(2205);
        assert_eq!(ac.transform_size(), 4096);
        assert_eq!(ac.window_length(), 2205);
    }

    #[test]
    fn silence_yields_all_zero_autocorrelation() {
        let mut ac = SpectralAutocorrelator::new(256);
        let out = ac.compute(&[0.0; 256]);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn zero_lag_is_normalized_to_one() {
        let mut ac = SpectralAutocorrelator::new(256);
        let out = ac.compute(&sine(256, 32.0));
        assert!((out[0] - 1.0).abs() < 1e-5);
        assert!(out.iter().all(|&v| v <= 1.0 + 1e-5));
    }

    #[test]
    fn periodic_signal_peaks_at_its_period() {
        let mut ac = SpectralAutocorrelator::new(1024);
        let out = ac.compute(&sine(1024, 64.0)).to_vec();

        // The strongest lag after the initial lobe should be the period.
        let peak_lag = (32..out.len())
            .max_by(|&a, &b| out[a].partial_cmp(&out[b]).unwrap())
            .unwrap();
        assert_eq!(peak_lag, 64);
        assert!(out[64] > 0.8, "period peak should be strong: {}", out[64]);
    }
}
