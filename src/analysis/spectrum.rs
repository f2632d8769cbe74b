//! Byte-quantized magnitude spectrum of the live capture window.
//!
//! One analyzer exists per capture session. Each frame it Hann-windows the
//! freshest 2048 samples, runs a forward FFT, smooths the bin magnitudes
//! against the previous frame, and quantizes them to bytes over a fixed
//! decibel range.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Transform size. 2048 points give 1024 usable bins, ~21.5 Hz per bin at
/// 44100 Hz.
pub const FFT_SIZE: usize = 2048;
/// Usable magnitude bins per frame.
pub const BIN_COUNT: usize = FFT_SIZE / 2;
/// Temporal smoothing factor applied to linear magnitudes between frames.
pub const SMOOTHING: f32 = 0.8;

// Quantization window: magnitudes at or below MIN_DB map to 0, at or above
// MAX_DB map to 255.
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buf: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let window = (0..FFT_SIZE).map(|i| hann_window(i, FFT_SIZE)).collect();

        Self {
            fft,
            window,
            buf: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            smoothed: vec![0.0; BIN_COUNT],
        }
    }

    /// Fill `out` with this frame's byte-quantized bin magnitudes.
    ///
    /// `samples` must hold `FFT_SIZE` mono samples; `out` must hold
    /// `BIN_COUNT` bytes. Smoothing state carries over between calls, so a
    /// loud frame decays over the following quiet ones instead of vanishing.
    pub fn byte_frequency_data(&mut self, samples: &[f32], out: &mut [u8]) {
        debug_assert_eq!(samples.len(), FFT_SIZE);
        debug_assert_eq!(out.len(), BIN_COUNT);

        for i in 0..FFT_SIZE {
            let s = samples.get(i).copied().unwrap_or(0.0);
            self.buf[i] = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buf);

        for k in 0..BIN_COUNT {
            let magnitude = self.buf[k].norm() / FFT_SIZE as f32;
            let smoothed = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * magnitude;
            self.smoothed[k] = smoothed;

            // max() keeps log10 finite on silent bins; the result lands far
            // below MIN_DB and clamps to 0 anyway.
            let db = 20.0 * smoothed.max(f32::MIN_POSITIVE).log10();
            let scaled = 255.0 * (db - MIN_DB) / (MAX_DB - MIN_DB);
            out[k] = scaled.clamp(0.0, 255.0) as u8;
        }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Hann window function.
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(bin: usize, amplitude: f32) -> Vec<f32> {
        (0..FFT_SIZE)
            .map(|i| amplitude * (2.0 * PI * bin as f32 * i as f32 / FFT_SIZE as f32).sin())
            .collect()
    }

    #[test]
    fn test_hann_window() {
        // Zero at the edges, one at the center.
        assert!((hann_window(0, FFT_SIZE) - 0.0).abs() < 0.01);
        assert!((hann_window(FFT_SIZE - 1, FFT_SIZE) - 0.0).abs() < 0.01);
        assert!((hann_window(FFT_SIZE / 2, FFT_SIZE) - 1.0).abs() < 0.01);
    }

    #[test]
    fn silence_quantizes_to_zero() {
        let mut analyzer = SpectrumAnalyzer::new();
        let samples = vec![0.0; FFT_SIZE];
        let mut out = vec![0xffu8; BIN_COUNT];

        analyzer.byte_frequency_data(&samples, &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let mut analyzer = SpectrumAnalyzer::new();
        let samples = tone(64, 0.5);
        let mut out = vec![0u8; BIN_COUNT];

        analyzer.byte_frequency_data(&samples, &mut out);

        let peak = out
            .iter()
            .enumerate()
            .max_by_key(|&(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        // Hann leakage spreads energy into the neighbors, but the center
        // must still win.
        assert!((63..=65).contains(&peak), "peak landed at bin {}", peak);
        assert!(out[64] > 0);
    }

    #[test]
    fn smoothing_carries_energy_into_the_next_frame() {
        let mut analyzer = SpectrumAnalyzer::new();
        let mut out = vec![0u8; BIN_COUNT];

        analyzer.byte_frequency_data(&tone(64, 0.5), &mut out);
        let loud = out[64];

        analyzer.byte_frequency_data(&vec![0.0; FFT_SIZE], &mut out);
        let decayed = out[64];

        assert!(loud > 0);
        // One silent frame keeps 80% of the linear magnitude, so the bin is
        // still audible in byte terms.
        assert!(decayed > 0);
        assert!(decayed <= loud);
    }

    #[test]
    fn fresh_analyzers_are_independent() {
        let mut a = SpectrumAnalyzer::new();
        let mut out = vec![0u8; BIN_COUNT];
        a.byte_frequency_data(&tone(100, 0.5), &mut out);

        // A new session must not see the previous session's smoothing tail.
        let mut b = SpectrumAnalyzer::new();
        b.byte_frequency_data(&vec![0.0; FFT_SIZE], &mut out);
        assert!(out.iter().all(|&v| v == 0));
    }
}
