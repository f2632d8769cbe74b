//! Per-frame audio analysis
//!
//! This module provides:
//! - A 2048-point smoothed magnitude spectrum, byte-quantized per bin
//! - The two derived scalars (level, pitch) that drive the orb

mod signals;
mod spectrum;

pub use signals::{level, pitch, voice_band, SignalPair};
pub use spectrum::{SpectrumAnalyzer, BIN_COUNT, FFT_SIZE};
