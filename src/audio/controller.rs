//! Capture lifecycle and the per-frame analysis tick.
//!
//! The controller owns at most one session. A session bundles the PipeWire
//! capture, the spectrum analyzer, and the per-frame scratch buffers, so
//! start and stop create and destroy everything as one unit. There is no
//! state where the device is held without an analyzer or vice versa.

use crate::analysis::{level, pitch, SignalPair, SpectrumAnalyzer, BIN_COUNT, FFT_SIZE};
use crate::audio::capture::{CaptureState, MicCapture};

struct CaptureSession {
    capture: MicCapture,
    analyzer: SpectrumAnalyzer,
    /// Frequency sample buffer, overwritten in place every frame
    bins: Vec<u8>,
    /// Time-domain window fed to the analyzer each frame
    samples: Vec<f32>,
}

/// Owns the microphone and drives the analysis loop
pub struct CaptureController {
    session: Option<CaptureSession>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self { session: None }
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    /// Acquire the microphone and set up the analysis pipeline.
    ///
    /// No-op when already capturing. On failure nothing is retained and the
    /// error describes what the device layer reported.
    pub fn start(&mut self) -> Result<(), String> {
        if self.session.is_some() {
            return Ok(());
        }

        let mut capture = MicCapture::new();
        capture.start()?;
        log::info!("Microphone capture started");

        self.session = Some(CaptureSession {
            capture,
            analyzer: SpectrumAnalyzer::new(),
            bins: vec![0; BIN_COUNT],
            samples: vec![0.0; FFT_SIZE],
        });
        Ok(())
    }

    /// Release the device and the analysis pipeline. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.capture.stop();
            log::info!("Microphone capture stopped");
        }
    }

    /// Run one analysis frame.
    ///
    /// Returns `Ok(None)` when no session is active (a stray frame after
    /// stop lands here and does nothing). Returns `Err` when the capture
    /// thread has failed since the last frame; the session is torn down
    /// before reporting so the caller only has to surface the message.
    pub fn tick(&mut self) -> Result<Option<SignalPair>, String> {
        if let Some(session) = self.session.as_ref() {
            let shared = session.capture.shared_state();
            if shared.state() == CaptureState::Error {
                let err = shared
                    .error()
                    .unwrap_or_else(|| "Microphone capture failed".to_string());
                self.stop();
                return Err(err);
            }
        }

        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        let shared = session.capture.shared_state();
        shared.window(&mut session.samples);
        session
            .analyzer
            .byte_frequency_data(&session.samples, &mut session.bins);

        Ok(Some(SignalPair {
            level: level(&session.bins),
            pitch: pitch(&session.bins, shared.sample_rate()),
        }))
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_without_a_session_is_a_no_op() {
        let mut controller = CaptureController::new();
        assert_eq!(controller.tick(), Ok(None));
        assert!(!controller.is_capturing());
    }

    #[test]
    fn stop_without_a_session_is_a_no_op() {
        let mut controller = CaptureController::new();
        controller.stop();
        controller.stop();
        assert!(!controller.is_capturing());
        assert_eq!(controller.tick(), Ok(None));
    }
}
