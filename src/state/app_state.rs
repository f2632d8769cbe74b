use crate::analysis::SignalPair;

/// What the status readout shows. The three states are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Capture is running
    Recording,
    /// The microphone was granted before and is currently idle
    Ready,
    /// No successful microphone grant yet
    NotYetRequested,
}

/// Root application state
///
/// Mutated only by user actions and capture lifecycle events. Signals are
/// zeroed whenever capture is inactive.
#[derive(Debug, Clone)]
pub struct AppState {
    pub is_capturing: bool,
    pub permission_granted: bool,
    pub signals: SignalPair,
    /// Last device error, shown as a banner until the next successful start
    pub last_error: Option<String>,
    pub show_help: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            is_capturing: false,
            permission_granted: false,
            signals: SignalPair::default(),
            last_error: None,
            show_help: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful capture start
    pub fn capture_started(&mut self) {
        self.is_capturing = true;
        self.permission_granted = true;
        self.last_error = None;
    }

    /// Record a failed capture start. Everything but the error is unchanged.
    pub fn capture_failed(&mut self, error: String) {
        self.last_error = Some(error);
    }

    /// Record a capture stop (user-initiated or forced by a device failure)
    pub fn capture_stopped(&mut self) {
        self.is_capturing = false;
        self.signals = SignalPair::default();
    }

    /// Publish this frame's signals. Ignored while idle so a stray frame
    /// cannot resurrect non-zero values after stop.
    pub fn set_signals(&mut self, signals: SignalPair) {
        if self.is_capturing {
            self.signals = signals;
        }
    }

    pub fn status(&self) -> CaptureStatus {
        if self.is_capturing {
            CaptureStatus::Recording
        } else if self.permission_granted {
            CaptureStatus::Ready
        } else {
            CaptureStatus::NotYetRequested
        }
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_not_requested_the_microphone() {
        let state = AppState::new();
        assert!(!state.is_capturing);
        assert!(!state.permission_granted);
        assert_eq!(state.signals, SignalPair::default());
        assert_eq!(state.status(), CaptureStatus::NotYetRequested);
    }

    #[test]
    fn status_covers_the_reachable_combinations() {
        let mut state = AppState::new();
        assert_eq!(state.status(), CaptureStatus::NotYetRequested);

        state.capture_started();
        assert_eq!(state.status(), CaptureStatus::Recording);
        // Capturing implies a granted microphone.
        assert!(state.permission_granted);

        state.capture_stopped();
        assert_eq!(state.status(), CaptureStatus::Ready);
    }

    #[test]
    fn denied_start_changes_nothing_but_the_error() {
        let mut state = AppState::new();
        state.capture_failed("Failed to connect to PipeWire".to_string());

        assert!(!state.is_capturing);
        assert!(!state.permission_granted);
        assert_eq!(state.status(), CaptureStatus::NotYetRequested);
        assert!(state.last_error.is_some());
    }

    #[test]
    fn successful_start_clears_a_stale_error() {
        let mut state = AppState::new();
        state.capture_failed("no device".to_string());
        state.capture_started();
        assert!(state.last_error.is_none());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut state = AppState::new();
        state.capture_started();
        state.set_signals(SignalPair {
            level: 0.4,
            pitch: 0.7,
        });

        state.capture_stopped();
        let once = state.clone();
        state.capture_stopped();

        assert_eq!(state.is_capturing, once.is_capturing);
        assert_eq!(state.signals, once.signals);
        assert_eq!(state.signals, SignalPair::default());
        // Like a fresh instance, except the grant sticks.
        assert!(state.permission_granted);
        assert_eq!(state.status(), CaptureStatus::Ready);
    }

    #[test]
    fn signals_are_dropped_while_idle() {
        let mut state = AppState::new();
        state.set_signals(SignalPair {
            level: 0.9,
            pitch: 0.9,
        });
        assert_eq!(state.signals, SignalPair::default());

        state.capture_started();
        state.set_signals(SignalPair {
            level: 0.5,
            pitch: 0.25,
        });
        assert_eq!(state.signals.level, 0.5);

        state.capture_stopped();
        state.set_signals(SignalPair {
            level: 0.9,
            pitch: 0.9,
        });
        assert_eq!(state.signals, SignalPair::default());
    }
}
