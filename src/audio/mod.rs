//! Audio capture and lifecycle module using PipeWire
//!
//! This module provides:
//! - Microphone capture feeding a bounded sample ring (no recording)
//! - The capture controller that owns the session and runs the per-frame
//!   analysis tick

mod capture;
mod controller;

pub use controller::CaptureController;
