//! Microphone capture using PipeWire
//!
//! Runs the PipeWire main loop on a dedicated thread and feeds a bounded
//! ring of the freshest mono samples for the per-frame analysis tick. No
//! audio is recorded or kept beyond the analysis window.

use pipewire as pw;
use pw::spa;
use pw::spa::param::format::{MediaSubtype, MediaType};
use pw::spa::param::format_utils;
use pw::spa::pod::Pod;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::analysis::FFT_SIZE;

/// Sample rate requested from the device. The negotiated rate may differ;
/// the shared state reports what the stream actually delivers.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

// Enough headroom that a late UI frame still finds a full analysis window.
const RING_CAPACITY: usize = FFT_SIZE * 2;

// How long start() waits for the capture stream to come up.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Current state of microphone capture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Error,
}

/// Shared state between the PipeWire thread and the UI thread
#[derive(Clone)]
pub struct SharedCaptureState {
    inner: Arc<Mutex<CaptureStateInner>>,
}

struct CaptureStateInner {
    /// Freshest mono samples, oldest first, capped at RING_CAPACITY
    ring: VecDeque<f32>,
    /// Rate the stream actually negotiated (TARGET_SAMPLE_RATE until known)
    sample_rate: u32,
    state: CaptureState,
    /// Failure reported by the capture thread, if any
    error: Option<String>,
}

impl SharedCaptureState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CaptureStateInner {
                ring: VecDeque::with_capacity(RING_CAPACITY),
                sample_rate: TARGET_SAMPLE_RATE,
                state: CaptureState::Idle,
                error: None,
            })),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.inner.lock().unwrap().state
    }

    pub fn set_state(&self, state: CaptureState) {
        self.inner.lock().unwrap().state = state;
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.lock().unwrap().sample_rate
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn set_error(&self, error: String) {
        let mut inner = self.inner.lock().unwrap();
        inner.error = Some(error);
        inner.state = CaptureState::Error;
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.ring.clear();
        inner.sample_rate = TARGET_SAMPLE_RATE;
        inner.state = CaptureState::Idle;
        inner.error = None;
    }

    /// Append mono samples from the process callback, dropping the oldest
    /// once the ring is full.
    pub fn push_samples(&self, samples: &[f32], sample_rate: u32) {
        if samples.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        // The format callback may not have run yet; keep the default until
        // the stream reports a real rate.
        if sample_rate > 0 {
            inner.sample_rate = sample_rate;
        }
        for &sample in samples {
            if inner.ring.len() == RING_CAPACITY {
                inner.ring.pop_front();
            }
            inner.ring.push_back(sample);
        }
    }

    /// Copy the freshest `out.len()` samples into `out`, oldest first,
    /// zero-padding the front while the ring is still filling.
    pub fn window(&self, out: &mut [f32]) {
        let inner = self.inner.lock().unwrap();
        let n = out.len();
        let available = inner.ring.len().min(n);
        let pad = n - available;

        out[..pad].fill(0.0);
        let skip = inner.ring.len() - available;
        for (dst, src) in out[pad..].iter_mut().zip(inner.ring.iter().skip(skip)) {
            *dst = *src;
        }
    }
}

impl Default for SharedCaptureState {
    fn default() -> Self {
        Self::new()
    }
}

/// Microphone capture handle owning the PipeWire thread
pub struct MicCapture {
    state: SharedCaptureState,
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    sender: Option<pw::channel::Sender<LoopCommand>>,
}

enum LoopCommand {
    Quit,
}

impl MicCapture {
    pub fn new() -> Self {
        Self {
            state: SharedCaptureState::new(),
            is_running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            sender: None,
        }
    }

    /// Get shared capture state for the analysis tick
    pub fn shared_state(&self) -> SharedCaptureState {
        self.state.clone()
    }

    /// Start capturing audio.
    ///
    /// Blocks until the capture stream is connected or setup fails, so the
    /// caller observes either a fully initialized capture or an error with
    /// nothing acquired, never a half-built one.
    pub fn start(&mut self) -> Result<(), String> {
        if self.is_running.load(Ordering::SeqCst) {
            return Err("Capture already running".to_string());
        }

        self.state.reset();
        self.state.set_state(CaptureState::Capturing);
        self.is_running.store(true, Ordering::SeqCst);

        let state = self.state.clone();
        let is_running = self.is_running.clone();

        let (sender, receiver) = pw::channel::channel::<LoopCommand>();
        self.sender = Some(sender);

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let handle = thread::spawn(move || {
            if let Err(e) = run_capture_loop(state.clone(), receiver, &ready_tx) {
                log::error!("Capture thread failed: {}", e);
                state.set_error(e.clone());
                // Ignored when the loop already reported readiness.
                let _ = ready_tx.send(Err(e));
            }
            is_running.store(false, Ordering::SeqCst);
        });
        self.thread_handle = Some(handle);

        match ready_rx.recv_timeout(ACQUIRE_TIMEOUT) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.stop();
                Err(e)
            }
            Err(_) => {
                // Thread hung or died without reporting; tear it down.
                self.stop();
                Err("Timed out waiting for the audio device".to_string())
            }
        }
    }

    /// Stop capturing and release the device.
    ///
    /// Joins the capture thread, so resources acquired by a grant that
    /// resolved after the stop request are still released before this
    /// returns. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(LoopCommand::Quit);
        }

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        self.is_running.store(false, Ordering::SeqCst);
        self.state.reset();
    }
}

impl Default for MicCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run the PipeWire capture loop in a background thread.
///
/// Sends exactly one readiness report on `ready` once the stream is
/// connected; setup failures are reported by the caller from the returned
/// error instead.
fn run_capture_loop(
    state: SharedCaptureState,
    receiver: pw::channel::Receiver<LoopCommand>,
    ready: &mpsc::Sender<Result<(), String>>,
) -> Result<(), String> {
    pw::init();

    let mainloop = pw::main_loop::MainLoopRc::new(None)
        .map_err(|e| format!("Failed to create PipeWire main loop: {}", e))?;

    let context = pw::context::ContextRc::new(&mainloop, None)
        .map_err(|e| format!("Failed to create PipeWire context: {}", e))?;

    let core = context
        .connect_rc(None)
        .map_err(|e| format!("Failed to connect to PipeWire: {}", e))?;

    let mainloop_weak = mainloop.downgrade();
    let _receiver = receiver.attach(mainloop.loop_(), move |cmd| match cmd {
        LoopCommand::Quit => {
            if let Some(mainloop) = mainloop_weak.upgrade() {
                mainloop.quit();
            }
        }
    });

    struct UserData {
        format: spa::param::audio::AudioInfoRaw,
        state: SharedCaptureState,
    }

    let user_data = UserData {
        format: Default::default(),
        state: state.clone(),
    };

    // The Communication role routes the stream through the desktop's
    // echo-cancellation / noise-suppression filter chain where one exists.
    let props = pw::properties::properties! {
        *pw::keys::MEDIA_TYPE => "Audio",
        *pw::keys::MEDIA_CATEGORY => "Capture",
        *pw::keys::MEDIA_ROLE => "Communication",
        *pw::keys::APP_NAME => "Hum",
    };

    let stream = pw::stream::StreamBox::new(&core, "hum-capture", props)
        .map_err(|e| format!("Failed to create PipeWire stream: {}", e))?;

    let _listener = stream
        .add_local_listener_with_user_data(user_data)
        .param_changed(|_, user_data, id, param| {
            let Some(param) = param else { return };
            if id != spa::param::ParamType::Format.as_raw() {
                return;
            }

            let (media_type, media_subtype) = match format_utils::parse_format(param) {
                Ok(v) => v,
                Err(_) => return,
            };

            if media_type != MediaType::Audio || media_subtype != MediaSubtype::Raw {
                return;
            }

            if user_data.format.parse(param).is_err() {
                log::warn!("Could not parse negotiated audio format");
            }
        })
        .process(|stream, user_data| {
            let Some(mut buffer) = stream.dequeue_buffer() else {
                return;
            };

            let datas = buffer.datas_mut();
            if datas.is_empty() {
                return;
            }

            let data = &mut datas[0];
            let n_channels = user_data.format.channels().max(1);
            let sample_rate = user_data.format.rate();
            let n_samples = data.chunk().size() / (std::mem::size_of::<f32>() as u32);

            if let Some(raw_samples) = data.data() {
                // Take the first channel of each frame as the mono signal.
                let mut mono_samples = Vec::with_capacity((n_samples / n_channels) as usize);

                for i in (0..n_samples).step_by(n_channels as usize) {
                    let start = i as usize * std::mem::size_of::<f32>();
                    let end = start + std::mem::size_of::<f32>();
                    if end <= raw_samples.len() {
                        let sample = f32::from_le_bytes(
                            raw_samples[start..end].try_into().unwrap_or([0; 4]),
                        );
                        mono_samples.push(sample);
                    }
                }

                user_data.state.push_samples(&mono_samples, sample_rate);
            }
        })
        .register()
        .map_err(|e| format!("Failed to register stream listener: {}", e))?;

    // Request F32LE at the target rate; the device may negotiate another
    // rate, which the format callback reports back.
    let mut audio_info = spa::param::audio::AudioInfoRaw::new();
    audio_info.set_format(spa::param::audio::AudioFormat::F32LE);
    audio_info.set_rate(TARGET_SAMPLE_RATE);

    let obj = spa::pod::Object {
        type_: spa::utils::SpaTypes::ObjectParamFormat.as_raw(),
        id: spa::param::ParamType::EnumFormat.as_raw(),
        properties: audio_info.into(),
    };

    let values: Vec<u8> = spa::pod::serialize::PodSerializer::serialize(
        std::io::Cursor::new(Vec::new()),
        &spa::pod::Value::Object(obj),
    )
    .map_err(|e| format!("Failed to serialize audio format: {:?}", e))?
    .0
    .into_inner();

    let pod = Pod::from_bytes(&values).ok_or_else(|| "Failed to build format pod".to_string())?;
    let mut params = [pod];

    stream
        .connect(
            spa::utils::Direction::Input,
            None,
            pw::stream::StreamFlags::AUTOCONNECT
                | pw::stream::StreamFlags::MAP_BUFFERS
                | pw::stream::StreamFlags::RT_PROCESS,
            &mut params,
        )
        .map_err(|e| format!("Failed to connect stream: {}", e))?;

    let _ = ready.send(Ok(()));

    // Run until stopped
    mainloop.run();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_zero_pads_while_filling() {
        let state = SharedCaptureState::new();
        state.push_samples(&[1.0, 2.0, 3.0], 44100);

        let mut out = [0.0f32; 5];
        state.window(&mut out);
        assert_eq!(out, [0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn window_returns_the_freshest_samples() {
        let state = SharedCaptureState::new();
        let samples: Vec<f32> = (0..RING_CAPACITY + 10).map(|i| i as f32).collect();
        state.push_samples(&samples, 44100);

        let mut out = [0.0f32; 4];
        state.window(&mut out);
        let last = (RING_CAPACITY + 9) as f32;
        assert_eq!(out, [last - 3.0, last - 2.0, last - 1.0, last]);
    }

    #[test]
    fn ring_never_exceeds_capacity() {
        let state = SharedCaptureState::new();
        for _ in 0..10 {
            state.push_samples(&vec![0.5; RING_CAPACITY / 2 + 7], 44100);
        }
        assert_eq!(state.inner.lock().unwrap().ring.len(), RING_CAPACITY);
    }

    #[test]
    fn zero_rate_does_not_clobber_the_default() {
        let state = SharedCaptureState::new();
        state.push_samples(&[0.1], 0);
        assert_eq!(state.sample_rate(), TARGET_SAMPLE_RATE);

        state.push_samples(&[0.1], 48000);
        assert_eq!(state.sample_rate(), 48000);
    }

    #[test]
    fn reset_clears_error_and_ring() {
        let state = SharedCaptureState::new();
        state.push_samples(&[0.1, 0.2], 48000);
        state.set_error("boom".to_string());
        assert_eq!(state.state(), CaptureState::Error);

        state.reset();
        assert_eq!(state.state(), CaptureState::Idle);
        assert!(state.error().is_none());
        assert_eq!(state.sample_rate(), TARGET_SAMPLE_RATE);

        let mut out = [9.0f32; 2];
        state.window(&mut out);
        assert_eq!(out, [0.0, 0.0]);
    }
}
