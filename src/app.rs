//! Main application component for Hum

use crate::analysis::SignalPair;
use crate::audio::CaptureController;
use crate::state::{AppState, CaptureStatus};
use gpui::prelude::*;
use gpui::{InteractiveElement, *};
use log::error;
use std::time::Duration;

/// Orb diameter at rest, before the pulse scale is applied
const ORB_BASE_PX: f32 = 140.0;
/// Square region reserved for the orb so layout doesn't shift as it pulses
const ORB_AREA_PX: f32 = 320.0;

/// Visual parameters derived from one frame's signals
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrbParams {
    /// Diameter multiplier for the orb core
    scale: f32,
    /// Halo radius in px beyond the core edge
    glow: f32,
}

fn orb_params(signals: SignalPair) -> OrbParams {
    let drive = signals.level + signals.pitch;
    OrbParams {
        scale: 1.0 + drive * 0.3,
        glow: drive * 30.0,
    }
}

/// Fixed colors for the two capture states, selected solely by `is_capturing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrbPalette {
    core: u32,
    /// RGBA, translucent
    halo: u32,
}

fn orb_palette(is_capturing: bool) -> OrbPalette {
    if is_capturing {
        OrbPalette {
            core: 0xe94560,
            halo: 0xe9456038,
        }
    } else {
        OrbPalette {
            core: 0x3d3d54,
            halo: 0x2d2d4438,
        }
    }
}

/// The root application view
pub struct Hum {
    state: AppState,
    controller: CaptureController,
    _refresh_task: Option<Task<()>>,
}

impl Hum {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            state: AppState::new(),
            controller: CaptureController::new(),
            _refresh_task: None,
        }
    }

    fn toggle_capture(&mut self, cx: &mut Context<Self>) {
        if self.state.is_capturing {
            self.stop_capture();
        } else {
            self.start_capture(cx);
        }
    }

    /// Acquire the microphone and start the per-frame analysis
    fn start_capture(&mut self, cx: &mut Context<Self>) {
        match self.controller.start() {
            Ok(()) => {
                self.state.capture_started();
                self.start_refresh_task(cx);
            }
            Err(e) => {
                error!("Failed to start microphone capture: {}", e);
                self.state.capture_failed(e);
            }
        }
    }

    /// Release the microphone and zero the signals. Safe when already idle.
    fn stop_capture(&mut self) {
        self.controller.stop();
        self.state.capture_stopped();
        self._refresh_task = None;
    }

    /// One display frame: run the analysis tick and publish its signals
    fn frame_tick(&mut self) {
        match self.controller.tick() {
            Ok(Some(signals)) => self.state.set_signals(signals),
            Ok(None) => {}
            Err(e) => {
                error!("Microphone capture failed: {}", e);
                self.state.capture_stopped();
                self.state.capture_failed(e);
                self._refresh_task = None;
            }
        }
    }

    /// Spawn a task that ticks the analysis and refreshes the UI at ~60fps
    /// while capturing
    fn start_refresh_task(&mut self, cx: &mut Context<Self>) {
        self._refresh_task = Some(cx.spawn({
            async move |this: WeakEntity<Self>, cx: &mut AsyncApp| {
                loop {
                    // Wait one display frame
                    cx.background_executor()
                        .timer(Duration::from_millis(16))
                        .await;

                    let Some(this) = this.upgrade() else {
                        break;
                    };

                    let still_capturing = cx.update_entity(&this, |this, cx| {
                        this.frame_tick();
                        cx.notify();
                        this.state.is_capturing
                    });

                    match still_capturing {
                        Ok(true) => continue,
                        _ => break,
                    }
                }
            }
        }));
    }
}

impl Render for Hum {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let status = self.state.status();
        let is_capturing = self.state.is_capturing;
        let show_help = self.state.show_help;
        let last_error = self.state.last_error.clone();

        let params = orb_params(self.state.signals);
        let palette = orb_palette(is_capturing);
        let core_px = ORB_BASE_PX * params.scale;
        let halo_px = core_px + params.glow * 2.0;

        let (dot_color, caption, hint) = match status {
            CaptureStatus::Recording => (
                0xe94560,
                "Recording",
                "Listening to your microphone",
            ),
            CaptureStatus::Ready => (
                0x4CAF50,
                "Ready",
                "Microphone granted, press Start or Space",
            ),
            CaptureStatus::NotYetRequested => (
                0x888888,
                "Idle",
                "Press Start to request the microphone",
            ),
        };

        div()
            .size_full()
            .flex()
            .flex_col()
            .bg(rgb(0x0f0f1a))
            .key_context("Hum")
            .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                match event.keystroke.key.as_str() {
                    "f1" => {
                        this.state.toggle_help();
                    }
                    "escape" => {
                        if this.state.show_help {
                            this.state.toggle_help();
                        } else if this.state.is_capturing {
                            this.stop_capture();
                        }
                    }
                    "space" if !this.state.show_help => {
                        this.toggle_capture(cx);
                    }
                    "q" if event.keystroke.modifiers.control => {
                        this.stop_capture();
                        window.remove_window();
                    }
                    _ => {}
                }
            }))
            // Custom titlebar
            .child(
                div()
                    .id("titlebar")
                    .flex()
                    .items_center()
                    .justify_between()
                    .w_full()
                    .h(px(36.0))
                    .bg(rgb(0x12121f))
                    .border_b_1()
                    .border_color(rgb(0x2d2d44))
                    .child(
                        // Window title (left side) - draggable area
                        div()
                            .id("titlebar-drag-area")
                            .flex()
                            .flex_grow()
                            .items_center()
                            .h_full()
                            .gap_2()
                            .px_4()
                            .on_mouse_down(
                                MouseButton::Left,
                                cx.listener(|_this, _event: &MouseDownEvent, window, _cx| {
                                    window.start_window_move();
                                }),
                            )
                            .child(
                                div()
                                    .text_sm()
                                    .font_weight(FontWeight::SEMIBOLD)
                                    .text_color(rgb(0xcccccc))
                                    .child("Hum"),
                            ),
                    )
                    .child(
                        // Close button (right side) - NOT draggable
                        div()
                            .id("close-button")
                            .w(px(46.0))
                            .h(px(36.0))
                            .flex()
                            .items_center()
                            .justify_center()
                            .cursor_pointer()
                            .hover(|style| style.bg(rgb(0xe81123)))
                            .on_click(cx.listener(|this, _, window, _cx| {
                                this.stop_capture();
                                window.remove_window();
                            }))
                            .child(div().text_lg().text_color(rgb(0xcccccc)).child("×")),
                    ),
            )
            // Main content
            .child(
                div()
                    .flex_grow()
                    .relative()
                    .flex()
                    .flex_col()
                    .items_center()
                    .justify_center()
                    .gap_6()
                    .child(
                        // Status readout: colored dot + caption
                        div()
                            .flex()
                            .items_center()
                            .gap_2()
                            .child(div().w(px(8.0)).h(px(8.0)).rounded_full().bg(rgb(dot_color)))
                            .child(
                                div()
                                    .text_xl()
                                    .font_weight(FontWeight::BOLD)
                                    .text_color(rgb(0xffffff))
                                    .child(caption),
                            ),
                    )
                    .child(
                        // The orb: translucent halo sized by glow, solid core
                        // sized by the pulse scale
                        div()
                            .w(px(ORB_AREA_PX))
                            .h(px(ORB_AREA_PX))
                            .flex()
                            .items_center()
                            .justify_center()
                            .child(
                                div()
                                    .w(px(halo_px))
                                    .h(px(halo_px))
                                    .rounded_full()
                                    .bg(rgba(palette.halo))
                                    .flex()
                                    .items_center()
                                    .justify_center()
                                    .child(
                                        div()
                                            .w(px(core_px))
                                            .h(px(core_px))
                                            .rounded_full()
                                            .bg(rgb(palette.core)),
                                    ),
                            ),
                    )
                    .when_some(last_error, |el, err| {
                        el.child(
                            div()
                                .px_4()
                                .py_2()
                                .rounded_lg()
                                .border_1()
                                .border_color(rgb(0xe94560))
                                .text_sm()
                                .text_color(rgb(0xe94560))
                                .child(err),
                        )
                    })
                    .child(
                        // Toggle affordance
                        div()
                            .id("btn-toggle")
                            .px_6()
                            .py_3()
                            .rounded_lg()
                            .bg(if is_capturing {
                                rgb(0x4CAF50)
                            } else {
                                rgb(0xe94560)
                            })
                            .text_color(rgb(0xffffff))
                            .font_weight(FontWeight::SEMIBOLD)
                            .cursor_pointer()
                            .hover(|style| style.opacity(0.9))
                            .on_click(cx.listener(|this, _, _w, cx| {
                                this.toggle_capture(cx);
                            }))
                            .child(if is_capturing { "Stop" } else { "Start" }),
                    )
                    .child(div().text_sm().text_color(rgb(0x888888)).mt_4().child(hint))
                    .when(show_help, |el| el.child(render_help_overlay())),
            )
    }
}

fn render_help_overlay() -> impl IntoElement {
    div()
        .absolute()
        .inset_0()
        .bg(rgba(0x000000aa))
        .flex()
        .items_center()
        .justify_center()
        .child(
            div()
                .w(px(340.0))
                .bg(rgb(0x1a1a2e))
                .rounded_xl()
                .border_1()
                .border_color(rgb(0x2d2d44))
                .overflow_hidden()
                .flex()
                .flex_col()
                .child(
                    div()
                        .px_6()
                        .py_4()
                        .border_b_1()
                        .border_color(rgb(0x2d2d44))
                        .flex()
                        .justify_between()
                        .items_center()
                        .child(
                            div()
                                .text_xl()
                                .font_weight(FontWeight::BOLD)
                                .text_color(rgb(0xffffff))
                                .child("Hum Help"),
                        )
                        .child(
                            div()
                                .text_sm()
                                .text_color(rgb(0x888888))
                                .child("Press ESC or F1 to close"),
                        ),
                )
                .child(
                    div()
                        .p_6()
                        .flex()
                        .flex_col()
                        .gap_2()
                        .children(
                            [
                                ("Space", "Start/stop listening"),
                                ("Escape", "Stop listening / close overlay"),
                                ("F1", "Toggle this help"),
                                ("Ctrl+Q", "Quit"),
                            ]
                            .into_iter()
                            .map(|(key, desc)| {
                                div()
                                    .flex()
                                    .gap_4()
                                    .child(
                                        div()
                                            .w(px(80.0))
                                            .px_2()
                                            .py_1()
                                            .rounded_sm()
                                            .bg(rgb(0x2d2d44))
                                            .text_sm()
                                            .text_color(rgb(0xe94560))
                                            .child(key.to_string()),
                                    )
                                    .child(
                                        div()
                                            .text_sm()
                                            .text_color(rgb(0xcccccc))
                                            .child(desc.to_string()),
                                    )
                            }),
                        ),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orb_params_follow_the_pulse_formulas() {
        let silent = orb_params(SignalPair::default());
        assert_eq!(silent.scale, 1.0);
        assert_eq!(silent.glow, 0.0);

        let signals = SignalPair {
            level: 0.5,
            pitch: 0.25,
        };
        let params = orb_params(signals);
        assert!((params.scale - 1.225).abs() < 1e-6);
        assert!((params.glow - 22.5).abs() < 1e-6);
    }

    #[test]
    fn orb_params_peak_at_full_drive() {
        let params = orb_params(SignalPair {
            level: 1.0,
            pitch: 1.0,
        });
        assert!((params.scale - 1.6).abs() < 1e-6);
        assert!((params.glow - 60.0).abs() < 1e-6);
    }

    #[test]
    fn palette_is_selected_only_by_capture_state() {
        assert_eq!(orb_palette(true), orb_palette(true));
        assert_eq!(orb_palette(false), orb_palette(false));
        assert_ne!(orb_palette(true), orb_palette(false));
    }
}
