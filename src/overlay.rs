//! Always-on-top caption overlay.
//!
//! A borderless, semi-transparent, single-line window showing the latest
//! emitted caption. In overlay mode the egui event loop owns the process's
//! blocking wait, and the repaint timer doubles as the processing cycle
//! driver: every tick the app runs one pipeline cycle before painting. Slow
//! inference therefore visibly stalls repaints; that is the accepted cost of
//! keeping the processing context single-threaded.

use crate::audio::AudioStream;
use crate::pipeline::SpeechEngine;
use crate::session::Session;
use crate::sink::OverlayHandle;
use anyhow::{anyhow, Result};
use eframe::egui;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

const OVERLAY_WIDTH: f32 = 800.0;
const OVERLAY_HEIGHT: f32 = 80.0;
const CAPTION_TEXT_SIZE: f32 = 24.0;
const BACKGROUND_ALPHA: u8 = 200;

/// Run the overlay event loop until the window closes or the stop flag is
/// raised. Consumes the session; resources are released before this returns.
pub fn run<E, S>(
    session: Session<E, S>,
    handle: OverlayHandle,
    stop: Arc<AtomicBool>,
    tick_ms: u64,
) -> Result<()>
where
    E: SpeechEngine + 'static,
    S: AudioStream + 'static,
{
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("livecap")
            .with_decorations(false)
            .with_always_on_top()
            .with_transparent(true)
            .with_resizable(false)
            .with_inner_size([OVERLAY_WIDTH, OVERLAY_HEIGHT]),
        ..Default::default()
    };
    eframe::run_native(
        "livecap",
        options,
        Box::new(move |_cc| Ok(Box::new(OverlayApp::new(session, handle, stop, tick_ms)))),
    )
    .map_err(|err| anyhow!("overlay event loop failed: {err}"))
}

struct OverlayApp<E: SpeechEngine, S: AudioStream> {
    session: Session<E, S>,
    handle: OverlayHandle,
    stop: Arc<AtomicBool>,
    tick: Duration,
    last_tick: Instant,
}

impl<E: SpeechEngine, S: AudioStream> OverlayApp<E, S> {
    fn new(
        session: Session<E, S>,
        handle: OverlayHandle,
        stop: Arc<AtomicBool>,
        tick_ms: u64,
    ) -> Self {
        Self {
            session,
            handle,
            stop,
            tick: Duration::from_millis(tick_ms),
            last_tick: Instant::now(),
        }
    }
}

impl<E: SpeechEngine, S: AudioStream> eframe::App for OverlayApp<E, S> {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        // Fully transparent backdrop; the panel frame paints its own fill.
        [0.0, 0.0, 0.0, 0.0]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.stop.load(Ordering::SeqCst) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if ctx.input(|i| i.viewport().close_requested()) {
            self.session.close();
        }

        // Repaints can fire faster than the cycle period (input events); only
        // advance the pipeline on the configured cadence.
        if !self.session.is_closed() && self.last_tick.elapsed() >= self.tick {
            self.last_tick = Instant::now();
            self.session.tick();
        }

        let text = self.handle.latest();
        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(egui::Color32::from_rgba_unmultiplied(0, 0, 0, BACKGROUND_ALPHA)),
            )
            .show(ctx, |ui| {
                let response = ui.interact(
                    ui.max_rect(),
                    egui::Id::new("caption_drag"),
                    egui::Sense::click_and_drag(),
                );
                if response.drag_started_by(egui::PointerButton::Primary) {
                    ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                }
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new(text)
                            .color(egui::Color32::WHITE)
                            .size(CAPTION_TEXT_SIZE)
                            .strong(),
                    );
                });
            });

        ctx.request_repaint_after(self.tick);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.close();
    }
}
