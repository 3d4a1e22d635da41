//! SDL2 window shell: periodic redraw of the relay's newest frame plus the
//! operator gain entry.
//!
//! The shell never talks to the camera. It reads the relay on a fixed tick
//! (O(frame copy) under the lock, never a device wait) and pushes gain
//! changes through the control channel. Notifications use SDL's blocking
//! message boxes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::{eyre::eyre, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::messagebox::{show_simple_message_box, MessageBoxFlag};
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use tracing::{info, warn};

use crate::capture::frame::{Frame, FRAME_CHANNELS, FRAME_HEIGHT, FRAME_WIDTH};
use crate::capture::WorkerEvent;
use crate::error::CameraError;
use crate::pipeline::{FrameRelay, GainControl};
use crate::DisplayConfig;

pub struct UiShell {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    /// Operator's gain entry buffer, submitted with Enter.
    entry: String,
    tick: Duration,
    /// Relay sequence of the frame currently on screen.
    last_seq: u64,
    scratch: Frame,
    feed_alive: bool,
}

impl UiShell {
    pub fn new(sdl_context: &sdl2::Sdl, config: &DisplayConfig) -> Result<Self> {
        let video_subsystem = sdl_context.video().map_err(|e| eyre!(e))?;

        let window = video_subsystem
            .window(
                "Lumen",
                FRAME_WIDTH as u32,
                FRAME_HEIGHT as u32,
            )
            .position_centered()
            .build()?;

        // Enter/Backspace arrive as key events, typed text as TextInput
        video_subsystem.text_input().start();

        let canvas = window.into_canvas().present_vsync().build()?;
        let texture_creator = canvas.texture_creator();

        Ok(Self {
            canvas,
            texture_creator,
            entry: config.initial_gain_entry.clone(),
            tick: Duration::from_millis(config.tick_ms),
            last_seq: 0,
            scratch: Frame::black(),
            feed_alive: true,
        })
    }

    /// Run the redraw/input loop until the window is closed.
    ///
    /// `startup_error` carries a capture-path failure from before the worker
    /// spawned (device not found): it is surfaced once, and the window stays
    /// open with a dead feed.
    pub fn run(
        &mut self,
        sdl_context: &sdl2::Sdl,
        relay: Arc<FrameRelay>,
        gain: Arc<GainControl>,
        events: flume::Receiver<WorkerEvent>,
        startup_error: Option<CameraError>,
    ) -> Result<()> {
        let mut event_pump = sdl_context.event_pump().map_err(|e| eyre!(e))?;

        if let Some(e) = startup_error {
            self.feed_alive = false;
            self.notify_error("Camera", &e.to_string());
        }
        self.refresh_title();

        // Paint the initial (zero) frame so the window isn't garbage until
        // the first capture lands.
        self.render_scratch()?;

        'running: loop {
            let tick_started = Instant::now();

            for event in event_pump.poll_iter() {
                match event {
                    Event::Quit { .. } => {
                        info!("Quit event received");
                        break 'running;
                    }
                    Event::TextInput { text, .. } => {
                        self.entry.push_str(&text);
                        self.refresh_title();
                    }
                    Event::KeyDown {
                        keycode: Some(Keycode::Backspace),
                        ..
                    } => {
                        self.entry.pop();
                        self.refresh_title();
                    }
                    Event::KeyDown {
                        keycode: Some(Keycode::Return),
                        ..
                    } => self.submit_gain(&gain),
                    _ => {}
                }
            }

            for event in events.try_iter() {
                match event {
                    WorkerEvent::GainRejected { value, reason } => {
                        // UI-initiated action, so this one is surfaced.
                        self.notify_error(
                            "Gain",
                            &format!("Sensor rejected gain {value}: {reason}"),
                        );
                    }
                    WorkerEvent::Stopped { reason } => {
                        if let Some(reason) = reason {
                            warn!(%reason, "capture stopped, feed is dead");
                        } else {
                            info!("capture stopped");
                        }
                        self.feed_alive = false;
                        self.refresh_title();
                    }
                }
            }

            if let Some(seq) = relay.snapshot_if_newer(self.last_seq, &mut self.scratch) {
                self.last_seq = seq;
                self.render_scratch()?;
            }

            let elapsed = tick_started.elapsed();
            if elapsed < self.tick {
                std::thread::sleep(self.tick - elapsed);
            }
        }

        Ok(())
    }

    fn render_scratch(&mut self) -> Result<()> {
        let render_start = Instant::now();

        let mut texture = self
            .texture_creator
            .create_texture_streaming(
                PixelFormatEnum::RGB24,
                FRAME_WIDTH as u32,
                FRAME_HEIGHT as u32,
            )
            .map_err(|e| eyre!(e))?;

        texture
            .update(None, self.scratch.as_bytes(), FRAME_WIDTH * FRAME_CHANNELS)
            .map_err(|e| eyre!(e))?;

        self.canvas.clear();
        self.canvas
            .copy(&texture, None, None)
            .map_err(|e| eyre!(e))?;
        self.canvas.present();

        metrics::histogram!("render_time_us").record(render_start.elapsed().as_micros() as f64);
        Ok(())
    }

    /// Validation happens here, at the boundary where the request is
    /// authored; the worker only ever sees in-range values.
    fn submit_gain(&mut self, gain: &GainControl) {
        match gain.parse_request(&self.entry) {
            Ok(value) => {
                self.notify_info("Gain", &format!("Gain {value} queued for the sensor"));
            }
            Err(e) => self.notify_error("Gain", &e.to_string()),
        }
    }

    /// The entry buffer and feed state live in the title bar; the canvas is
    /// video only.
    fn refresh_title(&mut self) {
        let feed = if self.feed_alive { "live" } else { "no feed" };
        let title = format!("Lumen [{}] | gain: {}_", feed, self.entry);
        if let Err(e) = self.canvas.window_mut().set_title(&title) {
            warn!(error = %e, "failed to set window title");
        }
    }

    fn notify_info(&self, title: &str, message: &str) {
        info!("{title}: {message}");
        if let Err(e) = show_simple_message_box(
            MessageBoxFlag::INFORMATION,
            title,
            message,
            self.canvas.window(),
        ) {
            warn!(error = %e, "failed to show message box");
        }
    }

    fn notify_error(&self, title: &str, message: &str) {
        warn!("{title}: {message}");
        if let Err(e) =
            show_simple_message_box(MessageBoxFlag::ERROR, title, message, self.canvas.window())
        {
            warn!(error = %e, "failed to show message box");
        }
    }
}
