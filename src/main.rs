// src/main.rs

//! A minimal host for the xlib device: one window, logging callbacks.
//!
//! Usage: `xlib-device [INPUT]`. With an input file the window reloads it
//! whenever it is modified.

use xlib_device::platform::Surface;
use xlib_device::{finalize, Job, JobCallbacks, JobState, KeyAction, KeyBinding, PointF};

use anyhow::Context;
use log::{debug, info};
use std::path::PathBuf;

const CANVAS_WIDTH_PT: u32 = 620;
const CANVAS_HEIGHT_PT: u32 = 480;
const ZOOM_STEP: f64 = 1.1;

struct LoggingHost {
    paints: usize,
}

impl JobCallbacks for LoggingHost {
    fn refresh(&mut self, job: &mut JobState, surface: &Surface) {
        self.paints += 1;
        info!(
            "Paint #{} on drawable {} ({}x{}, depth {}), zoom {:.2}",
            self.paints, surface.drawable, surface.width, surface.height, surface.depth, job.zoom
        );
    }

    fn button_press(&mut self, _job: &mut JobState, button: u32, pointer: PointF) {
        info!("Button {} pressed at ({}, {})", button, pointer.x, pointer.y);
    }

    fn button_release(&mut self, _job: &mut JobState, button: u32, pointer: PointF) {
        info!("Button {} released at ({}, {})", button, pointer.x, pointer.y);
    }

    fn motion(&mut self, _job: &mut JobState, pointer: PointF) {
        debug!("Pointer at ({}, {})", pointer.x, pointer.y);
    }

    fn read(&mut self, job: &mut JobState, filename: &str, layout_type: &str) {
        info!("Reloading {} (layout {:?})", filename, layout_type);
        job.needs_refresh = true;
    }
}

fn zoom_by(factor: f64) -> impl Fn(&mut JobState) -> KeyAction {
    move |job: &mut JobState| {
        job.zoom *= factor;
        job.needs_refresh = true;
        info!("Zoom is now {:.2}", job.zoom);
        KeyAction::Continue
    }
}

fn keybindings() -> Vec<KeyBinding> {
    vec![
        KeyBinding::new("q", |_| KeyAction::Terminate),
        KeyBinding::new("plus", zoom_by(ZOOM_STEP)),
        KeyBinding::new("minus", zoom_by(1.0 / ZOOM_STEP)),
        KeyBinding::new("f", |job: &mut JobState| {
            job.fit_mode = !job.fit_mode;
            info!("Fit mode {}", if job.fit_mode { "on" } else { "off" });
            KeyAction::Continue
        }),
        KeyBinding::new("r", |job: &mut JobState| {
            job.needs_refresh = true;
            KeyAction::Continue
        }),
    ]
}

fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let mut state = JobState::with_size(CANVAS_WIDTH_PT, CANVAS_HEIGHT_PT);
    state.input_filename = std::env::args_os().nth(1).map(PathBuf::from);
    state.layout_type = "dot".to_string();
    info!("Starting xlib device, input {:?}", state.input_filename);

    let job = Job::new(state, Box::new(LoggingHost { paints: 0 })).with_keybindings(keybindings());
    let mut jobs = [job];
    finalize(&mut jobs).context("xlib device failed")?;

    info!("xlib device exited successfully.");
    Ok(())
}
