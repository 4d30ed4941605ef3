// src/device/window_state.rs

//! Per-job window records and their creation.

use crate::config::Config;
use crate::job::{Job, JobState, PointF, POINTS_PER_INCH};
use crate::platform::{DisplayBackend, NativeWindow, PixmapId, ScreenMetrics, WindowId, WindowSpec};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::path::Path;

const MM_PER_INCH: f64 = 25.4;
const FALLBACK_DPI: f64 = 96.0;

/// The window, off-screen pixmap and protocol handles of one job.
#[derive(Debug)]
pub struct WindowState {
    pub(crate) native: NativeWindow,
    pub(crate) pixmap: PixmapId,
    pub(crate) pixmap_width: u32,
    pub(crate) pixmap_height: u32,
}

impl WindowState {
    pub fn window_id(&self) -> WindowId {
        self.native.id
    }

    pub fn native(&self) -> &NativeWindow {
        &self.native
    }

    pub fn pixmap_size(&self) -> (u32, u32) {
        (self.pixmap_width, self.pixmap_height)
    }
}

fn axis_dpi(px: u32, mm: u32, axis: char) -> f64 {
    if mm == 0 {
        warn!(
            "Screen reports no physical {} size, assuming {} dpi",
            axis, FALLBACK_DPI
        );
        return FALLBACK_DPI;
    }
    px as f64 * MM_PER_INCH / mm as f64
}

/// Device resolution from the screen's pixel and millimetre sizes.
pub fn resolution(metrics: ScreenMetrics) -> PointF {
    PointF::new(
        axis_dpi(metrics.width_px, metrics.width_mm, 'x'),
        axis_dpi(metrics.height_px, metrics.height_mm, 'y'),
    )
}

/// Window size in pixels for a canvas given in points, margins included.
pub fn device_size(state: &JobState) -> (u32, u32) {
    let width = (state.width as f64 + 2.0 * state.margin.x) * state.dpi.x / POINTS_PER_INCH;
    let height = (state.height as f64 + 2.0 * state.margin.y) * state.dpi.y / POINTS_PER_INCH;
    (width.max(0.0) as u32, height.max(0.0) as u32)
}

fn icon_name(input: Option<&Path>) -> String {
    input
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Creates the window and pixmap of one job and maps the window.
///
/// On failure nothing created here is left behind.
pub fn initialize<D: DisplayBackend + ?Sized>(
    display: &mut D,
    job: &mut Job,
    config: &Config,
) -> Result<()> {
    let state = &mut job.state;
    state.dpi = resolution(display.screen_metrics());
    let (width, height) = device_size(state);
    state.width = width;
    state.height = height;
    if let Some(geometry) = config.window.geometry() {
        debug!(
            "Geometry override {}x{} replaces {}x{}",
            geometry.width, geometry.height, width, height
        );
        state.width = geometry.width;
        state.height = geometry.height;
    }
    state.has_grown = false;
    state.needs_refresh = true;

    let base = icon_name(state.input_filename.as_deref());
    let spec = WindowSpec {
        width: state.width,
        height: state.height,
        title: format!("{}{}", config.window.title_prefix, base),
        icon_name: base,
        res_name: config.window.res_name.clone(),
        res_class: config.window.res_class.clone(),
        argb: config.display.argb,
    };

    let mut native = display
        .create_window(&spec)
        .context("Failed to create output window")?;
    let pixmap = match display.create_pixmap(&native, state.width, state.height) {
        Ok(pixmap) => pixmap,
        Err(e) => {
            display.destroy_window(&native);
            return Err(e.context("Failed to create off-screen pixmap"));
        }
    };
    if let Err(e) = display.map_window(&mut native) {
        display.free_pixmap(pixmap);
        display.destroy_window(&native);
        return Err(e.context("Failed to map output window"));
    }

    info!(
        "Window {} ready: {}x{} px at {:.1}x{:.1} dpi",
        native.id, state.width, state.height, state.dpi.x, state.dpi.y
    );
    job.window = Some(WindowState {
        native,
        pixmap,
        pixmap_width: state.width,
        pixmap_height: state.height,
    });
    Ok(())
}

/// Initializes every job in order. If job `k` fails, the windows of jobs
/// `0..k` are torn down before the error is returned.
pub fn initialize_all<D: DisplayBackend + ?Sized>(
    display: &mut D,
    jobs: &mut [Job],
    config: &Config,
) -> Result<()> {
    for index in 0..jobs.len() {
        if let Err(e) = initialize(display, &mut jobs[index], config) {
            error!("Window setup failed for job {}: {:#}", index, e);
            for job in &mut jobs[..index] {
                teardown(display, job);
            }
            return Err(e.context(format!("Failed to initialize job {}", index)));
        }
    }
    Ok(())
}

/// Frees the pixmap and destroys the window of an initialized job.
pub fn teardown<D: DisplayBackend + ?Sized>(display: &mut D, job: &mut Job) {
    if let Some(window) = job.window.take() {
        if window.pixmap != 0 {
            display.free_pixmap(window.pixmap);
        }
        display.destroy_window(&window.native);
    }
}
