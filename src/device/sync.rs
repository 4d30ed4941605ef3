// src/device/sync.rs

//! Keeps each window's pixmap and contents in step with its job.

use crate::job::{Job, JobState};
use crate::platform::{DisplayBackend, Rect};
use anyhow::{Context, Result};
use log::{debug, trace};

/// Applies a window resize to the job.
///
/// In fit mode the zoom follows the window, scaled against the size before
/// the resize. Growing past the previous size marks the pixmap for
/// recreation.
pub fn configure(state: &mut JobState, width: u32, height: u32) {
    if state.fit_mode && state.width > 0 && state.height > 0 {
        let zoom_x = width as f64 / state.width as f64;
        let zoom_y = height as f64 / state.height as f64;
        state.zoom = zoom_x.min(zoom_y);
        debug!("Fit mode zoom is now {:.3}", state.zoom);
    }
    if width > state.width || height > state.height {
        state.has_grown = true;
    }
    trace!(
        "Configure {}x{} -> {}x{}",
        state.width,
        state.height,
        width,
        height
    );
    state.width = width;
    state.height = height;
    state.needs_refresh = true;
}

/// Brings the window up to date with the job's flags.
///
/// A grown job gets a new pixmap at its current size. A pending refresh
/// clears the pixmap, has the host repaint it, and copies it to the window
/// in a single blit. Without pending flags this does nothing.
pub fn synchronize<D: DisplayBackend + ?Sized>(display: &mut D, job: &mut Job) -> Result<()> {
    let Job {
        state,
        callbacks,
        window,
        ..
    } = job;
    let Some(window) = window.as_mut() else {
        return Ok(());
    };

    if state.has_grown {
        display.free_pixmap(window.pixmap);
        window.pixmap = 0;
        window.pixmap = display
            .create_pixmap(&window.native, state.width, state.height)
            .with_context(|| format!("Failed to grow pixmap of window {}", window.native.id))?;
        window.pixmap_width = state.width;
        window.pixmap_height = state.height;
        debug!(
            "Window {} pixmap recreated at {}x{}",
            window.native.id, state.width, state.height
        );
        state.has_grown = false;
        state.needs_refresh = true;
    }

    if state.needs_refresh {
        display.fill_pixmap(&window.native, window.pixmap, state.width, state.height);
        let surface = display.surface(&window.native, window.pixmap, state.width, state.height);
        callbacks.refresh(state, &surface);
        state.needs_refresh = false;
        display.copy_area(
            &window.native,
            window.pixmap,
            Rect::new(0, 0, state.width, state.height),
        );
    }
    Ok(())
}

/// Repairs an exposed part of the window from the pixmap.
pub fn expose<D: DisplayBackend + ?Sized>(display: &mut D, job: &Job, area: Rect) {
    let Some(window) = job.window.as_ref() else {
        return;
    };
    match area.clip_to(window.pixmap_width, window.pixmap_height) {
        Some(clipped) => display.copy_area(&window.native, window.pixmap, clipped),
        None => trace!("Expose {:?} lies outside the pixmap", area),
    }
}
