// src/platform/backends/x11/graphics.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

//! Off-screen pixmap handling: creation, clearing and copying to the window.

use super::connection::Connection;
use super::window::WindowResources;
use crate::platform::{NativeWindow, PixmapId, Rect, Surface};
use anyhow::{anyhow, Result};
use log::{debug, trace};
use std::ffi::c_void;

use libc::{c_int, c_uint};
use x11::xlib;

pub fn create_pixmap(
    connection: &Connection,
    window: &NativeWindow,
    width: u32,
    height: u32,
) -> Result<PixmapId> {
    // X rejects zero-sized drawables.
    let (width, height) = (width.max(1), height.max(1));
    let pixmap = unsafe {
        xlib::XCreatePixmap(
            connection.display(),
            window.id,
            width as c_uint,
            height as c_uint,
            window.depth as c_uint,
        )
    };
    if pixmap == 0 {
        return Err(anyhow!(
            "XCreatePixmap failed for window {} ({}x{})",
            window.id,
            width,
            height
        ));
    }
    debug!(
        "Pixmap {} created for window {} ({}x{}, depth {})",
        pixmap, window.id, width, height, window.depth
    );
    Ok(pixmap)
}

pub fn free_pixmap(connection: &Connection, pixmap: PixmapId) {
    if pixmap == 0 || connection.display().is_null() {
        return;
    }
    unsafe {
        xlib::XFreePixmap(connection.display(), pixmap);
    }
    trace!("Pixmap {} freed", pixmap);
}

/// Fills the pixmap with the window GC's foreground (the background colour).
pub fn fill(connection: &Connection, resources: &WindowResources, pixmap: PixmapId, width: u32, height: u32) {
    unsafe {
        xlib::XFillRectangle(
            connection.display(),
            pixmap,
            resources.gc,
            0,
            0,
            width as c_uint,
            height as c_uint,
        );
    }
}

pub fn copy_area(
    connection: &Connection,
    window: &NativeWindow,
    resources: &WindowResources,
    pixmap: PixmapId,
    area: Rect,
) {
    unsafe {
        xlib::XCopyArea(
            connection.display(),
            pixmap,
            window.id,
            resources.gc,
            area.x as c_int,
            area.y as c_int,
            area.width as c_uint,
            area.height as c_uint,
            area.x as c_int,
            area.y as c_int,
        );
    }
    trace!(
        "Copied {:?} from pixmap {} to window {}",
        area,
        pixmap,
        window.id
    );
}

pub fn surface(
    connection: &Connection,
    window: &NativeWindow,
    visual: *mut xlib::Visual,
    pixmap: PixmapId,
    width: u32,
    height: u32,
) -> Surface {
    Surface {
        display: connection.display() as *mut c_void,
        visual: visual as *mut c_void,
        drawable: pixmap,
        width,
        height,
        depth: window.depth,
    }
}
