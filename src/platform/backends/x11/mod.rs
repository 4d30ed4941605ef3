// src/platform/backends/x11/mod.rs

//! Xlib implementation of [`DisplayBackend`].
//!
//! `XlibDisplay` coordinates the submodules:
//! - `connection`: the display connection and default screen resources.
//! - `window`: window creation, WM properties and protocols.
//! - `graphics`: pixmaps, fills and area copies.
//! - `event`: translation of `XEvent`s into `RawEvent`s.

use crate::platform::{
    DisplayBackend, Keycode, NativeWindow, PixmapId, RawEvent, Rect, ScreenMetrics, Surface,
    WindowId, WindowSpec,
};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::ffi::CString;
use std::os::unix::io::RawFd;

pub mod connection;
pub mod event;
pub mod graphics;
pub mod window;

use connection::Connection;
use window::WindowResources;
use x11::xlib;

pub struct XlibDisplay {
    connection: Connection,
    windows: HashMap<WindowId, WindowResources>,
}

impl XlibDisplay {
    /// Connects to the named display, or `$DISPLAY` when `name` is `None`.
    pub fn open(name: Option<&str>) -> Result<Self> {
        let connection = Connection::open(name).map_err(|e| {
            error!("{}", e);
            e
        })?;
        info!("X11 connection established successfully.");
        Ok(Self {
            connection,
            windows: HashMap::new(),
        })
    }

    fn resources(&self, window: &NativeWindow) -> Option<&WindowResources> {
        let found = self.windows.get(&window.id);
        if found.is_none() {
            warn!("No client-side resources for window {}", window.id);
        }
        found
    }
}

impl DisplayBackend for XlibDisplay {
    fn event_fd(&self) -> Option<RawFd> {
        self.connection.get_event_fd()
    }

    fn screen_metrics(&self) -> ScreenMetrics {
        self.connection.screen_metrics()
    }

    fn create_window(&mut self, spec: &WindowSpec) -> Result<NativeWindow> {
        let (native, resources) = window::create(&self.connection, spec)?;
        self.windows.insert(native.id, resources);
        Ok(native)
    }

    fn map_window(&mut self, window: &mut NativeWindow) -> Result<()> {
        window::select_input_and_map(&self.connection, window)
    }

    fn destroy_window(&mut self, window: &NativeWindow) {
        if let Some(resources) = self.windows.remove(&window.id) {
            window::destroy(&self.connection, window, &resources);
        }
    }

    fn create_pixmap(&mut self, window: &NativeWindow, width: u32, height: u32) -> Result<PixmapId> {
        graphics::create_pixmap(&self.connection, window, width, height)
    }

    fn free_pixmap(&mut self, pixmap: PixmapId) {
        graphics::free_pixmap(&self.connection, pixmap);
    }

    fn fill_pixmap(&mut self, window: &NativeWindow, pixmap: PixmapId, width: u32, height: u32) {
        if let Some(resources) = self.resources(window) {
            graphics::fill(&self.connection, resources, pixmap, width, height);
        }
    }

    fn copy_area(&mut self, window: &NativeWindow, pixmap: PixmapId, area: Rect) {
        if let Some(resources) = self.resources(window) {
            graphics::copy_area(&self.connection, window, resources, pixmap, area);
        }
    }

    fn surface(&self, window: &NativeWindow, pixmap: PixmapId, width: u32, height: u32) -> Surface {
        let visual = self
            .windows
            .get(&window.id)
            .map_or(self.connection.visual(), |r| r.visual);
        graphics::surface(&self.connection, window, visual, pixmap, width, height)
    }

    fn next_event(&mut self) -> Option<RawEvent> {
        event::next_pending(&self.connection)
    }

    fn has_queued_events(&self) -> bool {
        event::queued_already(&self.connection)
    }

    fn keycode_for(&mut self, keystring: &str) -> Option<Keycode> {
        let c_key = CString::new(keystring)
            .with_context(|| format!("Key string {:?} contains a NUL byte", keystring))
            .map_err(|e| warn!("{:#}", e))
            .ok()?;
        let keysym = unsafe { xlib::XStringToKeysym(c_key.as_ptr()) };
        if keysym == 0 {
            return None;
        }
        let keycode = unsafe { xlib::XKeysymToKeycode(self.connection.display(), keysym) };
        debug!(
            "Key {:?} resolved to keysym {:#x}, keycode {}",
            keystring, keysym, keycode
        );
        if keycode == 0 {
            None
        } else {
            Some(keycode as Keycode)
        }
    }

    fn flush(&mut self) {
        let display = self.connection.display();
        if !display.is_null() {
            unsafe {
                xlib::XFlush(display);
            }
        }
    }
}

impl Drop for XlibDisplay {
    fn drop(&mut self) {
        if !self.windows.is_empty() {
            debug!(
                "XlibDisplay dropped with {} live windows; closing the display releases them.",
                self.windows.len()
            );
        }
        self.connection.cleanup();
    }
}
