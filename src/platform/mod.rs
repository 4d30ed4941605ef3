// src/platform/mod.rs

//! Platform layer for the xlib device.
//!
//! The device core never talks to Xlib directly. Every request it makes
//! (window and pixmap management, area copies, event retrieval, key lookup)
//! goes through the [`DisplayBackend`] trait defined here:
//! - `backends::x11`: the real implementation over Xlib.
//! - `backends::mock`: a recording implementation used by the unit tests.
//! - `os`: the epoll wait and the inotify watch used by the event loop.

use anyhow::Result;
use std::ffi::c_void;
use std::os::unix::io::RawFd;

pub mod backends;
pub mod os;

/// Server-side identifier of a window.
pub type WindowId = u64;
/// Server-side identifier of an off-screen pixmap.
pub type PixmapId = u64;
/// Physical key code as reported in key press events.
pub type Keycode = u32;

/// Physical size of the default screen, used to derive the device resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenMetrics {
    pub width_px: u32,
    pub height_px: u32,
    pub width_mm: u32,
    pub height_mm: u32,
}

/// A rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clips the rectangle to `[0, width) x [0, height)`.
    ///
    /// Returns `None` when nothing of the rectangle remains.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x0 = self.x.max(0) as i64;
        let y0 = self.y.max(0) as i64;
        let x1 = (self.x as i64 + self.width as i64).min(width as i64);
        let y1 = (self.y as i64 + self.height as i64).min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Parameters for creating an output window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub width: u32,
    pub height: u32,
    /// Full window title, e.g. `"graphviz: "`.
    pub title: String,
    /// Icon name; the base name of the input source.
    pub icon_name: String,
    pub res_name: String,
    pub res_class: String,
    /// Request a 32-bit ARGB visual when the server offers one.
    pub argb: bool,
}

/// Handles of a created window, as returned by [`DisplayBackend::create_window`].
///
/// These are plain server identifiers; the backend that created them is the
/// only thing that may use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindow {
    pub id: WindowId,
    pub colormap: u64,
    pub depth: u32,
    pub wm_delete_window: u64,
    pub event_mask: i64,
}

/// The off-screen drawable handed to the host's paint callback.
///
/// `display` and `visual` are the raw Xlib pointers (null for the mock
/// backend). Together with `drawable` they are what a cairo-xlib surface
/// needs.
#[derive(Debug, Clone, Copy)]
pub struct Surface {
    pub display: *mut c_void,
    pub visual: *mut c_void,
    pub drawable: PixmapId,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// A protocol event reduced to the fields the device reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub window: WindowId,
    pub kind: RawEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    ButtonPress { button: u32, x: i32, y: i32 },
    ButtonRelease { button: u32, x: i32, y: i32 },
    Motion { x: i32, y: i32 },
    KeyPress { keycode: Keycode },
    Configure { width: u32, height: u32 },
    Expose(Rect),
    ClientMessage { format: i32, data0: u64 },
    /// Any other protocol event type; carries the raw type code.
    Other(i32),
}

/// The X requests the device core issues.
///
/// Implementations queue requests; `flush` pushes them to the server.
pub trait DisplayBackend {
    /// File descriptor of the display connection, for the multiplexed wait.
    fn event_fd(&self) -> Option<RawFd>;

    /// Physical size of the default screen.
    fn screen_metrics(&self) -> ScreenMetrics;

    /// Creates a window, its graphics context and WM properties.
    /// The window is not mapped and selects no input yet.
    fn create_window(&mut self, spec: &WindowSpec) -> Result<NativeWindow>;

    /// Selects the device's event classes, registers `WM_DELETE_WINDOW` and
    /// maps the window.
    fn map_window(&mut self, window: &mut NativeWindow) -> Result<()>;

    /// Destroys a window and its graphics context.
    fn destroy_window(&mut self, window: &NativeWindow);

    fn create_pixmap(&mut self, window: &NativeWindow, width: u32, height: u32)
        -> Result<PixmapId>;

    fn free_pixmap(&mut self, pixmap: PixmapId);

    /// Fills `[0, width) x [0, height)` of the pixmap with the window's GC.
    fn fill_pixmap(&mut self, window: &NativeWindow, pixmap: PixmapId, width: u32, height: u32);

    /// Copies `area` from the pixmap to the same position on the window.
    fn copy_area(&mut self, window: &NativeWindow, pixmap: PixmapId, area: Rect);

    /// Describes the pixmap as a paintable surface.
    fn surface(&self, window: &NativeWindow, pixmap: PixmapId, width: u32, height: u32)
        -> Surface;

    /// Returns the next queued event without blocking, or `None` when the
    /// queue is empty.
    fn next_event(&mut self) -> Option<RawEvent>;

    /// Whether events already sit in the client-side queue. Those never make
    /// the connection fd readable again, so the caller must not block on it.
    fn has_queued_events(&self) -> bool;

    /// Resolves a key name such as `"q"` or `"Escape"` to a keycode.
    fn keycode_for(&mut self, keystring: &str) -> Option<Keycode>;

    fn flush(&mut self);
}
