// src/job.rs

//! The host-facing data model: jobs, the callback interface, keybindings.
//!
//! A [`Job`] is one output window. The host builds the jobs, hands them to
//! the device as a slice, and receives pointer, keyboard, paint and reload
//! notifications through its [`JobCallbacks`] implementation.

use crate::device::WindowState;
use crate::platform::Surface;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Points per inch; canvas sizes are given in points.
pub const POINTS_PER_INCH: f64 = 72.0;

/// A point in device (window) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// What a keybinding callback asks the event loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Terminate,
}

/// Callback bound to a key. Receives the job whose window had focus.
pub type KeyCallback = Rc<dyn Fn(&mut JobState) -> KeyAction>;

/// A (key name, callback) pair. Key names are X keysym names such as `"q"`,
/// `"plus"` or `"Escape"`.
#[derive(Clone)]
pub struct KeyBinding {
    pub keystring: String,
    pub callback: KeyCallback,
}

impl KeyBinding {
    pub fn new(
        keystring: impl Into<String>,
        callback: impl Fn(&mut JobState) -> KeyAction + 'static,
    ) -> Self {
        Self {
            keystring: keystring.into(),
            callback: Rc::new(callback),
        }
    }
}

impl fmt::Debug for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBinding")
            .field("keystring", &self.keystring)
            .finish_non_exhaustive()
    }
}

/// Host callbacks, one method per event kind.
///
/// Pointer and key callbacks typically update the job's zoom, focus or
/// `selected_href` and set `needs_refresh`; the device then repaints on its
/// next synchronization pass.
pub trait JobCallbacks {
    /// Paints the job onto `surface`, the off-screen pixmap. The device
    /// copies the result to the window once this returns.
    fn refresh(&mut self, job: &mut JobState, surface: &Surface);

    fn button_press(&mut self, job: &mut JobState, button: u32, pointer: PointF);

    fn button_release(&mut self, job: &mut JobState, button: u32, pointer: PointF);

    fn motion(&mut self, job: &mut JobState, pointer: PointF);

    /// The watched input file changed on disk; reload and re-layout it.
    fn read(&mut self, job: &mut JobState, filename: &str, layout_type: &str);
}

/// The mutable, callback-visible part of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    /// Canvas width; points before initialization, pixels afterwards.
    pub width: u32,
    pub height: u32,
    pub margin: PointF,
    pub zoom: f64,
    /// Rescale the drawing to the window on resize instead of clipping it.
    pub fit_mode: bool,
    /// Device resolution, filled in from the display at initialization.
    pub dpi: PointF,
    pub has_grown: bool,
    pub needs_refresh: bool,
    /// Hyperlink under the pointer, opened on button release.
    pub selected_href: Option<String>,
    pub input_filename: Option<PathBuf>,
    /// Index of the graph within its input file.
    pub graph_index: usize,
    pub layout_type: String,
}

impl Default for JobState {
    fn default() -> Self {
        JobState {
            width: 0,
            height: 0,
            margin: PointF::default(),
            zoom: 1.0,
            fit_mode: false,
            dpi: PointF::new(POINTS_PER_INCH, POINTS_PER_INCH),
            has_grown: false,
            needs_refresh: false,
            selected_href: None,
            input_filename: None,
            graph_index: 0,
            layout_type: String::new(),
        }
    }
}

impl JobState {
    pub fn with_size(width: u32, height: u32) -> Self {
        JobState {
            width,
            height,
            ..JobState::default()
        }
    }
}

/// One output target.
pub struct Job {
    pub state: JobState,
    pub keybindings: Vec<KeyBinding>,
    pub(crate) callbacks: Box<dyn JobCallbacks>,
    pub(crate) window: Option<WindowState>,
}

impl Job {
    pub fn new(state: JobState, callbacks: Box<dyn JobCallbacks>) -> Self {
        Self {
            state,
            keybindings: Vec::new(),
            callbacks,
            window: None,
        }
    }

    pub fn with_keybindings(mut self, keybindings: Vec<KeyBinding>) -> Self {
        self.keybindings = keybindings;
        self
    }

    /// The window record, once the device has initialized this job.
    pub fn window(&self) -> Option<&WindowState> {
        self.window.as_ref()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("state", &self.state)
            .field("keybindings", &self.keybindings)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
