// src/device/mod.rs

//! The xlib output device.
//!
//! - `window_state`: window and pixmap creation per job.
//! - `sync`: resize handling, pixmap growth, repaint and blit.
//! - `browser`: hyperlink opening.
//! - `input`: dispatch of display events to job callbacks.
//! - `watcher`: reload on input file modification.
//! - `event_loop`: ties the above together around an epoll wait.

pub mod browser;
pub mod event_loop;
pub mod input;
pub mod sync;
pub mod watcher;
pub mod window_state;


pub use event_loop::{EventLoop, LoopState};
pub use input::DrainOutcome;
pub use window_state::WindowState;

use crate::config::CONFIG;
use crate::job::Job;
use crate::platform::backends::XlibDisplay;
use anyhow::Result;

/// Opens the configured X display and runs the event loop over `jobs`
/// until the user closes a window or quits.
pub fn finalize(jobs: &mut [Job]) -> Result<()> {
    let config = CONFIG.clone();
    let display = XlibDisplay::open(config.display.name.as_deref())?;
    EventLoop::new(display, config).run(jobs)
}
