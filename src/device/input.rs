// src/device/input.rs

//! Routes display events to the job that owns the event's window.

use super::browser::Browser;
use super::sync;
use crate::job::{Job, KeyAction, PointF};
use crate::keys::KeyTable;
use crate::platform::{DisplayBackend, RawEvent, RawEventKind};
use log::{debug, info, trace};

/// Result of draining the display queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue ran dry; carries the number of events acted on.
    Handled(usize),
    /// A window was closed or a key callback asked to quit.
    Terminate,
}

enum Dispatch {
    Handled,
    Ignored,
    Terminate,
}

/// Consumes every queued display event.
///
/// Returns as soon as an event asks for termination; events still queued
/// behind it are left unread.
pub fn drain<D: DisplayBackend + ?Sized>(
    display: &mut D,
    jobs: &mut [Job],
    keys: &KeyTable,
    browser: &mut Browser,
) -> DrainOutcome {
    let mut handled = 0;
    while let Some(event) = display.next_event() {
        let Some(job) = jobs
            .iter_mut()
            .find(|job| job.window.as_ref().map(|w| w.native.id) == Some(event.window))
        else {
            trace!("Event for unknown window {}: {:?}", event.window, event.kind);
            continue;
        };
        match dispatch(display, job, event, keys, browser) {
            Dispatch::Handled => handled += 1,
            Dispatch::Ignored => {}
            Dispatch::Terminate => return DrainOutcome::Terminate,
        }
    }
    DrainOutcome::Handled(handled)
}

fn dispatch<D: DisplayBackend + ?Sized>(
    display: &mut D,
    job: &mut Job,
    event: RawEvent,
    keys: &KeyTable,
    browser: &mut Browser,
) -> Dispatch {
    match event.kind {
        RawEventKind::ButtonPress { button, x, y } => {
            let pointer = PointF::new(x as f64, y as f64);
            job.callbacks.button_press(&mut job.state, button, pointer);
            Dispatch::Handled
        }
        RawEventKind::ButtonRelease { button, x, y } => {
            let pointer = PointF::new(x as f64, y as f64);
            job.callbacks.button_release(&mut job.state, button, pointer);
            if let Some(href) = job.state.selected_href.as_deref().filter(|h| !h.is_empty()) {
                browser.show(href);
            }
            Dispatch::Handled
        }
        RawEventKind::Motion { x, y } => {
            job.callbacks
                .motion(&mut job.state, PointF::new(x as f64, y as f64));
            Dispatch::Handled
        }
        RawEventKind::KeyPress { keycode } => match keys.lookup(keycode) {
            Some(callback) => {
                debug!("Keycode {} matched a binding", keycode);
                match callback(&mut job.state) {
                    KeyAction::Continue => Dispatch::Handled,
                    KeyAction::Terminate => {
                        info!("Key binding requested exit");
                        Dispatch::Terminate
                    }
                }
            }
            None => {
                trace!("Keycode {} is not bound", keycode);
                Dispatch::Ignored
            }
        },
        RawEventKind::Configure { width, height } => {
            sync::configure(&mut job.state, width, height);
            Dispatch::Handled
        }
        RawEventKind::Expose(area) => {
            sync::expose(display, job, area);
            Dispatch::Handled
        }
        RawEventKind::ClientMessage { format, data0 } => {
            let delete_atom = job.window.as_ref().map(|w| w.native.wm_delete_window);
            if format == 32 && Some(data0) == delete_atom {
                info!("Window {} closed by the window manager", event.window);
                Dispatch::Terminate
            } else {
                trace!("Ignoring client message (format {}, data {})", format, data0);
                Dispatch::Handled
            }
        }
        RawEventKind::Other(kind) => {
            trace!("Ignoring event type {}", kind);
            Dispatch::Ignored
        }
    }
}
