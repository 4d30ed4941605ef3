// src/platform/backends/x11/event.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use crate::platform::{RawEvent, RawEventKind, Rect};

use log::trace;
use std::mem;
use x11::xlib;

/// `QueuedAlready` mode from Xlib.h (not exported by the `x11` crate).
const QUEUED_ALREADY: std::os::raw::c_int = 0;

/// Pops the next queued X event without blocking.
///
/// `XPending` flushes the output buffer and reads whatever the server has
/// sent; `XNextEvent` is only called when it reports a queued event, so it
/// never blocks.
pub fn next_pending(connection: &Connection) -> Option<RawEvent> {
    let display = connection.display();
    if display.is_null() || unsafe { xlib::XPending(display) } <= 0 {
        return None;
    }
    let mut xevent: xlib::XEvent = unsafe { mem::zeroed() };
    unsafe { xlib::XNextEvent(display, &mut xevent) };
    let event = translate(&xevent);
    trace!("XEvent translated: {:?}", event);
    Some(event)
}

/// Whether Xlib's client-side queue already holds events. Reads nothing
/// from the socket and never flushes.
pub fn queued_already(connection: &Connection) -> bool {
    let display = connection.display();
    !display.is_null() && unsafe { xlib::XEventsQueued(display, QUEUED_ALREADY) } > 0
}

/// Reduces an `XEvent` union to a [`RawEvent`].
pub fn translate(xevent: &xlib::XEvent) -> RawEvent {
    // SAFETY: every variant starts with the XAnyEvent header, and each arm
    // below only reads the variant selected by `type_`.
    unsafe {
        let window = xevent.any.window;
        let kind = match xevent.get_type() {
            xlib::ButtonPress => RawEventKind::ButtonPress {
                button: xevent.button.button,
                x: xevent.button.x,
                y: xevent.button.y,
            },
            xlib::ButtonRelease => RawEventKind::ButtonRelease {
                button: xevent.button.button,
                x: xevent.button.x,
                y: xevent.button.y,
            },
            xlib::MotionNotify => RawEventKind::Motion {
                x: xevent.motion.x,
                y: xevent.motion.y,
            },
            xlib::KeyPress => RawEventKind::KeyPress {
                keycode: xevent.key.keycode,
            },
            xlib::ConfigureNotify => RawEventKind::Configure {
                width: xevent.configure.width.max(0) as u32,
                height: xevent.configure.height.max(0) as u32,
            },
            xlib::Expose => RawEventKind::Expose(Rect::new(
                xevent.expose.x,
                xevent.expose.y,
                xevent.expose.width.max(0) as u32,
                xevent.expose.height.max(0) as u32,
            )),
            xlib::ClientMessage => RawEventKind::ClientMessage {
                format: xevent.client_message.format,
                data0: xevent.client_message.data.get_long(0) as u64,
            },
            other => RawEventKind::Other(other),
        };
        RawEvent { window, kind }
    }
}
