// src/platform/backends/x11/connection.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use crate::platform::ScreenMetrics;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::ffi::{CStr, CString};
use std::os::unix::io::RawFd;
use std::ptr;

use libc::c_int;
use x11::xlib;

/// Owns an X11 `Display` pointer and closes it on drop.
#[derive(Debug)]
struct ManagedDisplay {
    ptr: *mut xlib::Display,
}

impl ManagedDisplay {
    /// Calls `XOpenDisplay`. `None` means "use `$DISPLAY`".
    fn open(name: Option<&str>) -> Result<Self> {
        let c_name = name
            .map(CString::new)
            .transpose()
            .context("Display name contains an interior NUL byte")?;
        let name_ptr = c_name.as_ref().map_or(ptr::null(), |n| n.as_ptr());

        let display_ptr = unsafe { xlib::XOpenDisplay(name_ptr) };
        if display_ptr.is_null() {
            // XDisplayName reports what Xlib would have tried.
            let tried = unsafe {
                let raw = xlib::XDisplayName(name_ptr);
                if raw.is_null() {
                    String::new()
                } else {
                    CStr::from_ptr(raw).to_string_lossy().into_owned()
                }
            };
            Err(anyhow!("Failed to open XLIB display: {}", tried))
        } else {
            debug!("X display opened: {:p}", display_ptr);
            Ok(Self { ptr: display_ptr })
        }
    }

    #[inline]
    fn raw(&self) -> *mut xlib::Display {
        self.ptr
    }
}

impl Drop for ManagedDisplay {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            info!("Closing X11 display connection: {:p}", self.ptr);
            unsafe {
                xlib::XCloseDisplay(self.ptr);
            }
        }
    }
}

/// The connection to the X server plus the default screen's resources.
///
/// The display is closed when this struct is dropped.
#[derive(Debug)]
pub struct Connection {
    managed_display: ManagedDisplay,
    screen: c_int,
    colormap: xlib::Colormap,
    visual: *mut xlib::Visual,
}

impl Connection {
    /// Opens the named display (or `$DISPLAY`) and looks up the default
    /// screen, colormap and visual.
    pub fn open(name: Option<&str>) -> Result<Self> {
        info!("Establishing X11 server connection.");

        let managed_display = ManagedDisplay::open(name)?;

        let screen = unsafe { xlib::XDefaultScreen(managed_display.raw()) };
        let colormap = unsafe { xlib::XDefaultColormap(managed_display.raw(), screen) };
        let visual = unsafe { xlib::XDefaultVisual(managed_display.raw(), screen) };
        if visual.is_null() {
            return Err(anyhow!(
                "Failed to get default visual for screen {}.",
                screen
            ));
        }
        debug!(
            "Default screen {}, colormap {}, visual {:p}",
            screen, colormap, visual
        );

        Ok(Connection {
            managed_display,
            screen,
            colormap,
            visual,
        })
    }

    /// Closes the display now rather than on drop. Idempotent.
    pub fn cleanup(&mut self) {
        if !self.managed_display.ptr.is_null() {
            unsafe {
                xlib::XCloseDisplay(self.managed_display.ptr);
            }
            self.managed_display.ptr = ptr::null_mut();
            debug!("X display connection closed by cleanup().");
        }
    }

    #[inline]
    pub fn display(&self) -> *mut xlib::Display {
        self.managed_display.raw()
    }

    #[inline]
    pub fn screen(&self) -> c_int {
        self.screen
    }

    #[inline]
    pub fn colormap(&self) -> xlib::Colormap {
        self.colormap
    }

    #[inline]
    pub fn visual(&self) -> *mut xlib::Visual {
        self.visual
    }

    #[inline]
    pub fn root_window(&self) -> xlib::Window {
        unsafe { xlib::XRootWindow(self.display(), self.screen) }
    }

    pub fn default_depth(&self) -> c_int {
        unsafe { xlib::XDefaultDepth(self.display(), self.screen) }
    }

    pub fn white_pixel(&self) -> u64 {
        unsafe { xlib::XWhitePixel(self.display(), self.screen) as u64 }
    }

    pub fn black_pixel(&self) -> u64 {
        unsafe { xlib::XBlackPixel(self.display(), self.screen) as u64 }
    }

    pub fn screen_metrics(&self) -> ScreenMetrics {
        let display = self.display();
        unsafe {
            ScreenMetrics {
                width_px: xlib::XDisplayWidth(display, self.screen).max(0) as u32,
                height_px: xlib::XDisplayHeight(display, self.screen).max(0) as u32,
                width_mm: xlib::XDisplayWidthMM(display, self.screen).max(0) as u32,
                height_mm: xlib::XDisplayHeightMM(display, self.screen).max(0) as u32,
            }
        }
    }

    /// File descriptor of the connection, for `epoll`.
    pub fn get_event_fd(&self) -> Option<RawFd> {
        if self.managed_display.ptr.is_null() {
            warn!("get_event_fd called on a closed X display.");
            None
        } else {
            Some(unsafe { xlib::XConnectionNumber(self.managed_display.raw()) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_connection() -> Connection {
        Connection {
            managed_display: ManagedDisplay {
                ptr: ptr::null_mut(),
            },
            screen: 0,
            colormap: 0,
            visual: ptr::null_mut(),
        }
    }

    #[test]
    fn cleanup_on_a_closed_connection_is_a_no_op() {
        let mut conn = closed_connection();
        conn.cleanup();
        conn.cleanup();
        assert!(conn.display().is_null());
    }

    #[test]
    fn closed_connection_has_no_event_fd() {
        assert!(closed_connection().get_event_fd().is_none());
    }

    #[test]
    fn display_names_with_nul_bytes_are_rejected() {
        let err = Connection::open(Some("bad\0name")).unwrap_err();
        assert!(err.to_string().contains("NUL"));
    }
}
