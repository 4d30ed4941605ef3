// src/platform/backends/x11/window.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use crate::platform::{NativeWindow, WindowSpec};
use anyhow::{anyhow, Context, Result};
use log::{debug, info, trace, warn};
use std::ffi::CString;
use std::mem;
use std::ptr;

use libc::{c_char, c_int, c_uint};
use x11::{xlib, xrender};

/// Events every output window listens to.
pub const DEVICE_EVENT_MASK: libc::c_long = xlib::ButtonPressMask
    | xlib::ButtonReleaseMask
    | xlib::PointerMotionMask
    | xlib::KeyPressMask
    | xlib::StructureNotifyMask
    | xlib::ExposureMask;

/// Client-side resources that belong to one created window.
///
/// `NativeWindow` only carries server ids; the GC pointer and the visual are
/// kept here by the backend.
#[derive(Debug)]
pub struct WindowResources {
    pub gc: xlib::GC,
    pub visual: *mut xlib::Visual,
    pub owns_colormap: bool,
}

/// Looks for a 32-bit TrueColor visual whose XRender format has an alpha
/// channel.
pub fn find_argb_visual(connection: &Connection) -> Option<*mut xlib::Visual> {
    let display = connection.display();
    let mut nvi: c_int = 0;
    let xvi = unsafe {
        let mut template: xlib::XVisualInfo = mem::zeroed();
        template.screen = connection.screen();
        template.depth = 32;
        template.class = xlib::TrueColor;
        xlib::XGetVisualInfo(
            display,
            xlib::VisualScreenMask | xlib::VisualDepthMask | xlib::VisualClassMask,
            &mut template,
            &mut nvi,
        )
    };
    if xvi.is_null() {
        return None;
    }

    let infos = unsafe { std::slice::from_raw_parts(xvi, nvi.max(0) as usize) };
    let visual = infos.iter().map(|info| info.visual).find(|&visual| unsafe {
        let format = xrender::XRenderFindVisualFormat(display, visual);
        !format.is_null()
            && (*format).type_ == xrender::PictTypeDirect
            && (*format).direct.alphaMask != 0
    });

    unsafe {
        xlib::XFree(xvi as *mut libc::c_void);
    }
    visual
}

/// Creates an unmapped output window with its GC and WM properties.
pub fn create(connection: &Connection, spec: &WindowSpec) -> Result<(NativeWindow, WindowResources)> {
    info!(
        "Creating X11 window: {}x{}px (argb requested: {})",
        spec.width, spec.height, spec.argb
    );
    let display = connection.display();
    let root = connection.root_window();
    let wm_strings = WmStrings::new(spec)?;

    let argb_visual = if spec.argb {
        let found = find_argb_visual(connection);
        if found.is_none() {
            warn!("No ARGB visual available, using the default visual.");
        }
        found
    } else {
        None
    };

    let mut attributes: xlib::XSetWindowAttributes = unsafe { mem::zeroed() };
    let (visual, colormap, depth, attribute_mask, foreground) = match argb_visual {
        Some(visual) => {
            let colormap =
                unsafe { xlib::XCreateColormap(display, root, visual, xlib::AllocNone) };
            attributes.override_redirect = xlib::False;
            attributes.background_pixel = 0;
            attributes.border_pixel = 0;
            attributes.colormap = colormap;
            (
                visual,
                colormap,
                32,
                xlib::CWBackPixel | xlib::CWBorderPixel | xlib::CWOverrideRedirect | xlib::CWColormap,
                0,
            )
        }
        None => {
            attributes.background_pixel = connection.white_pixel();
            attributes.border_pixel = connection.black_pixel();
            (
                connection.visual(),
                connection.colormap(),
                connection.default_depth(),
                xlib::CWBackPixel | xlib::CWBorderPixel,
                connection.white_pixel(),
            )
        }
    };

    let window_id = unsafe {
        xlib::XCreateWindow(
            display,
            root,
            0,
            0,
            spec.width as c_uint,
            spec.height as c_uint,
            0,
            depth,
            xlib::InputOutput as c_uint,
            visual,
            attribute_mask,
            &mut attributes,
        )
    };
    let owns_colormap = argb_visual.is_some();
    if window_id == 0 {
        if owns_colormap {
            unsafe { xlib::XFreeColormap(display, colormap) };
        }
        return Err(anyhow!("XCreateWindow failed"));
    }
    debug!("X window created (ID: {})", window_id);

    set_wm_properties(connection, window_id, spec, &wm_strings);

    let mut gc_values: xlib::XGCValues = unsafe { mem::zeroed() };
    gc_values.foreground = foreground;
    let gc = unsafe { xlib::XCreateGC(display, window_id, xlib::GCForeground as u64, &mut gc_values) };
    if gc.is_null() {
        unsafe {
            xlib::XDestroyWindow(display, window_id);
            if owns_colormap {
                xlib::XFreeColormap(display, colormap);
            }
        }
        return Err(anyhow!("XCreateGC failed for window ID {}", window_id));
    }

    Ok((
        NativeWindow {
            id: window_id,
            colormap,
            depth: depth as u32,
            wm_delete_window: 0,
            event_mask: 0,
        },
        WindowResources {
            gc,
            visual,
            owns_colormap,
        },
    ))
}

/// C copies of the window's WM strings. Built before any server resource
/// exists, so a string with an interior NUL fails without leaking one.
struct WmStrings {
    name: CString,
    icon_name: CString,
    res_name: CString,
    res_class: CString,
}

impl WmStrings {
    fn new(spec: &WindowSpec) -> Result<Self> {
        Ok(Self {
            name: CString::new(spec.title.as_str()).context("Failed to create CString for window title")?,
            icon_name: CString::new(spec.icon_name.as_str())
                .context("Failed to create CString for icon name")?,
            res_name: CString::new(spec.res_name.as_str())
                .context("Failed to create CString for res_name")?,
            res_class: CString::new(spec.res_class.as_str())
                .context("Failed to create CString for res_class")?,
        })
    }
}

fn set_wm_properties(
    connection: &Connection,
    window_id: xlib::Window,
    spec: &WindowSpec,
    strings: &WmStrings,
) {
    unsafe {
        let mut normal_hints: xlib::XSizeHints = mem::zeroed();
        normal_hints.flags = 0;
        normal_hints.width = spec.width as c_int;
        normal_hints.height = spec.height as c_int;

        let mut class_hint = xlib::XClassHint {
            res_name: strings.res_name.as_ptr() as *mut c_char,
            res_class: strings.res_class.as_ptr() as *mut c_char,
        };

        let mut wm_hints: xlib::XWMHints = mem::zeroed();
        wm_hints.flags = xlib::InputHint;
        wm_hints.input = xlib::True;

        xlib::Xutf8SetWMProperties(
            connection.display(),
            window_id,
            strings.name.as_ptr(),
            strings.icon_name.as_ptr(),
            ptr::null_mut(),
            0,
            &mut normal_hints,
            &mut wm_hints,
            &mut class_hint,
        );
    }
    debug!("WM properties set for window {} (title: {:?})", window_id, spec.title);
}

/// Selects the device events, registers `WM_DELETE_WINDOW` and maps the window.
pub fn select_input_and_map(connection: &Connection, window: &mut NativeWindow) -> Result<()> {
    let display = connection.display();
    unsafe {
        xlib::XSelectInput(display, window.id, DEVICE_EVENT_MASK);
        window.event_mask = DEVICE_EVENT_MASK as i64;

        let mut atom = xlib::XInternAtom(
            display,
            b"WM_DELETE_WINDOW\0".as_ptr() as *const c_char,
            xlib::False,
        );
        if atom == 0 {
            return Err(anyhow!("Failed to intern WM_DELETE_WINDOW"));
        }
        xlib::XSetWMProtocols(display, window.id, &mut atom, 1);
        window.wm_delete_window = atom;

        xlib::XMapWindow(display, window.id);
    }
    trace!(
        "Window {} mapped, event mask {:#x}",
        window.id,
        window.event_mask
    );
    Ok(())
}

/// Frees the GC, an owned colormap, and the window.
pub fn destroy(connection: &Connection, window: &NativeWindow, resources: &WindowResources) {
    let display = connection.display();
    if display.is_null() {
        return;
    }
    info!("Destroying X11 window (ID: {}).", window.id);
    unsafe {
        xlib::XFreeGC(display, resources.gc);
        if resources.owns_colormap {
            xlib::XFreeColormap(display, window.colormap);
        }
        xlib::XDestroyWindow(display, window.id);
    }
}
