// src/platform/backends/mock.rs

use crate::job::{JobCallbacks, JobState, PointF};
use crate::platform::{
    DisplayBackend, Keycode, NativeWindow, PixmapId, RawEvent, RawEventKind, Rect, ScreenMetrics,
    Surface, WindowId, WindowSpec,
};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::os::unix::io::RawFd;
use std::ptr;
use std::rc::Rc;

pub const FIRST_WINDOW_ID: WindowId = 100;
pub const FIRST_PIXMAP_ID: PixmapId = 1000;
pub const MOCK_WM_DELETE_WINDOW: u64 = 301;
const MOCK_DEPTH: u32 = 24;

/// One recorded request or host callback, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOp {
    CreateWindow { window: WindowId, width: u32, height: u32, title: String },
    MapWindow(WindowId),
    DestroyWindow(WindowId),
    CreatePixmap { pixmap: PixmapId, width: u32, height: u32 },
    FreePixmap(PixmapId),
    Fill { pixmap: PixmapId, width: u32, height: u32 },
    CopyArea { window: WindowId, pixmap: PixmapId, area: Rect },
    Flush,
    // Pushed by `RecordingCallbacks`.
    Refresh { drawable: PixmapId, width: u32, height: u32, needs_refresh: bool },
    ButtonPress { button: u32, pointer: PointF },
    ButtonRelease { button: u32, pointer: PointF },
    Motion(PointF),
    Read { filename: String, layout_type: String },
    Key(String),
}

pub type Journal = Rc<RefCell<Vec<MockOp>>>;

/// Events already read off the connection, served before any batch.
pub type ClientQueue = Rc<RefCell<VecDeque<RawEvent>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// A display that records requests and serves scripted events.
///
/// Events are queued in batches: `next_event` returns `None` at the end of
/// each batch, the way an X queue runs dry between server round trips.
/// Events pushed onto [`MockDisplay::client_queue`] stand for ones Xlib has
/// already buffered; they do not make the connection fd readable.
pub struct MockDisplay {
    journal: Journal,
    queue: VecDeque<Option<RawEvent>>,
    client_queue: ClientQueue,
    metrics: ScreenMetrics,
    keymap: HashMap<String, Keycode>,
    windows_created: usize,
    pixmaps_created: u64,
    fail_window_at: Option<usize>,
    wake_pipe: Option<[RawFd; 2]>,
}

impl MockDisplay {
    /// A 96 dpi screen.
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            queue: VecDeque::new(),
            client_queue: Rc::new(RefCell::new(VecDeque::new())),
            metrics: ScreenMetrics {
                width_px: 1920,
                height_px: 960,
                width_mm: 508,
                height_mm: 254,
            },
            keymap: HashMap::new(),
            windows_created: 0,
            pixmaps_created: 0,
            fail_window_at: None,
            wake_pipe: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ScreenMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_key(mut self, keystring: &str, keycode: Keycode) -> Self {
        self.keymap.insert(keystring.to_string(), keycode);
        self
    }

    /// Makes the `index`-th `create_window` call fail.
    pub fn failing_window_creation_at(mut self, index: usize) -> Self {
        self.fail_window_at = Some(index);
        self
    }

    /// Exposes a permanently readable descriptor as the connection fd, so the
    /// event loop's wait returns at once.
    pub fn with_readable_fd(mut self) -> Self {
        let mut fds = [0 as RawFd; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } == 0 {
            let byte = 1u8;
            unsafe {
                libc::write(fds[1], &byte as *const u8 as *const libc::c_void, 1);
            }
            self.wake_pipe = Some(fds);
        }
        self
    }

    /// Queues one batch of events.
    pub fn push_batch(&mut self, events: impl IntoIterator<Item = RawEvent>) {
        self.queue.extend(events.into_iter().map(Some));
        self.queue.push_back(None);
    }

    /// Shared handle to the buffered-event queue, for callbacks that need
    /// to enqueue while the display is borrowed by the loop.
    pub fn client_queue(&self) -> ClientQueue {
        Rc::clone(&self.client_queue)
    }

    pub fn window_id(index: usize) -> WindowId {
        FIRST_WINDOW_ID + index as WindowId
    }

    pub fn close_event(window: WindowId) -> RawEvent {
        RawEvent {
            window,
            kind: RawEventKind::ClientMessage {
                format: 32,
                data0: MOCK_WM_DELETE_WINDOW,
            },
        }
    }

    fn record(&self, op: MockOp) {
        self.journal.borrow_mut().push(op);
    }
}

impl Drop for MockDisplay {
    fn drop(&mut self) {
        if let Some([read_fd, write_fd]) = self.wake_pipe.take() {
            unsafe {
                libc::close(read_fd);
                libc::close(write_fd);
            }
        }
    }
}

impl DisplayBackend for MockDisplay {
    fn event_fd(&self) -> Option<RawFd> {
        self.wake_pipe.map(|[read_fd, _]| read_fd)
    }

    fn screen_metrics(&self) -> ScreenMetrics {
        self.metrics
    }

    fn create_window(&mut self, spec: &WindowSpec) -> Result<NativeWindow> {
        let index = self.windows_created;
        if self.fail_window_at == Some(index) {
            return Err(anyhow!("mock: window creation {} refused", index));
        }
        self.windows_created += 1;
        let id = Self::window_id(index);
        self.record(MockOp::CreateWindow {
            window: id,
            width: spec.width,
            height: spec.height,
            title: spec.title.clone(),
        });
        Ok(NativeWindow {
            id,
            colormap: 1,
            depth: MOCK_DEPTH,
            wm_delete_window: 0,
            event_mask: 0,
        })
    }

    fn map_window(&mut self, window: &mut NativeWindow) -> Result<()> {
        window.wm_delete_window = MOCK_WM_DELETE_WINDOW;
        self.record(MockOp::MapWindow(window.id));
        Ok(())
    }

    fn destroy_window(&mut self, window: &NativeWindow) {
        self.record(MockOp::DestroyWindow(window.id));
    }

    fn create_pixmap(&mut self, _window: &NativeWindow, width: u32, height: u32) -> Result<PixmapId> {
        let pixmap = FIRST_PIXMAP_ID + self.pixmaps_created;
        self.pixmaps_created += 1;
        self.record(MockOp::CreatePixmap {
            pixmap,
            width,
            height,
        });
        Ok(pixmap)
    }

    fn free_pixmap(&mut self, pixmap: PixmapId) {
        self.record(MockOp::FreePixmap(pixmap));
    }

    fn fill_pixmap(&mut self, _window: &NativeWindow, pixmap: PixmapId, width: u32, height: u32) {
        self.record(MockOp::Fill {
            pixmap,
            width,
            height,
        });
    }

    fn copy_area(&mut self, window: &NativeWindow, pixmap: PixmapId, area: Rect) {
        self.record(MockOp::CopyArea {
            window: window.id,
            pixmap,
            area,
        });
    }

    fn surface(&self, window: &NativeWindow, pixmap: PixmapId, width: u32, height: u32) -> Surface {
        Surface {
            display: ptr::null_mut(),
            visual: ptr::null_mut(),
            drawable: pixmap,
            width,
            height,
            depth: window.depth,
        }
    }

    fn next_event(&mut self) -> Option<RawEvent> {
        if let Some(event) = self.client_queue.borrow_mut().pop_front() {
            return Some(event);
        }
        self.queue.pop_front().flatten()
    }

    fn has_queued_events(&self) -> bool {
        !self.client_queue.borrow().is_empty()
    }

    fn keycode_for(&mut self, keystring: &str) -> Option<Keycode> {
        self.keymap.get(keystring).copied()
    }

    fn flush(&mut self) {
        self.record(MockOp::Flush);
    }
}

/// Host callbacks that append to the same journal as the display.
pub struct RecordingCallbacks {
    journal: Journal,
}

impl RecordingCallbacks {
    pub fn boxed(journal: &Journal) -> Box<Self> {
        Box::new(Self {
            journal: Rc::clone(journal),
        })
    }
}

impl JobCallbacks for RecordingCallbacks {
    fn refresh(&mut self, job: &mut JobState, surface: &Surface) {
        self.journal.borrow_mut().push(MockOp::Refresh {
            drawable: surface.drawable,
            width: surface.width,
            height: surface.height,
            needs_refresh: job.needs_refresh,
        });
    }

    fn button_press(&mut self, _job: &mut JobState, button: u32, pointer: PointF) {
        self.journal
            .borrow_mut()
            .push(MockOp::ButtonPress { button, pointer });
    }

    fn button_release(&mut self, _job: &mut JobState, button: u32, pointer: PointF) {
        self.journal
            .borrow_mut()
            .push(MockOp::ButtonRelease { button, pointer });
    }

    fn motion(&mut self, _job: &mut JobState, pointer: PointF) {
        self.journal.borrow_mut().push(MockOp::Motion(pointer));
    }

    fn read(&mut self, _job: &mut JobState, filename: &str, layout_type: &str) {
        self.journal.borrow_mut().push(MockOp::Read {
            filename: filename.to_string(),
            layout_type: layout_type.to_string(),
        });
    }
}
