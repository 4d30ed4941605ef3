// src/device/event_loop.rs

//! The device's main loop.
//!
//! Initialization creates one window per job and the optional file watch.
//! A priming pass then drains whatever the server queued while the windows
//! were mapped and paints every job once. After that each iteration polls
//! the watcher, drains display events, synchronizes the windows if anything
//! happened, flushes, and blocks in epoll until the display connection or
//! the watch has more to say. The wait is skipped while Xlib still holds
//! buffered events, since those never wake the connection fd.

use super::browser::Browser;
use super::input::{drain, DrainOutcome};
use super::sync::synchronize;
use super::watcher::FileWatcher;
use super::window_state::{initialize_all, teardown};
use crate::config::Config;
use crate::job::Job;
use crate::keys::KeyTable;
use crate::platform::os::epoll::{epoll_event_flags, epoll_event_token, EpollFlags, EventMonitor};
use crate::platform::DisplayBackend;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, trace, warn};
use std::thread;
use std::time::Duration;

pub const DISPLAY_TOKEN: u64 = 1;
pub const WATCH_TOKEN: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Priming,
    Running,
    Terminated,
}

pub struct EventLoop<D: DisplayBackend> {
    display: D,
    config: Config,
    keys: KeyTable,
    browser: Browser,
    watcher: Option<FileWatcher>,
    monitor: Option<EventMonitor>,
    registered_fds: usize,
    state: LoopState,
}

impl<D: DisplayBackend> EventLoop<D> {
    pub fn new(display: D, config: Config) -> Self {
        let browser = Browser::from_config(&config.browser);
        Self {
            display,
            config,
            keys: KeyTable::default(),
            browser,
            watcher: None,
            monitor: None,
            registered_fds: 0,
            state: LoopState::Initializing,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    #[cfg(test)]
    pub(crate) fn watch_fd(&self) -> Option<std::os::unix::io::RawFd> {
        self.watcher.as_ref().map(FileWatcher::fd)
    }

    #[cfg(test)]
    pub(crate) fn registered_fds(&self) -> usize {
        self.registered_fds
    }

    /// Runs the loop over `jobs` until a window is closed or a key binding
    /// asks to quit. Windows are destroyed before returning.
    pub fn run(mut self, jobs: &mut [Job]) -> Result<()> {
        if jobs.is_empty() {
            warn!("No jobs to display");
            self.state = LoopState::Terminated;
            return Ok(());
        }
        if let Err(e) = self.initialize(jobs) {
            self.terminate(jobs);
            return Err(e);
        }
        let result = self.pump(jobs);
        if let Err(e) = &result {
            error!("Event loop failed: {:#}", e);
        }
        self.terminate(jobs);
        result
    }

    fn pump(&mut self, jobs: &mut [Job]) -> Result<()> {
        self.prime(jobs)?;
        while self.state == LoopState::Running {
            if self.step(jobs)? == LoopState::Terminated {
                break;
            }
            if self.display.has_queued_events() {
                trace!("Events already queued client-side, not waiting");
                continue;
            }
            self.wait()?;
        }
        Ok(())
    }

    /// Resolves keybindings, creates the windows, and sets up the wait set.
    pub fn initialize(&mut self, jobs: &mut [Job]) -> Result<()> {
        self.state = LoopState::Initializing;
        let first = jobs.first().ok_or_else(|| anyhow!("No jobs to initialize"))?;
        self.keys = KeyTable::resolve(&mut self.display, &first.keybindings);
        debug!("{} key bindings resolved", self.keys.len());

        initialize_all(&mut self.display, jobs, &self.config)?;

        let monitor = EventMonitor::new().context("Failed to create EventMonitor")?;
        if let Some(fd) = self.display.event_fd() {
            monitor
                .add(fd, DISPLAY_TOKEN, EpollFlags::EPOLLIN)
                .context("Failed to add display connection to event monitor")?;
            self.registered_fds += 1;
        }
        self.watcher = self.setup_watcher(&jobs[0], &monitor);
        self.monitor = Some(monitor);
        info!(
            "{} window(s) initialized, file watching {}",
            jobs.len(),
            if self.watcher.is_some() { "on" } else { "off" }
        );
        Ok(())
    }

    fn setup_watcher(&mut self, first: &Job, monitor: &EventMonitor) -> Option<FileWatcher> {
        if !self.config.watch.enabled || first.state.graph_index != 0 {
            return None;
        }
        let input = first.state.input_filename.as_deref()?;
        let watcher = match FileWatcher::setup(input) {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!("{:#}; running without file watching", e);
                return None;
            }
        };
        if let Err(e) = monitor.add(watcher.fd(), WATCH_TOKEN, EpollFlags::EPOLLIN) {
            warn!("{:#}; running without file watching", e);
            return None;
        }
        self.registered_fds += 1;
        Some(watcher)
    }

    /// Drains what arrived during initialization and paints every window
    /// once, unless a close is already queued.
    pub fn prime(&mut self, jobs: &mut [Job]) -> Result<()> {
        self.state = LoopState::Priming;
        if drain(&mut self.display, jobs, &self.keys, &mut self.browser) == DrainOutcome::Terminate
        {
            info!("Terminated before the first paint");
            self.state = LoopState::Terminated;
            return Ok(());
        }
        self.synchronize_all(jobs)?;
        self.display.flush();
        if self.config.events.prime_delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.events.prime_delay_ms));
        }
        self.state = LoopState::Running;
        Ok(())
    }

    /// One loop iteration up to, but not including, the blocking wait.
    pub fn step(&mut self, jobs: &mut [Job]) -> Result<LoopState> {
        let mut events = 0;
        if let Some(watcher) = self.watcher.as_mut() {
            match watcher.poll(&mut jobs[0]) {
                Ok(reloads) => events += reloads,
                Err(e) => {
                    error!("File watcher disabled: {:#}", e);
                    self.disable_watcher();
                }
            }
        }

        match drain(&mut self.display, jobs, &self.keys, &mut self.browser) {
            DrainOutcome::Terminate => {
                self.state = LoopState::Terminated;
                return Ok(self.state);
            }
            DrainOutcome::Handled(handled) => events += handled,
        }

        if events > 0 {
            trace!("{} events handled, synchronizing", events);
            self.synchronize_all(jobs)?;
        }
        self.display.flush();
        self.browser.reap();
        Ok(self.state)
    }

    /// Blocks until the display or the watch is readable.
    pub fn wait(&mut self) -> Result<()> {
        let monitor = self
            .monitor
            .as_mut()
            .ok_or_else(|| anyhow!("Event loop is not initialized"))?;
        if self.registered_fds == 0 {
            return Err(anyhow!("Nothing to wait on: no display fd and no watch"));
        }
        let ready = monitor.wait(-1).context("Waiting for events failed")?;
        for event in ready {
            trace!(
                "Woken by token {} ({:?})",
                epoll_event_token(event),
                epoll_event_flags(event)
            );
        }
        Ok(())
    }

    fn synchronize_all(&mut self, jobs: &mut [Job]) -> Result<()> {
        for job in jobs.iter_mut() {
            synchronize(&mut self.display, job)?;
        }
        Ok(())
    }

    fn disable_watcher(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Some(monitor) = self.monitor.as_ref() {
                // The watch no longer counts as a wake-up source even if the
                // kernel already dropped it from the set.
                if let Err(e) = monitor.delete(watcher.fd()) {
                    warn!("{:#}", e);
                }
                self.registered_fds = self.registered_fds.saturating_sub(1);
            }
            watcher.release();
        }
    }

    /// Releases the watch and the key table and destroys every window.
    /// The display connection closes when the loop is dropped.
    pub fn terminate(&mut self, jobs: &mut [Job]) {
        self.disable_watcher();
        self.keys = KeyTable::default();
        self.browser.reap();
        for job in jobs.iter_mut() {
            teardown(&mut self.display, job);
        }
        self.display.flush();
        self.monitor = None;
        self.registered_fds = 0;
        self.state = LoopState::Terminated;
        info!("Event loop terminated");
    }
}
