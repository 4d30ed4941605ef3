// src/platform/os/epoll.rs

//! A thin wrapper around `epoll` using raw `libc` calls.
//!
//! The event loop registers the display connection and, when file watching is
//! active, the inotify descriptor, then blocks in [`EventMonitor::wait`] until
//! either has data.

use anyhow::{Context, Result};
use bitflags::bitflags;
use log::{debug, trace, warn};
use std::io;
use std::os::unix::io::RawFd;

const EPOLL_CREATE_CLOEXEC: libc::c_int = libc::O_CLOEXEC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EpollCtlOp {
    Add = libc::EPOLL_CTL_ADD,
    Del = libc::EPOLL_CTL_DEL,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EpollFlags: u32 {
        const EPOLLIN = libc::EPOLLIN as u32;
    }
}

fn new_libc_epoll_event(flags: EpollFlags, token: u64) -> libc::epoll_event {
    libc::epoll_event {
        events: flags.bits(),
        u64: token,
    }
}

pub fn epoll_event_token(event: &libc::epoll_event) -> u64 {
    event.u64
}

pub fn epoll_event_flags(event: &libc::epoll_event) -> EpollFlags {
    EpollFlags::from_bits_truncate(event.events)
}

const MAX_EVENTS_BUFFER_SIZE: usize = 8;

pub struct EventMonitor {
    epoll_fd: RawFd,
    event_buffer: [libc::epoll_event; MAX_EVENTS_BUFFER_SIZE],
}

impl EventMonitor {
    pub fn new() -> Result<Self> {
        let epoll_fd = unsafe { libc::epoll_create1(EPOLL_CREATE_CLOEXEC) };
        if epoll_fd == -1 {
            return Err(io::Error::last_os_error())
                .context("Failed to create epoll instance (epoll_create1)");
        }
        debug!("EventMonitor created with epoll_fd: {}", epoll_fd);
        Ok(Self {
            epoll_fd,
            event_buffer: [new_libc_epoll_event(EpollFlags::empty(), 0); MAX_EVENTS_BUFFER_SIZE],
        })
    }

    pub fn add(&self, fd: RawFd, token: u64, flags: EpollFlags) -> Result<()> {
        let mut event = new_libc_epoll_event(flags, token);
        if unsafe { libc::epoll_ctl(self.epoll_fd, EpollCtlOp::Add as libc::c_int, fd, &mut event) }
            == -1
        {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("Failed to add fd {} to epoll (token: {})", fd, token));
        }
        trace!(
            "Added fd {} to epoll_fd {} with token {} and flags {:?}",
            fd,
            self.epoll_fd,
            token,
            flags
        );
        Ok(())
    }

    pub fn delete(&self, fd: RawFd) -> Result<()> {
        let mut event = new_libc_epoll_event(EpollFlags::empty(), 0);
        if unsafe { libc::epoll_ctl(self.epoll_fd, EpollCtlOp::Del as libc::c_int, fd, &mut event) }
            == -1
        {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("Failed to delete fd {} from epoll", fd));
        }
        trace!("Deleted fd {} from epoll_fd {}", fd, self.epoll_fd);
        Ok(())
    }

    /// Blocks until a registered descriptor is ready or `timeout_ms` elapses
    /// (`-1` waits forever).
    ///
    /// An interrupted wait (EINTR) returns an empty slice, so the caller simply
    /// runs another iteration.
    pub fn wait(&mut self, timeout_ms: i32) -> Result<&[libc::epoll_event]> {
        trace!(
            "EventMonitor: waiting with timeout {}ms on epoll_fd {}",
            timeout_ms,
            self.epoll_fd
        );

        let num_events = unsafe {
            libc::epoll_wait(
                self.epoll_fd,
                self.event_buffer.as_mut_ptr(),
                MAX_EVENTS_BUFFER_SIZE as libc::c_int,
                timeout_ms,
            )
        };

        if num_events == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                trace!("EventMonitor: epoll_wait interrupted (EINTR), returning empty slice.");
                return Ok(&self.event_buffer[0..0]);
            }
            return Err(err).context("epoll_wait failed in EventMonitor");
        }

        trace!(
            "EventMonitor: epoll_wait on fd {} returned {} events",
            self.epoll_fd,
            num_events
        );
        Ok(&self.event_buffer[0..num_events as usize])
    }
}

impl Drop for EventMonitor {
    fn drop(&mut self) {
        if unsafe { libc::close(self.epoll_fd) } == -1 {
            warn!(
                "Failed to close epoll_fd {} in EventMonitor::drop: {}",
                self.epoll_fd,
                io::Error::last_os_error()
            );
        } else {
            debug!("Closed epoll_fd {} in EventMonitor::drop", self.epoll_fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe() -> (RawFd, RawFd) {
        let mut fds = [0 as libc::c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    fn close(fd: RawFd) {
        unsafe {
            libc::close(fd);
        }
    }

    #[test_log::test]
    fn wait_times_out_with_no_ready_descriptors() {
        let mut monitor = EventMonitor::new().unwrap();
        let (read_fd, write_fd) = pipe();
        monitor.add(read_fd, 7, EpollFlags::EPOLLIN).unwrap();

        assert!(monitor.wait(0).unwrap().is_empty());

        close(read_fd);
        close(write_fd);
    }

    #[test_log::test]
    fn wait_reports_the_token_of_a_readable_descriptor() {
        let mut monitor = EventMonitor::new().unwrap();
        let (read_fd, write_fd) = pipe();
        monitor.add(read_fd, 42, EpollFlags::EPOLLIN).unwrap();

        let byte = [1u8];
        assert_eq!(
            unsafe { libc::write(write_fd, byte.as_ptr() as *const libc::c_void, 1) },
            1
        );

        let events = monitor.wait(1000).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(epoll_event_token(&events[0]), 42);
        assert!(epoll_event_flags(&events[0]).contains(EpollFlags::EPOLLIN));

        close(read_fd);
        close(write_fd);
    }

    #[test_log::test]
    fn deleted_descriptors_no_longer_wake_the_monitor() {
        let mut monitor = EventMonitor::new().unwrap();
        let (read_fd, write_fd) = pipe();
        monitor.add(read_fd, 1, EpollFlags::EPOLLIN).unwrap();
        monitor.delete(read_fd).unwrap();

        let byte = [1u8];
        unsafe { libc::write(write_fd, byte.as_ptr() as *const libc::c_void, 1) };

        assert!(monitor.wait(0).unwrap().is_empty());
        assert!(monitor.delete(read_fd).is_err());

        close(read_fd);
        close(write_fd);
    }
}
