// src/platform/os/mod.rs

//! Operating-system primitives used by the event loop: the epoll-based
//! multiplexed wait and the inotify directory watch.

pub mod epoll;
pub mod inotify;
