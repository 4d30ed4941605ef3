// src/lib.rs

//! An X11 output device for a graph-layout toolkit.
//!
//! The host describes each output window as a [`Job`], implements
//! [`JobCallbacks`] to paint and react to input, and hands the jobs to
//! [`finalize`], which owns the thread until a window is closed.

pub mod config;
pub mod device;
pub mod job;
pub mod keys;
pub mod platform;

pub use device::{finalize, EventLoop, LoopState};
pub use job::{Job, JobCallbacks, JobState, KeyAction, KeyBinding, PointF};
