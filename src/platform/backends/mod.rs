// src/platform/backends/mod.rs

//! Implementations of [`DisplayBackend`](crate::platform::DisplayBackend).

#[cfg(test)]
pub mod mock;
pub mod x11;

pub use self::x11::XlibDisplay;
