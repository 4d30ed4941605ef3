// src/platform/os/inotify.rs

//! A single inotify directory watch.
//!
//! `nix` manages the instance and the watch descriptor; the pending byte
//! count (`FIONREAD`) and the raw record read go through `libc` because the
//! watcher needs the exact byte stream to validate record lengths.

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};
use std::io;
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// Size of the fixed part of `struct inotify_event` (wd, mask, cookie, len).
pub const EVENT_HEADER_SIZE: usize = 16;

/// The `IN_MODIFY` mask bit.
pub const IN_MODIFY: u32 = libc::IN_MODIFY;

pub struct InotifyWatch {
    inotify: Inotify,
    wd: Option<WatchDescriptor>,
    dir: PathBuf,
}

impl InotifyWatch {
    /// Creates a non-blocking inotify instance watching `dir` for
    /// modifications of the files it contains.
    pub fn watch_modifications(dir: &Path) -> Result<Self> {
        let inotify = Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC)
            .context("inotify_init() failed")?;
        let wd = inotify
            .add_watch(dir, AddWatchFlags::IN_MODIFY)
            .with_context(|| format!("inotify_add_watch() failed for {}", dir.display()))?;
        info!("Watching directory {} for modifications", dir.display());
        Ok(Self {
            inotify,
            wd: Some(wd),
            dir: dir.to_path_buf(),
        })
    }

    pub fn fd(&self) -> RawFd {
        self.inotify.as_fd().as_raw_fd()
    }

    /// Number of bytes of notification records ready to be read.
    pub fn available(&self) -> Result<usize> {
        let mut avail: libc::c_int = 0;
        let ret = unsafe { libc::ioctl(self.fd(), libc::FIONREAD, &mut avail) };
        if ret < 0 {
            return Err(io::Error::last_os_error()).context("ioctl(FIONREAD) failed");
        }
        Ok(avail.max(0) as usize)
    }

    /// Reads exactly `buf.len()` bytes of records.
    ///
    /// A short read is reported as an error: the caller sized the buffer from
    /// [`available`](Self::available), so anything else means the record
    /// stream can no longer be trusted.
    pub fn read_exact_records(&self, buf: &mut [u8]) -> Result<()> {
        let len = unsafe {
            libc::read(
                self.fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if len < 0 {
            return Err(io::Error::last_os_error()).context("read() from inotify failed");
        }
        if len as usize != buf.len() {
            return Err(anyhow!("avail = {}, len = {}", buf.len(), len));
        }
        Ok(())
    }

    /// Removes the watch. Idempotent.
    pub fn release(&mut self) {
        if let Some(wd) = self.wd.take() {
            match self.inotify.rm_watch(wd) {
                Ok(()) => debug!("Removed inotify watch on {}", self.dir.display()),
                Err(e) => warn!(
                    "inotify_rm_watch() failed for {}: {}",
                    self.dir.display(),
                    e
                ),
            }
        }
    }
}

impl Drop for InotifyWatch {
    fn drop(&mut self) {
        self.release();
    }
}

/// One decoded `inotify_event` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRecord {
    pub wd: i32,
    pub mask: u32,
    pub cookie: u32,
    /// The file name, with the kernel's NUL padding removed.
    pub name: Vec<u8>,
}

/// Splits a buffer of raw records.
///
/// Every record is a 16-byte header followed by `len` name bytes. A header
/// that does not fit, or a `len` running past the end of the buffer, is a
/// length miscalculation and fails the whole batch.
pub fn parse_records(buf: &[u8]) -> Result<Vec<WatchRecord>> {
    let mut records = Vec::new();
    let mut rest = buf;
    while !rest.is_empty() {
        if rest.len() < EVENT_HEADER_SIZE {
            return Err(anyhow!(
                "length miscalculation, {} trailing bytes",
                rest.len()
            ));
        }
        let field = |i: usize| {
            let b = &rest[i * 4..i * 4 + 4];
            u32::from_ne_bytes([b[0], b[1], b[2], b[3]])
        };
        let wd = field(0) as i32;
        let mask = field(1);
        let cookie = field(2);
        let name_len = field(3) as usize;

        let record_len = EVENT_HEADER_SIZE + name_len;
        if record_len > rest.len() {
            return Err(anyhow!(
                "length miscalculation, record of {} bytes with {} remaining",
                record_len,
                rest.len()
            ));
        }
        let raw_name = &rest[EVENT_HEADER_SIZE..record_len];
        let end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
        records.push(WatchRecord {
            wd,
            mask,
            cookie,
            name: raw_name[..end].to_vec(),
        });
        rest = &rest[record_len..];
    }
    Ok(records)
}

#[cfg(test)]
pub(crate) fn encode_record(mask: u32, name: &str, padded_len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1i32.to_ne_bytes());
    out.extend_from_slice(&mask.to_ne_bytes());
    out.extend_from_slice(&0u32.to_ne_bytes());
    out.extend_from_slice(&(padded_len as u32).to_ne_bytes());
    let mut name_bytes = name.as_bytes().to_vec();
    name_bytes.resize(padded_len, 0);
    out.extend_from_slice(&name_bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn parses_consecutive_padded_records() {
        let mut buf = encode_record(IN_MODIFY, "graph.gv", 16);
        buf.extend(encode_record(libc::IN_ATTRIB, "other.gv", 32));

        let records = parse_records(&buf).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mask, IN_MODIFY);
        assert_eq!(records[0].name, b"graph.gv");
        assert_eq!(records[1].mask, libc::IN_ATTRIB);
        assert_eq!(records[1].name, b"other.gv");
    }

    #[test_log::test]
    fn empty_buffer_has_no_records() {
        assert!(parse_records(&[]).unwrap().is_empty());
    }

    #[test_log::test]
    fn truncated_name_is_a_length_miscalculation() {
        let buf = encode_record(IN_MODIFY, "graph.gv", 16);
        assert!(parse_records(&buf[..buf.len() - 4]).is_err());
    }

    #[test_log::test]
    fn trailing_partial_header_is_rejected() {
        let mut buf = encode_record(IN_MODIFY, "a", 4);
        buf.extend_from_slice(&[0u8; 6]);
        assert!(parse_records(&buf).is_err());
    }

    #[test_log::test]
    fn watch_reports_bytes_after_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let watch = InotifyWatch::watch_modifications(dir.path()).unwrap();
        assert_eq!(watch.available().unwrap(), 0);

        std::fs::write(dir.path().join("g.gv"), b"digraph {}").unwrap();

        let avail = watch.available().unwrap();
        assert!(avail >= EVENT_HEADER_SIZE);
        let mut buf = vec![0u8; avail];
        watch.read_exact_records(&mut buf).unwrap();
        let records = parse_records(&buf).unwrap();
        assert!(records
            .iter()
            .any(|r| r.mask == IN_MODIFY && r.name == b"g.gv"));
    }
}
