// src/device/watcher.rs

//! Reloads the input file when it is modified on disk.

use crate::job::Job;
use crate::platform::os::inotify::{parse_records, InotifyWatch, IN_MODIFY};
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use std::ffi::OsString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// A watch on the directory holding one input file.
pub struct FileWatcher {
    watch: InotifyWatch,
    file_name: OsString,
    buffer: Vec<u8>,
}

/// The directory to watch for `input`, resolving relative paths against
/// the working directory.
pub fn watch_dir(input: &Path) -> Result<PathBuf> {
    let absolute = if input.is_absolute() {
        input.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read the working directory")?
            .join(input)
    };
    absolute
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("{} has no parent directory", absolute.display()))
}

impl FileWatcher {
    pub fn setup(input: &Path) -> Result<Self> {
        let file_name = input
            .file_name()
            .ok_or_else(|| anyhow!("Input path {} names no file", input.display()))?
            .to_os_string();
        let dir = watch_dir(input)?;
        let watch = InotifyWatch::watch_modifications(&dir)?;
        Ok(Self {
            watch,
            file_name,
            buffer: Vec::new(),
        })
    }

    pub fn fd(&self) -> RawFd {
        self.watch.fd()
    }

    /// Reads pending notifications and calls the job's `read` callback once
    /// per modification of the watched file.
    ///
    /// Returns the number of reloads. An error means the record stream is
    /// unusable and the watcher should be dropped.
    pub fn poll(&mut self, job: &mut Job) -> Result<usize> {
        let avail = self.watch.available()?;
        if avail == 0 {
            return Ok(0);
        }
        self.buffer.resize(avail, 0);
        self.watch.read_exact_records(&mut self.buffer)?;

        let mut reloads = 0;
        for record in parse_records(&self.buffer)? {
            if record.mask != IN_MODIFY || record.name != self.file_name.as_bytes() {
                continue;
            }
            let Some(filename) = job.state.input_filename.clone() else {
                continue;
            };
            info!("{} modified, reloading", filename.display());
            let layout_type = job.state.layout_type.clone();
            job.callbacks
                .read(&mut job.state, &filename.to_string_lossy(), &layout_type);
            reloads += 1;
        }
        debug!("Watcher consumed {} bytes, {} reloads", avail, reloads);
        Ok(reloads)
    }

    /// Removes the directory watch.
    pub fn release(&mut self) {
        self.watch.release();
    }
}
