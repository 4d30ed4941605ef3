// src/device/browser.rs

//! Opens hyperlink targets selected in a window.

use crate::config::BrowserConfig;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::process::{Child, Command, Stdio};

/// How a link target was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    /// The browser was started with this pid.
    Launched(u32),
    /// No browser was configured or it failed to start; the target went to
    /// stdout.
    Printed,
}

/// Launches the configured browser and reaps the processes it started.
///
/// Children are not waited on when launched. [`Browser::reap`] collects the
/// ones that have exited so they do not linger as zombies.
#[derive(Debug)]
pub struct Browser {
    command: Option<String>,
    children: Vec<Child>,
}

impl Browser {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            command: config.command.clone(),
            children: Vec::new(),
        }
    }

    /// Opens `href`. Never fails the caller.
    pub fn show(&mut self, href: &str) -> Shown {
        let Some(command) = self.command.as_deref() else {
            print_target(href);
            return Shown::Printed;
        };
        match spawn(command, href) {
            Ok(child) => {
                let pid = child.id();
                info!("Opened {:?} with {} (pid {})", href, command, pid);
                self.children.push(child);
                Shown::Launched(pid)
            }
            Err(e) => {
                warn!("{:#}", e);
                print_target(href);
                Shown::Printed
            }
        }
    }

    /// Collects every child that has exited, without blocking.
    pub fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Browser pid {} exited: {}", child.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Failed to poll browser pid {}: {}", child.id(), e);
                false
            }
        });
    }

    /// Children started and not yet reaped.
    pub fn running(&self) -> usize {
        self.children.len()
    }
}

fn spawn(command: &str, href: &str) -> Result<Child> {
    Command::new(command)
        .arg(href)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to launch browser {:?}", command))
}

fn print_target(href: &str) {
    println!("browser_show: {}", href);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};
    use test_log::test;

    fn browser(command: Option<&str>) -> Browser {
        Browser::from_config(&BrowserConfig {
            command: command.map(str::to_string),
        })
    }

    #[test]
    fn falls_back_to_printing() {
        let mut missing = browser(Some("/nonexistent/browser-for-tests"));
        assert_eq!(missing.show("https://graphviz.org/"), Shown::Printed);
        assert_eq!(missing.running(), 0);

        let mut unconfigured = browser(None);
        assert_eq!(unconfigured.show("node1.html"), Shown::Printed);
        assert_eq!(unconfigured.running(), 0);
    }

    #[test]
    fn exited_children_are_reaped() {
        let mut browser = browser(Some("true"));
        assert!(matches!(browser.show("node1.html"), Shown::Launched(_)));
        assert!(matches!(browser.show("node2.html"), Shown::Launched(_)));
        assert_eq!(browser.running(), 2);

        let deadline = Instant::now() + Duration::from_secs(5);
        while browser.running() > 0 && Instant::now() < deadline {
            browser.reap();
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(browser.running(), 0);
    }
}
