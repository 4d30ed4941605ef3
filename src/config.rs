// src/config.rs

//! Configuration structures for the xlib output device.
//!
//! Every section can be deserialized from a JSON file named by the
//! `XLIB_DEVICE_CONFIG` environment variable. Missing sections and fields
//! take their defaults, so an empty object is a valid configuration.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "XLIB_DEVICE_CONFIG";

/// Process-wide configuration, loaded on first use.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_from_env);

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub window: WindowConfig,
    pub events: EventsConfig,
    pub watch: WatchConfig,
    pub browser: BrowserConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse xlib device configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Reads the file named by `XLIB_DEVICE_CONFIG`. Any failure is logged and
    /// the defaults are used instead.
    pub fn load_from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
            return Config::default();
        };
        match Self::from_file(Path::new(&path)) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                warn!("{:#}; using default configuration", e);
                Config::default()
            }
        }
    }
}

// --- Display ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// X display name such as `":1"`. `None` uses `$DISPLAY`.
    pub name: Option<String>,
    /// Create windows with a 32-bit ARGB visual when one exists.
    pub argb: bool,
}

// --- Window ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Prepended to the input's base name to form the window title.
    pub title_prefix: String,
    pub res_name: String,
    pub res_class: String,
    /// `WxH[+X+Y]`; overrides the size computed from the canvas.
    pub geometry: Option<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            title_prefix: "graphviz: ".to_string(),
            res_name: "graphviz".to_string(),
            res_class: "Graphviz".to_string(),
            geometry: None,
        }
    }
}

impl WindowConfig {
    /// The parsed geometry override, if one is configured and valid.
    pub fn geometry(&self) -> Option<Geometry> {
        let text = self.geometry.as_deref()?;
        match Geometry::parse(text) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        }
    }
}

/// An X-style geometry string, `WxH[+X+Y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl Geometry {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || anyhow!("Invalid window geometry {:?}, expected WxH[+X+Y]", text);
        let text = text.trim();
        let (size, offset) = match text.find(['+', '-']) {
            Some(at) => (&text[..at], Some(&text[at..])),
            None => (text, None),
        };
        let (w, h) = size.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.parse().map_err(|_| invalid())?;
        let height: u32 = h.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }

        let (x, y) = match offset {
            None => (None, None),
            Some(offset) => {
                let split = offset[1..].find(['+', '-']).ok_or_else(invalid)? + 1;
                let x: i32 = offset[..split].parse().map_err(|_| invalid())?;
                let y: i32 = offset[split..].parse().map_err(|_| invalid())?;
                (Some(x), Some(y))
            }
        };
        Ok(Geometry {
            width,
            height,
            x,
            y,
        })
    }
}

// --- Event loop ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventsConfig {
    /// Pause after the priming pass, giving the server time to map windows.
    pub prime_delay_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        EventsConfig { prime_delay_ms: 10 }
    }
}

// --- File watch ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Reload the input when it changes on disk.
    pub enabled: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig { enabled: true }
    }
}

// --- Hyperlinks ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    /// Program launched with the link target as its only argument.
    /// `None` prints the target instead.
    pub command: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            command: Some("firefox".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_log::test;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.display.name, None);
        assert!(!config.display.argb);
        assert_eq!(config.window.title_prefix, "graphviz: ");
        assert_eq!(config.window.res_class, "Graphviz");
        assert_eq!(config.events.prime_delay_ms, 10);
        assert!(config.watch.enabled);
        assert_eq!(config.browser.command.as_deref(), Some("firefox"));
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            Config::from_json(r#"{ "display": { "argb": true }, "watch": { "enabled": false } }"#)
                .unwrap();
        assert!(config.display.argb);
        assert!(!config.watch.enabled);
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.events.prime_delay_ms, 10);
    }

    #[test]
    fn browser_can_be_disabled() {
        let config = Config::from_json(r#"{ "browser": { "command": null } }"#).unwrap();
        assert_eq!(config.browser.command, None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Config::from_json("{ display: ").is_err());
    }

    #[test]
    fn from_file_reads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "events": {{ "prime_delay_ms": 0 }} }}"#).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.events.prime_delay_ms, 0);
    }

    #[test]
    fn geometry_size_only() {
        assert_eq!(
            Geometry::parse("800x600").unwrap(),
            Geometry {
                width: 800,
                height: 600,
                x: None,
                y: None
            }
        );
    }

    #[test]
    fn geometry_with_offsets() {
        let geometry = Geometry::parse("640X480+10-20").unwrap();
        assert_eq!((geometry.width, geometry.height), (640, 480));
        assert_eq!((geometry.x, geometry.y), (Some(10), Some(-20)));
    }

    #[test]
    fn geometry_rejects_garbage() {
        for text in ["", "800", "x600", "0x10", "10x10+5", "axb", "10x10+a+b"] {
            assert!(Geometry::parse(text).is_err(), "{:?} should not parse", text);
        }
    }

    #[test]
    fn invalid_configured_geometry_is_ignored() {
        let window = WindowConfig {
            geometry: Some("huge".to_string()),
            ..WindowConfig::default()
        };
        assert_eq!(window.geometry(), None);
    }
}
