pub mod capture;
pub mod display;
pub mod error;
pub mod pipeline;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
}

/// Capture side. Stream geometry is fixed by the frame contract
/// ([`capture::frame::FRAME_WIDTH`] x [`capture::frame::FRAME_HEIGHT`]);
/// only device selection and rate are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Explicit device node. `None` means scan for the first color camera.
    pub device: Option<String>,
    pub fps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Redraw period of the UI loop, in milliseconds.
    pub tick_ms: u64,
    /// Text pre-filled into the gain entry at startup.
    pub initial_gain_entry: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                device: None,
                fps: 30,
            },
            display: DisplayConfig {
                tick_ms: 30,
                initial_gain_entry: "16".into(),
            },
        }
    }
}
