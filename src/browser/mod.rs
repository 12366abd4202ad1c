//! Browser engines the session bridge can drive.
//!
//! - [`Engine`]/[`Launcher`]: the seam the worker loop talks to
//! - [`ChromeLauncher`]/[`ChromeEngine`]: Chrome over CDP via headless_chrome
//! - [`LaunchOptions`]/[`ConnectionOptions`]: how to obtain a browser

pub mod chrome;
pub mod config;
pub mod engine;

pub use chrome::{ChromeEngine, ChromeLauncher, ChromeTarget};
pub use config::{ConnectionOptions, LaunchOptions};
pub use engine::{Cookie, Engine, Launcher, PageId};
