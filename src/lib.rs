//! # ga-scrap
//!
//! Blocking browser automation for synchronous code, built on an engine that
//! only runs on its own single-threaded scheduler.
//!
//! ## Features
//!
//! - **Dedicated worker per session**: each [`Session`] owns a thread running a
//!   current-thread tokio runtime; the browser never leaves it
//! - **Bounded waits**: every call blocks for at most its timeout, startup and
//!   shutdown are bounded too
//! - **Strict or resilient**: raise on the first failure, or log it and keep going
//! - **Fluent facade**: [`Scraper`] methods chain, `scraper.goto(..)?.click(..)?`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ga_scrap::{Scraper, ScraperConfig};
//!
//! # fn main() -> ga_scrap::Result<()> {
//! let scraper = Scraper::launch(ScraperConfig::default().resilient().timeout_ms(10_000))?;
//!
//! scraper.goto("https://books.toscrape.com")?.scroll_to_bottom()?;
//!
//! // `None` if the selector did not match; the failure is logged as a warning
//! if let Some(titles) = scraper.get_texts("article.product_pod h3 a")? {
//!     println!("{} books", titles.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Custom operations
//!
//! Anything the [`Engine`](browser::Engine) can do can be sent through a session as
//! an [`Operation`]:
//!
//! ```rust,no_run
//! use ga_scrap::{Operation, Scraper, ScraperConfig, browser::{ChromeEngine, Engine}};
//! use std::rc::Rc;
//!
//! # fn main() -> ga_scrap::Result<()> {
//! let scraper = Scraper::launch(ScraperConfig::default())?;
//! let links = scraper.run(Operation::new("count links", |engine: Rc<ChromeEngine>| async move {
//!     engine.inner_texts("a").await.map(|texts| texts.len())
//! }))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`runtime`]: sessions, the worker loop, dispatch and execution modes
//! - [`browser`]: the engine seam and its Chrome implementation
//! - [`operations`]: builders for the facade's browser actions
//! - [`scraper`]: the blocking facade
//! - [`config`]: configuration, loadable from JSON or YAML
//! - [`testing`]: an in-memory engine for tests
//! - [`error`]: error types and result aliases

pub mod browser;
pub mod config;
pub mod error;
pub mod operations;
pub mod runtime;
pub mod scraper;
pub mod testing;

pub use browser::{ChromeLauncher, ConnectionOptions, Cookie, LaunchOptions, PageId};
pub use config::ScraperConfig;
pub use error::{BrowserError, Result};
pub use runtime::{ExecutionMode, ExecutionResult, Operation, Session, SessionId, SessionState, SessionStats, Timeouts};
pub use scraper::Scraper;
