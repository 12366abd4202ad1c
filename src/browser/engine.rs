//! The seam between the session bridge and a concrete automation engine.
//!
//! A [`Launcher`] is shared with the worker thread and asked to produce an
//! [`Engine`] there. The engine itself never leaves that thread, so it does not
//! have to be `Send`: every call into it is expressed as an operation and
//! executed by the worker loop.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Identifies a page (tab) owned by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub usize);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

/// A cookie visible to the active page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), path: None }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Produces an engine on the worker thread. Called once per worker loop.
#[async_trait(?Send)]
pub trait Launcher: Send + Sync + 'static {
    type Engine: Engine;

    async fn launch(&self) -> Result<Self::Engine>;
}

/// Browser automation calls the facade relies on.
///
/// Page-level calls act on the active page unless a [`PageId`] is given.
#[async_trait(?Send)]
pub trait Engine: 'static {
    /// Open pages, in creation order
    fn pages(&self) -> Vec<PageId>;

    fn active_page(&self) -> Result<PageId>;

    fn activate(&self, page: PageId) -> Result<()>;

    async fn new_page(&self) -> Result<PageId>;

    async fn close_page(&self, page: PageId) -> Result<()>;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn go_back(&self) -> Result<()>;

    async fn url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    async fn content(&self) -> Result<String>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    async fn inner_text(&self, selector: &str) -> Result<String>;

    async fn inner_texts(&self, selector: &str) -> Result<Vec<String>>;

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// PNG bytes of the active page's viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn cookies(&self) -> Result<Vec<Cookie>>;

    async fn set_cookie(&self, cookie: &Cookie) -> Result<()>;

    async fn clear_cookies(&self) -> Result<()>;

    /// Release session-level state once all pages are closed
    async fn close_context(&self) -> Result<()>;

    /// Shut the engine instance down. Last step of teardown.
    async fn close(&self) -> Result<()>;
}
