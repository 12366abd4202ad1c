//! In-memory engine for exercising sessions and the facade without a browser.
//!
//! A [`FakeSite`] maps URLs to scripted pages. [`FakeLauncher`] hands out a
//! [`FakeEngine`] serving that site and records every engine call in a shared
//! [`Journal`], so tests can assert on ordering (e.g. teardown) from the
//! calling thread.
//!
//! ```
//! use ga_scrap::testing::{FakeElement, FakeLauncher, FakePage, FakeSite};
//! use ga_scrap::{Scraper, ScraperConfig};
//!
//! let site = FakeSite::new().page(
//!     "https://shop.test",
//!     FakePage::new("Shop").element("h1", FakeElement::text("Welcome")),
//! );
//! let scraper = Scraper::with_launcher(FakeLauncher::new(site), ScraperConfig::default());
//! scraper.start().unwrap();
//! scraper.goto("https://shop.test").unwrap();
//! assert_eq!(scraper.get_text("h1").unwrap().as_deref(), Some("Welcome"));
//! ```

use crate::{browser::{Cookie, Engine, Launcher, PageId},
            error::{BrowserError, Result}};
use async_trait::async_trait;
use std::{cell::{Cell, RefCell},
          collections::HashMap,
          sync::{Arc, Mutex, PoisonError,
                 atomic::{AtomicUsize, Ordering}},
          time::Duration};

/// PNG file signature, returned as the fake screenshot payload
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub attributes: HashMap<String, String>,
}

impl FakeElement {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), attributes: HashMap::new() }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: String,
    pub html: String,
    pub elements: HashMap<String, Vec<FakeElement>>,
    pub scripts: HashMap<String, serde_json::Value>,
}

impl FakePage {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self { html: format!("<html><head><title>{}</title></head><body></body></html>", title), title, ..Self::default() }
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    /// Add an element matched by `selector`. Repeated calls build a list.
    pub fn element(mut self, selector: impl Into<String>, element: FakeElement) -> Self {
        self.elements.entry(selector.into()).or_default().push(element);
        self
    }

    /// Scripted result of `evaluate(script)` on this page
    pub fn script(mut self, script: impl Into<String>, result: serde_json::Value) -> Self {
        self.scripts.insert(script.into(), result);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, page: FakePage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }
}

/// Shared, thread-safe log of engine calls
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries().iter().any(|e| e == entry)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    site: FakeSite,
    journal: Journal,
    launches: Arc<AtomicUsize>,
    launch_delay: Duration,
    launch_error: Option<String>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self { site, ..Self::default() }
    }

    /// Make `launch` take this long
    pub fn launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    /// Make `launch` fail with this reason
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.launch_error = Some(reason.into());
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Handle to the number of engines launched so far
    pub fn launches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.launches)
    }
}

#[async_trait(?Send)]
impl Launcher for FakeLauncher {
    type Engine = FakeEngine;

    async fn launch(&self) -> Result<FakeEngine> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.journal.record("launch");

        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }

        if let Some(reason) = &self.launch_error {
            return Err(BrowserError::LaunchFailed(reason.clone()));
        }

        let engine = FakeEngine {
            site: self.site.clone(),
            journal: self.journal.clone(),
            tabs: RefCell::new(Vec::new()),
            active: Cell::new(None),
            next_page: Cell::new(0),
            cookies: RefCell::new(Vec::new()),
        };
        let first = engine.open_tab();
        engine.active.set(Some(first));
        Ok(engine)
    }
}

#[derive(Debug)]
struct FakeTab {
    id: PageId,
    history: Vec<String>,
    inputs: HashMap<String, String>,
}

impl FakeTab {
    fn url(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or("about:blank")
    }
}

/// Engine serving a [`FakeSite`]; lives on the worker thread
#[derive(Debug)]
pub struct FakeEngine {
    site: FakeSite,
    journal: Journal,
    tabs: RefCell<Vec<FakeTab>>,
    active: Cell<Option<PageId>>,
    next_page: Cell<usize>,
    cookies: RefCell<Vec<Cookie>>,
}

impl FakeEngine {
    fn open_tab(&self) -> PageId {
        let id = PageId(self.next_page.get());
        self.next_page.set(id.0 + 1);
        self.tabs.borrow_mut().push(FakeTab { id, history: Vec::new(), inputs: HashMap::new() });
        id
    }

    fn with_active<T>(&self, f: impl FnOnce(&mut FakeTab) -> Result<T>) -> Result<T> {
        let active = self.active_page()?;
        let mut tabs = self.tabs.borrow_mut();
        let tab = tabs
            .iter_mut()
            .find(|tab| tab.id == active)
            .ok_or_else(|| BrowserError::TabOperationFailed(format!("No such page: {}", active)))?;
        f(tab)
    }

    fn current_page(&self) -> Result<FakePage> {
        let url = self.with_active(|tab| Ok(tab.url().to_string()))?;
        Ok(self.site.pages.get(&url).cloned().unwrap_or_default())
    }

    fn elements(&self, selector: &str) -> Result<Vec<FakeElement>> {
        Ok(self.current_page()?.elements.get(selector).cloned().unwrap_or_default())
    }

    fn first_element(&self, selector: &str) -> Result<FakeElement> {
        self.elements(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound(format!("Element '{}' not found", selector)))
    }

    /// Value typed into `selector` on the active page
    pub fn input_value(&self, selector: &str) -> Option<String> {
        self.with_active(|tab| Ok(tab.inputs.get(selector).cloned())).ok().flatten()
    }
}

#[async_trait(?Send)]
impl Engine for FakeEngine {
    fn pages(&self) -> Vec<PageId> {
        self.tabs.borrow().iter().map(|tab| tab.id).collect()
    }

    fn active_page(&self) -> Result<PageId> {
        self.active.get().ok_or_else(|| BrowserError::TabOperationFailed("No active page".to_string()))
    }

    fn activate(&self, page: PageId) -> Result<()> {
        if !self.pages().contains(&page) {
            return Err(BrowserError::TabOperationFailed(format!("No such page: {}", page)));
        }
        self.active.set(Some(page));
        self.journal.record(format!("activate {}", page));
        Ok(())
    }

    async fn new_page(&self) -> Result<PageId> {
        let page = self.open_tab();
        self.journal.record(format!("new_page {}", page));
        Ok(page)
    }

    async fn close_page(&self, page: PageId) -> Result<()> {
        let mut tabs = self.tabs.borrow_mut();
        let before = tabs.len();
        tabs.retain(|tab| tab.id != page);
        if tabs.len() == before {
            return Err(BrowserError::TabOperationFailed(format!("No such page: {}", page)));
        }
        if self.active.get() == Some(page) {
            self.active.set(tabs.last().map(|tab| tab.id));
        }
        self.journal.record(format!("close_page {}", page));
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        if !self.site.pages.contains_key(url) {
            return Err(BrowserError::NavigationFailed(format!("Failed to navigate to {}: net::ERR_NAME_NOT_RESOLVED", url)));
        }
        self.with_active(|tab| {
            tab.history.push(url.to_string());
            tab.inputs.clear();
            Ok(())
        })?;
        self.journal.record(format!("goto {}", url));
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        self.with_active(|tab| {
            tab.history.pop();
            Ok(())
        })?;
        self.journal.record("go_back");
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        self.with_active(|tab| Ok(tab.url().to_string()))
    }

    async fn title(&self) -> Result<String> {
        Ok(self.current_page()?.title)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current_page()?.html)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.first_element(selector)?;
        self.journal.record(format!("click {}", selector));
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        self.first_element(selector)?;
        self.with_active(|tab| {
            tab.inputs.insert(selector.to_string(), text.to_string());
            Ok(())
        })?;
        self.journal.record(format!("fill {}", selector));
        Ok(())
    }

    async fn inner_text(&self, selector: &str) -> Result<String> {
        Ok(self.first_element(selector)?.text)
    }

    async fn inner_texts(&self, selector: &str) -> Result<Vec<String>> {
        Ok(self.elements(selector)?.into_iter().map(|element| element.text).collect())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        Ok(self.first_element(selector)?.attributes.get(name).cloned())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.elements(selector)?.is_empty() {
            tokio::time::sleep(timeout).await;
            return Err(BrowserError::ElementNotFound(format!(
                "Element '{}' did not appear within {:?}",
                selector, timeout
            )));
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        if script.trim_start().starts_with("throw") {
            return Err(BrowserError::EvaluationFailed(format!("Uncaught exception in: {}", script)));
        }
        self.journal.record(format!("evaluate {}", script));
        Ok(self.current_page()?.scripts.get(script).cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.journal.record("screenshot");
        Ok(FAKE_PNG.to_vec())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.cookies.borrow().clone())
    }

    async fn set_cookie(&self, cookie: &Cookie) -> Result<()> {
        let mut cookies = self.cookies.borrow_mut();
        cookies.retain(|existing| existing.name != cookie.name);
        cookies.push(cookie.clone());
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<()> {
        self.cookies.borrow_mut().clear();
        Ok(())
    }

    async fn close_context(&self) -> Result<()> {
        self.cookies.borrow_mut().clear();
        self.journal.record("close_context");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.journal.record("close");
        Ok(())
    }
}
