use crate::{browser::{config::{ConnectionOptions, LaunchOptions},
                      engine::{Cookie, Engine, Launcher, PageId}},
            error::{BrowserError, Result}};
use async_trait::async_trait;
use headless_chrome::{Browser, Tab, protocol::cdp::Page::CaptureScreenshotFormatOption};
use std::{cell::{Cell, RefCell},
          ffi::OsStr,
          sync::Arc,
          time::Duration};

/// Where the worker gets its Chrome instance from
#[derive(Debug, Clone)]
pub enum ChromeTarget {
    Launch(LaunchOptions),
    Connect(ConnectionOptions),
}

/// Launches (or attaches to) Chrome on the worker thread
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    target: ChromeTarget,
    slow_mo: Duration,
}

impl ChromeLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        let slow_mo = Duration::from_millis(options.slow_mo_ms);
        Self { target: ChromeTarget::Launch(options), slow_mo }
    }

    pub fn connect(options: ConnectionOptions) -> Self {
        Self { target: ChromeTarget::Connect(options), slow_mo: Duration::ZERO }
    }

    pub fn target(&self) -> &ChromeTarget {
        &self.target
    }

    fn launch_browser(options: &LaunchOptions) -> Result<Browser> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // Long-lived interactive sessions must not be reaped by the idle timer
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.sandbox = options.sandbox;

        if let Some(path) = &options.chrome_path {
            launch_opts.path = Some(path.clone());
        }

        if let Some(dir) = &options.user_data_dir {
            launch_opts.user_data_dir = Some(dir.clone());
        }

        Browser::new(launch_opts).map_err(|e| BrowserError::LaunchFailed(e.to_string()))
    }
}

#[async_trait(?Send)]
impl Launcher for ChromeLauncher {
    type Engine = ChromeEngine;

    async fn launch(&self) -> Result<ChromeEngine> {
        let browser = match &self.target {
            ChromeTarget::Launch(options) => {
                log::info!(
                    "Launching Chrome ({})",
                    if options.headless { "headless" } else { "headed" }
                );
                Self::launch_browser(options)?
            }
            ChromeTarget::Connect(options) => {
                log::info!("Connecting to Chrome at {}", options.ws_url);
                Browser::connect_with_timeout(options.ws_url.clone(), Duration::from_millis(options.timeout))
                    .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?
            }
        };

        let engine = ChromeEngine {
            browser: RefCell::new(Some(browser)),
            tabs: RefCell::new(Vec::new()),
            active: Cell::new(None),
            next_page: Cell::new(0),
            slow_mo: self.slow_mo,
        };

        let page = engine
            .open_tab()
            .map_err(|e| BrowserError::LaunchFailed(format!("Failed to create tab: {}", e)))?;
        engine.active.set(Some(page));

        Ok(engine)
    }
}

/// headless_chrome-backed engine. Lives on the worker thread only.
pub struct ChromeEngine {
    browser: RefCell<Option<Browser>>,
    tabs: RefCell<Vec<(PageId, Arc<Tab>)>>,
    active: Cell<Option<PageId>>,
    next_page: Cell<usize>,
    slow_mo: Duration,
}

impl ChromeEngine {
    fn open_tab(&self) -> Result<PageId> {
        let tab = {
            let browser = self.browser.borrow();
            let browser =
                browser.as_ref().ok_or_else(|| BrowserError::TabOperationFailed("Browser already closed".to_string()))?;
            browser
                .new_tab()
                .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to create tab: {}", e)))?
        };

        let id = PageId(self.next_page.get());
        self.next_page.set(id.0 + 1);
        self.tabs.borrow_mut().push((id, tab));
        Ok(id)
    }

    fn tab(&self) -> Result<Arc<Tab>> {
        let page = self.active_page()?;
        self.tab_for(page)
    }

    fn tab_for(&self, page: PageId) -> Result<Arc<Tab>> {
        self.tabs
            .borrow()
            .iter()
            .find(|(id, _)| *id == page)
            .map(|(_, tab)| tab.clone())
            .ok_or_else(|| BrowserError::TabOperationFailed(format!("No such page: {}", page)))
    }

    async fn pause(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    /// Evaluate an expression that yields a JSON string and decode it
    fn evaluate_json(&self, expression: &str) -> Result<serde_json::Value> {
        let result = self.tab()?.evaluate(expression, true).map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;

        match result.value {
            Some(serde_json::Value::String(json)) => {
                serde_json::from_str(&json).map_err(|e| BrowserError::EvaluationFailed(format!("Malformed result: {}", e)))
            }
            Some(other) => Ok(other),
            None => Ok(serde_json::Value::Null),
        }
    }
}

/// Quote a string as a JavaScript literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Split a `document.cookie` string into cookies
pub(crate) fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            match pair.split_once('=') {
                Some((name, value)) => Some(Cookie::new(name.trim(), value.trim())),
                None => Some(Cookie::new("", pair)),
            }
        })
        .collect()
}

#[async_trait(?Send)]
impl Engine for ChromeEngine {
    fn pages(&self) -> Vec<PageId> {
        self.tabs.borrow().iter().map(|(id, _)| *id).collect()
    }

    fn active_page(&self) -> Result<PageId> {
        self.active.get().ok_or_else(|| BrowserError::TabOperationFailed("No active page".to_string()))
    }

    fn activate(&self, page: PageId) -> Result<()> {
        let tab = self.tab_for(page)?;
        tab.activate().map_err(|e| BrowserError::TabOperationFailed(format!("Failed to activate tab: {}", e)))?;
        self.active.set(Some(page));
        Ok(())
    }

    async fn new_page(&self) -> Result<PageId> {
        self.open_tab()
    }

    async fn close_page(&self, page: PageId) -> Result<()> {
        let tab = self.tab_for(page)?;
        tab.close(true).map_err(|e| BrowserError::TabOperationFailed(format!("Failed to close tab: {}", e)))?;

        self.tabs.borrow_mut().retain(|(id, _)| *id != page);
        if self.active.get() == Some(page) {
            self.active.set(self.tabs.borrow().last().map(|(id, _)| *id));
        }
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;
        tab.wait_until_navigated()
            .map_err(|e| BrowserError::NavigationFailed(format!("Navigation to {} did not complete: {}", url, e)))?;
        self.pause().await;
        Ok(())
    }

    async fn go_back(&self) -> Result<()> {
        self.tab()?
            .evaluate("window.history.back()", false)
            .map_err(|e| BrowserError::NavigationFailed(format!("Failed to go back: {}", e)))?;

        // history.back() returns before the navigation lands
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.tab()?.get_url())
    }

    async fn title(&self) -> Result<String> {
        self.tab()?.get_title().map_err(|e| BrowserError::EvaluationFailed(e.to_string()))
    }

    async fn content(&self) -> Result<String> {
        self.tab()?.get_content().map_err(|e| BrowserError::EvaluationFailed(e.to_string()))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let tab = self.tab()?;
        let element = tab
            .find_element(selector)
            .map_err(|e| BrowserError::ElementNotFound(format!("Element '{}' not found: {}", selector, e)))?;
        element.click().map_err(|e| BrowserError::TabOperationFailed(format!("Failed to click '{}': {}", selector, e)))?;
        self.pause().await;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let tab = self.tab()?;
        let element = tab
            .find_element(selector)
            .map_err(|e| BrowserError::ElementNotFound(format!("Element '{}' not found: {}", selector, e)))?;
        element
            .call_js_fn("function() { this.value = ''; }", vec![], false)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
        element
            .type_into(text)
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to type into '{}': {}", selector, e)))?;
        self.pause().await;
        Ok(())
    }

    async fn inner_text(&self, selector: &str) -> Result<String> {
        let tab = self.tab()?;
        let element = tab
            .find_element(selector)
            .map_err(|e| BrowserError::ElementNotFound(format!("Element '{}' not found: {}", selector, e)))?;
        element.get_inner_text().map_err(|e| BrowserError::EvaluationFailed(e.to_string()))
    }

    async fn inner_texts(&self, selector: &str) -> Result<Vec<String>> {
        let expression = format!(
            "JSON.stringify(Array.from(document.querySelectorAll({})).map(e => e.innerText))",
            js_string(selector)
        );
        let value = self.evaluate_json(&expression)?;
        serde_json::from_value(value).map_err(|e| BrowserError::EvaluationFailed(e.to_string()))
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let tab = self.tab()?;
        let element = tab
            .find_element(selector)
            .map_err(|e| BrowserError::ElementNotFound(format!("Element '{}' not found: {}", selector, e)))?;
        element.get_attribute_value(name).map_err(|e| BrowserError::EvaluationFailed(e.to_string()))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab()?.wait_for_element_with_custom_timeout(selector, timeout).map_err(|e| {
            BrowserError::ElementNotFound(format!("Element '{}' did not appear within {:?}: {}", selector, timeout, e))
        })?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let expression =
            format!("(async () => JSON.stringify(await (0, eval)({})))()", js_string(script));
        self.evaluate_json(&expression)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.tab()?
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| BrowserError::ScreenshotFailed(e.to_string()))
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let header = self.evaluate_json("JSON.stringify(document.cookie)")?;
        Ok(parse_cookie_header(header.as_str().unwrap_or_default()))
    }

    async fn set_cookie(&self, cookie: &Cookie) -> Result<()> {
        let path = cookie.path.as_deref().unwrap_or("/");
        let assignment = format!("{}={}; path={}", cookie.name, cookie.value, path);
        self.tab()?
            .evaluate(&format!("document.cookie = {}", js_string(&assignment)), false)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<()> {
        let tab = self.tab()?;
        for cookie in self.cookies().await? {
            let expiry = format!("{}=; expires=Thu, 01 Jan 1970 00:00:00 GMT; path=/", cookie.name);
            tab.evaluate(&format!("document.cookie = {}", js_string(&expiry)), false)
                .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
        }
        Ok(())
    }

    async fn close_context(&self) -> Result<()> {
        self.tabs.borrow_mut().clear();
        self.active.set(None);

        let browser = self.browser.borrow();
        let Some(browser) = browser.as_ref() else {
            return Ok(());
        };

        // Tabs the browser opened on its own are not in our registry
        let leftovers = browser
            .get_tabs()
            .lock()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();
        for tab in leftovers {
            if let Err(e) = tab.close(false) {
                log::debug!("Failed to close leftover tab: {}", e);
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // headless_chrome shuts the process down when the Browser is dropped
        if self.browser.borrow_mut().take().is_some() {
            log::info!("Chrome closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("sid=abc; theme=dark;  empty=");

        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[0], Cookie::new("sid", "abc"));
        assert_eq!(cookies[1], Cookie::new("theme", "dark"));
        assert_eq!(cookies[2], Cookie::new("empty", ""));
    }

    #[test]
    fn test_parse_cookie_header_empty() {
        assert!(parse_cookie_header("").is_empty());
        assert!(parse_cookie_header(" ; ").is_empty());
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("a[href=\"x\"]"), "\"a[href=\\\"x\\\"]\"");
    }

    #[test]
    fn test_launcher_carries_slow_mo() {
        let launcher = ChromeLauncher::new(LaunchOptions::new().slow_mo(120));
        assert_eq!(launcher.slow_mo, Duration::from_millis(120));
        assert!(matches!(launcher.target(), ChromeTarget::Launch(_)));

        let remote = ChromeLauncher::connect(ConnectionOptions::new("ws://127.0.0.1:9222"));
        assert!(matches!(remote.target(), ChromeTarget::Connect(_)));
    }
}
