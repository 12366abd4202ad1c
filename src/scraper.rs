use crate::{browser::{ChromeLauncher, ConnectionOptions, Cookie, Launcher, PageId},
            config::ScraperConfig,
            error::Result,
            operations,
            runtime::{ExecutionMode, Operation, Session, SessionState, Timeouts}};
use std::{fmt, path::PathBuf, time::Duration};

/// Blocking browser automation handle.
///
/// Every method builds an operation, hands it to the session's worker loop and
/// waits for it within the configured timeout. Action-like methods return `&Self`
/// so calls can be chained; value methods return `Ok(None)` when a failure was
/// suppressed in resilient mode.
///
/// In strict mode a failed or timed-out operation is raised and the session is
/// stopped. Call [`Scraper::start`] again to continue.
///
/// ```rust,no_run
/// use ga_scrap::{Scraper, ScraperConfig};
///
/// # fn main() -> ga_scrap::Result<()> {
/// let scraper = Scraper::launch(ScraperConfig::default())?;
/// scraper.goto("https://example.com")?.click("a")?;
/// println!("{:?}", scraper.title()?);
/// # Ok(())
/// # }
/// ```
pub struct Scraper<L: Launcher = ChromeLauncher> {
    session: Session<L>,
}

impl Scraper<ChromeLauncher> {
    /// Scraper that launches a local Chrome on `start()`
    pub fn new(config: ScraperConfig) -> Self {
        let launcher = ChromeLauncher::new(config.launch.clone());
        Self::with_launcher(launcher, config)
    }

    /// Scraper attached to an already running Chrome
    pub fn connect(options: ConnectionOptions, config: ScraperConfig) -> Self {
        Self::with_launcher(ChromeLauncher::connect(options), config)
    }

    /// Create and start in one step
    pub fn launch(config: ScraperConfig) -> Result<Self> {
        let scraper = Self::new(config);
        scraper.start()?;
        Ok(scraper)
    }
}

impl<L: Launcher> Scraper<L> {
    pub fn with_launcher(launcher: L, config: ScraperConfig) -> Self {
        let timeouts = Timeouts::from(&config);
        Self { session: Session::new(launcher, config.mode, timeouts) }
    }

    /// Start the session. A no-op if it is already running.
    pub fn start(&self) -> Result<&Self> {
        self.session.start()?;
        Ok(self)
    }

    /// Stop the session. Safe to call repeatedly.
    pub fn stop(&self) {
        self.session.stop();
    }

    pub fn session(&self) -> &Session<L> {
        &self.session
    }

    pub fn mode(&self) -> ExecutionMode {
        self.session.mode()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Run any operation and return its value
    pub fn run<T: Send + 'static>(&self, operation: Operation<L::Engine, T>) -> Result<Option<T>> {
        match self.session.execute(operation) {
            Err(e) if e.is_contract_violation() => Err(e),
            Err(e) => {
                log::debug!("session {}: stopping after failure: {}", self.session.id(), e);
                self.session.retire();
                Err(e)
            }
            ok => ok,
        }
    }

    /// Run any operation for its effect
    pub fn perform<T: Send + 'static>(&self, operation: Operation<L::Engine, T>) -> Result<&Self> {
        self.run(operation)?;
        Ok(self)
    }

    pub fn goto(&self, url: &str) -> Result<&Self> {
        self.perform(operations::goto(url))
    }

    pub fn go_back(&self) -> Result<&Self> {
        self.perform(operations::go_back())
    }

    pub fn click(&self, selector: &str) -> Result<&Self> {
        self.perform(operations::click(selector))
    }

    pub fn fill(&self, selector: &str, text: &str) -> Result<&Self> {
        self.perform(operations::fill(selector, text))
    }

    pub fn scroll_to_bottom(&self) -> Result<&Self> {
        self.perform(operations::scroll_to_bottom())
    }

    /// Wait until `selector` appears, at most `timeout`
    pub fn wait_for(&self, selector: &str, timeout: Duration) -> Result<&Self> {
        self.perform(operations::wait_for(selector, timeout))
    }

    pub fn sleep(&self, duration: Duration) -> Result<&Self> {
        self.perform(operations::sleep(duration))
    }

    /// Save a PNG screenshot of the active page
    pub fn screenshot(&self, path: impl Into<PathBuf>) -> Result<&Self> {
        self.perform(operations::screenshot(Some(path.into())))
    }

    pub fn switch_to(&self, page: PageId) -> Result<&Self> {
        self.perform(operations::switch_to(page))
    }

    pub fn close_page(&self, page: PageId) -> Result<&Self> {
        self.perform(operations::close_page(page))
    }

    /// Close every page but the first
    pub fn close_all_pages(&self) -> Result<&Self> {
        self.perform(operations::close_all_pages())
    }

    pub fn add_cookie(&self, cookie: Cookie) -> Result<&Self> {
        self.perform(operations::add_cookie(cookie))
    }

    pub fn clear_cookies(&self) -> Result<&Self> {
        self.perform(operations::clear_cookies())
    }

    /// Text of the first element matching `selector`
    pub fn get_text(&self, selector: &str) -> Result<Option<String>> {
        self.run(operations::get_text(selector))
    }

    /// Texts of all elements matching `selector`
    pub fn get_texts(&self, selector: &str) -> Result<Option<Vec<String>>> {
        self.run(operations::get_texts(selector))
    }

    /// Attribute of the first element matching `selector`. The inner `None`
    /// means the element has no such attribute.
    pub fn get_attribute(&self, selector: &str, name: &str) -> Result<Option<Option<String>>> {
        self.run(operations::get_attribute(selector, name))
    }

    pub fn title(&self) -> Result<Option<String>> {
        self.run(operations::title())
    }

    pub fn url(&self) -> Result<Option<String>> {
        self.run(operations::url())
    }

    pub fn html(&self) -> Result<Option<String>> {
        self.run(operations::html())
    }

    pub fn markdown(&self) -> Result<Option<String>> {
        self.run(operations::markdown())
    }

    pub fn evaluate(&self, script: &str) -> Result<Option<serde_json::Value>> {
        self.run(operations::evaluate(script))
    }

    pub fn screenshot_base64(&self) -> Result<Option<String>> {
        self.run(operations::screenshot_base64())
    }

    /// Open a page without switching to it
    pub fn new_page(&self) -> Result<Option<PageId>> {
        self.run(operations::new_page())
    }

    pub fn cookies(&self) -> Result<Option<Vec<Cookie>>> {
        self.run(operations::cookies())
    }
}

impl<L: Launcher> Drop for Scraper<L> {
    fn drop(&mut self) {
        self.session.stop();
    }
}

impl<L: Launcher> fmt::Debug for Scraper<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scraper").field("session", &self.session).finish()
    }
}
