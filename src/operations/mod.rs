//! Operation builders for the facade's browser actions.
//!
//! Each function returns an [`Operation`](crate::runtime::Operation) generic over
//! the [`Engine`](crate::browser::Engine), ready to hand to a session. Builders
//! only capture owned arguments; nothing touches the engine until the worker
//! runs the operation.

pub mod click;
pub mod cookies;
pub mod extract;
pub mod input;
pub mod navigate;
pub mod pages;
pub mod screenshot;
pub mod script;
pub mod utils;
pub mod wait;

pub use click::click;
pub use cookies::{add_cookie, clear_cookies, cookies};
pub use extract::{get_attribute, get_text, get_texts, html, markdown};
pub use input::fill;
pub use navigate::{go_back, goto, title, url};
pub use pages::{close_all_pages, close_page, list_pages, new_page, switch_to};
pub use screenshot::{screenshot, screenshot_base64};
pub use script::{evaluate, scroll_to_bottom};
pub use wait::{sleep, wait_for};

#[cfg(test)]
pub(crate) fn run_with<T: 'static>(
    site: crate::testing::FakeSite,
    op: crate::runtime::Operation<crate::testing::FakeEngine, T>,
) -> (crate::error::Result<T>, crate::testing::Journal) {
    use crate::browser::Launcher;
    use std::rc::Rc;

    let launcher = crate::testing::FakeLauncher::new(site);
    let journal = launcher.journal();
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

    let result = runtime.block_on(async {
        let engine = launcher.launch().await?;
        op.run(Rc::new(engine)).await
    });
    (result, journal)
}
