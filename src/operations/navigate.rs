use super::utils::normalize_url;
use crate::{browser::Engine, runtime::Operation};
use std::rc::Rc;

/// Navigate the active page. Yields the normalized URL that was loaded.
pub fn goto<E: Engine>(url: &str) -> Operation<E, String> {
    let url = normalize_url(url);
    Operation::new(format!("goto {}", url), move |engine: Rc<E>| async move {
        engine.goto(&url).await?;
        Ok(url)
    })
}

pub fn go_back<E: Engine>() -> Operation<E, ()> {
    Operation::new("go back", |engine: Rc<E>| async move { engine.go_back().await })
}

pub fn url<E: Engine>() -> Operation<E, String> {
    Operation::new("read url", |engine: Rc<E>| async move { engine.url().await })
}

pub fn title<E: Engine>() -> Operation<E, String> {
    Operation::new("read title", |engine: Rc<E>| async move { engine.title().await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::BrowserError,
                operations::run_with,
                testing::{FakeEngine, FakePage, FakeSite}};

    fn site() -> FakeSite {
        FakeSite::new()
            .page("https://example.com", FakePage::new("Example Domain"))
            .page("https://example.com/about", FakePage::new("About"))
    }

    #[test]
    fn test_goto_normalizes_and_navigates() {
        let op = goto("example.com");
        assert_eq!(op.description(), "goto https://example.com");

        let (result, journal) = run_with(site(), op);
        assert_eq!(result.unwrap(), "https://example.com");
        assert!(journal.contains("goto https://example.com"));
    }

    #[test]
    fn test_goto_unknown_host_fails() {
        let (result, _) = run_with(site(), goto("https://nonexistent-site-12345.com"));
        assert!(matches!(result, Err(BrowserError::NavigationFailed(_))));
    }

    #[test]
    fn test_title_after_navigation() {
        let op = Operation::new("goto then title", |engine: Rc<FakeEngine>| async move {
            goto("https://example.com/about").run(Rc::clone(&engine)).await?;
            title().run(engine).await
        });

        let (result, _) = run_with(site(), op);
        assert_eq!(result.unwrap(), "About");
    }
}
