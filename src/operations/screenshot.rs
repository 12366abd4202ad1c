use super::utils::default_screenshot_name;
use crate::{browser::Engine, runtime::Operation};
use base64::Engine as _;
use std::{path::PathBuf, rc::Rc};

/// Capture the active page as PNG and write it to `path`
/// (or `screenshot_<unix-ts>.png`). Yields the path written.
pub fn screenshot<E: Engine>(path: Option<PathBuf>) -> Operation<E, PathBuf> {
    let path = path.unwrap_or_else(|| PathBuf::from(default_screenshot_name()));
    Operation::new(format!("screenshot to {}", path.display()), move |engine: Rc<E>| async move {
        let png = engine.screenshot().await?;
        tokio::fs::write(&path, png).await?;
        log::info!("Screenshot saved: {}", path.display());
        Ok(path)
    })
}

/// Capture the active page as base64-encoded PNG
pub fn screenshot_base64<E: Engine>() -> Operation<E, String> {
    Operation::new("screenshot as base64", |engine: Rc<E>| async move {
        let png = engine.screenshot().await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(png))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::BrowserError,
                operations::run_with,
                testing::{FAKE_PNG, FakeSite}};

    #[test]
    fn test_screenshot_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("shot.png");

        let (result, journal) = run_with(FakeSite::new(), screenshot(Some(target.clone())));
        assert_eq!(result.unwrap(), target);
        assert_eq!(std::fs::read(&target).unwrap(), FAKE_PNG);
        assert!(journal.contains("screenshot"));
    }

    #[test]
    fn test_screenshot_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("shot.png");

        let (result, _) = run_with(FakeSite::new(), screenshot(Some(target)));
        assert!(matches!(result, Err(BrowserError::Io(_))));
    }

    #[test]
    fn test_screenshot_base64() {
        let (result, _) = run_with(FakeSite::new(), screenshot_base64());
        assert_eq!(result.unwrap(), "iVBORw0KGgo=");
    }
}
