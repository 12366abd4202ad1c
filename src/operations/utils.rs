use std::time::{SystemTime, UNIX_EPOCH};

/// Turn what a user typed into a URL the engine can load.
///
/// - empty input loads `about:blank`
/// - anything with a scheme is kept
/// - filesystem paths become `file://` URLs, relative ones resolved against the
///   working directory
/// - loopback hosts get `http://`, other hosts `https://`
/// - a single bare word is treated as a `.com` domain: `github` -> `https://www.github.com`
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();

    if input.is_empty() {
        return "about:blank".to_string();
    }
    if has_scheme(input) {
        return input.to_string();
    }
    if input.starts_with('/') || input.starts_with("./") || input.starts_with("../") {
        return match std::path::absolute(input) {
            Ok(path) => format!("file://{}", path.display()),
            Err(_) => format!("file://{}", input),
        };
    }

    let host = input.split(['/', '?', '#']).next().unwrap_or_default();
    let hostname = host.rsplit_once(':').map_or(host, |(name, _)| name);
    match hostname {
        "localhost" | "127.0.0.1" | "[::1]" => format!("http://{}", input),
        _ if host.contains('.') || host.contains(':') || host != input => format!("https://{}", input),
        _ => format!("https://www.{}.com", input),
    }
}

/// `http:`, `data:`, `about:`... but not `localhost:3000`
fn has_scheme(input: &str) -> bool {
    let Some((scheme, rest)) = input.split_once(':') else {
        return false;
    };
    let is_scheme = scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-'));
    is_scheme && !rest.starts_with(|c: char| c.is_ascii_digit())
}

/// `screenshot_<unix seconds>.png`
pub fn default_screenshot_name() -> String {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
    format!("screenshot_{}.png", secs)
}
