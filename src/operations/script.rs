use crate::{browser::Engine, runtime::Operation};
use std::rc::Rc;

/// Evaluate JavaScript in the active page and return its JSON result
pub fn evaluate<E: Engine>(script: &str) -> Operation<E, serde_json::Value> {
    let script = script.to_string();
    Operation::new(format!("evaluate `{}`", preview(&script)), move |engine: Rc<E>| async move {
        engine.evaluate(&script).await
    })
}

pub fn scroll_to_bottom<E: Engine>() -> Operation<E, ()> {
    Operation::new("scroll to bottom", |engine: Rc<E>| async move {
        engine.evaluate("window.scrollTo(0, document.body.scrollHeight)").await?;
        Ok(())
    })
}

/// First line of a script, shortened for log lines
fn preview(script: &str) -> String {
    const MAX: usize = 60;
    let line = script.trim().lines().next().unwrap_or_default();
    if line.chars().count() > MAX {
        format!("{}...", line.chars().take(MAX).collect::<String>())
    } else {
        line.to_string()
    }
}
