use crate::{browser::Engine, runtime::Operation};
use std::rc::Rc;

/// Inner text of the first element matching `selector`
pub fn get_text<E: Engine>(selector: &str) -> Operation<E, String> {
    let selector = selector.to_string();
    Operation::new(format!("get text of '{}'", selector), move |engine: Rc<E>| async move {
        engine.inner_text(&selector).await
    })
}

/// Inner text of every element matching `selector`; empty when nothing matches
pub fn get_texts<E: Engine>(selector: &str) -> Operation<E, Vec<String>> {
    let selector = selector.to_string();
    Operation::new(format!("get all text of '{}'", selector), move |engine: Rc<E>| async move {
        engine.inner_texts(&selector).await
    })
}

pub fn get_attribute<E: Engine>(selector: &str, name: &str) -> Operation<E, Option<String>> {
    let selector = selector.to_string();
    let name = name.to_string();
    Operation::new(format!("get attribute '{}' of '{}'", name, selector), move |engine: Rc<E>| async move {
        engine.attribute(&selector, &name).await
    })
}

pub fn html<E: Engine>() -> Operation<E, String> {
    Operation::new("read html", |engine: Rc<E>| async move { engine.content().await })
}

/// Page HTML converted to Markdown, prefixed with the title as a heading
pub fn markdown<E: Engine>() -> Operation<E, String> {
    Operation::new("read markdown", |engine: Rc<E>| async move {
        let title = engine.title().await?;
        let content = html2md::parse_html(&engine.content().await?);

        Ok(if title.is_empty() { content } else { format!("# {}\n\n{}", title, content) })
    })
}
