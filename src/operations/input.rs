use crate::{browser::Engine, runtime::Operation};
use std::rc::Rc;

/// Replace the contents of an input field with `text`
pub fn fill<E: Engine>(selector: &str, text: &str) -> Operation<E, ()> {
    let selector = selector.to_string();
    let text = text.to_string();
    Operation::new(format!("fill '{}'", selector), move |engine: Rc<E>| async move {
        engine.fill(&selector, &text).await
    })
}
