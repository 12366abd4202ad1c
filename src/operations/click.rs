use crate::{browser::Engine, runtime::Operation};
use std::rc::Rc;

pub fn click<E: Engine>(selector: &str) -> Operation<E, ()> {
    let selector = selector.to_string();
    Operation::new(format!("click '{}'", selector), move |engine: Rc<E>| async move {
        engine.click(&selector).await
    })
}
