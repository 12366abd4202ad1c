use crate::{browser::{Engine, PageId},
            runtime::Operation};
use std::rc::Rc;

/// Open a new page. The active page does not change.
pub fn new_page<E: Engine>() -> Operation<E, PageId> {
    Operation::new("open new page", |engine: Rc<E>| async move { engine.new_page().await })
}

pub fn switch_to<E: Engine>(page: PageId) -> Operation<E, ()> {
    Operation::new(format!("switch to {}", page), move |engine: Rc<E>| async move { engine.activate(page) })
}

pub fn close_page<E: Engine>(page: PageId) -> Operation<E, ()> {
    Operation::new(format!("close {}", page), move |engine: Rc<E>| async move { engine.close_page(page).await })
}

pub fn list_pages<E: Engine>() -> Operation<E, Vec<PageId>> {
    Operation::new("list pages", |engine: Rc<E>| async move { Ok(engine.pages()) })
}

/// Close every page but the first and make it active. Yields how many were closed.
pub fn close_all_pages<E: Engine>() -> Operation<E, usize> {
    Operation::new("close extra pages", |engine: Rc<E>| async move {
        let pages = engine.pages();
        let Some((&first, extra)) = pages.split_first() else {
            return Ok(0);
        };

        for &page in extra {
            engine.close_page(page).await?;
        }
        engine.activate(first)?;
        Ok(extra.len())
    })
}
