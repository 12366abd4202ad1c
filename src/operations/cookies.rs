use crate::{browser::{Cookie, Engine},
            runtime::Operation};
use std::rc::Rc;

pub fn cookies<E: Engine>() -> Operation<E, Vec<Cookie>> {
    Operation::new("read cookies", |engine: Rc<E>| async move { engine.cookies().await })
}

pub fn add_cookie<E: Engine>(cookie: Cookie) -> Operation<E, ()> {
    Operation::new(format!("add cookie '{}'", cookie.name), move |engine: Rc<E>| async move {
        engine.set_cookie(&cookie).await
    })
}

pub fn clear_cookies<E: Engine>() -> Operation<E, ()> {
    Operation::new("clear cookies", |engine: Rc<E>| async move { engine.clear_cookies().await })
}
