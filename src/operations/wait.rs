use crate::{browser::Engine, runtime::Operation};
use std::{rc::Rc, time::Duration};

/// Extra dispatch wait on top of an engine-side timeout
const DISPATCH_MARGIN: Duration = Duration::from_secs(1);

/// Wait until `selector` is present. The dispatch bound covers `timeout`.
pub fn wait_for<E: Engine>(selector: &str, timeout: Duration) -> Operation<E, ()> {
    let selector = selector.to_string();
    Operation::new(format!("wait for '{}'", selector), move |engine: Rc<E>| async move {
        engine.wait_for_selector(&selector, timeout).await
    })
    .with_timeout(timeout.saturating_add(DISPATCH_MARGIN))
}

/// Pause the worker without blocking it
pub fn sleep<E: Engine>(duration: Duration) -> Operation<E, ()> {
    Operation::new(format!("sleep {}ms", duration.as_millis()), move |_: Rc<E>| async move {
        tokio::time::sleep(duration).await;
        Ok(())
    })
    .with_timeout(duration.saturating_add(DISPATCH_MARGIN))
}
