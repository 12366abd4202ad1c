use ga_scrap::{BrowserError, ExecutionMode, ExecutionResult, Operation, Scraper, ScraperConfig, Session, SessionState,
               Timeouts,
               runtime::RESILIENT_LOG_TARGET,
               testing::{FakeElement, FakeEngine, FakeLauncher, FakePage, FakeSite}};
use std::{rc::Rc,
          sync::{Arc, Mutex, OnceLock,
                 atomic::{AtomicUsize, Ordering}},
          thread,
          time::{Duration, Instant}};

/// Records every log line so tests can assert on warnings for their own session
struct CapturingLogger {
    records: Mutex<Vec<(log::Level, String, String)>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.push((record.level(), record.target().to_string(), record.args().to_string()));
    }

    fn flush(&self) {}
}

fn logger() -> &'static CapturingLogger {
    static LOGGER: OnceLock<&'static CapturingLogger> = OnceLock::new();
    LOGGER.get_or_init(|| {
        let logger: &'static CapturingLogger = Box::leak(Box::new(CapturingLogger { records: Mutex::new(Vec::new()) }));
        log::set_logger(logger).unwrap();
        log::set_max_level(log::LevelFilter::Debug);
        logger
    })
}

/// Log lines of `level` mentioning `session`
fn logged(session: &str, level: log::Level) -> Vec<(String, String)> {
    let prefix = format!("session {}:", session);
    logger()
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(l, _, message)| *l == level && message.starts_with(&prefix))
        .map(|(_, target, message)| (target.clone(), message.clone()))
        .collect()
}

fn site() -> FakeSite {
    FakeSite::new()
        .page(
            "https://shop.test/",
            FakePage::new("Shop")
                .element("h1", FakeElement::text("Welcome"))
                .element("li.item", FakeElement::text("Boots"))
                .element("li.item", FakeElement::text("Scarf")),
        )
        .page("https://shop.test/cart", FakePage::new("Cart"))
}

fn timeouts(operation_ms: u64) -> Timeouts {
    Timeouts {
        operation: Duration::from_millis(operation_ms),
        startup: Duration::from_secs(2),
        shutdown: Duration::from_secs(2),
    }
}

fn sleeping(duration: Duration) -> Operation<FakeEngine, ()> {
    Operation::new(format!("sleep {:?}", duration), move |_: Rc<FakeEngine>| async move {
        tokio::time::sleep(duration).await;
        Ok(())
    })
}

fn current_thread() -> Operation<FakeEngine, thread::ThreadId> {
    Operation::new("thread id", |_: Rc<FakeEngine>| async { Ok(thread::current().id()) })
}

#[test]
fn start_is_idempotent() {
    let launcher = FakeLauncher::new(site());
    let launches = launcher.launches();
    let session = Session::new(launcher, ExecutionMode::Strict, timeouts(1_000));

    session.start().unwrap();
    let worker = session.worker_thread();
    session.start().unwrap();

    assert_eq!(launches.load(Ordering::SeqCst), 1);
    assert_eq!(session.worker_thread(), worker);
    assert_eq!(session.state(), SessionState::Running);
    session.stop();
}

#[test]
fn stop_is_idempotent_and_safe_before_start() {
    let session = Session::new(FakeLauncher::new(site()), ExecutionMode::Strict, timeouts(1_000));
    session.stop();
    assert_eq!(session.state(), SessionState::Idle);

    session.start().unwrap();
    session.stop();
    session.stop();
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.worker_thread(), None);
}

#[test]
fn dispatch_requires_running_session_in_both_modes() {
    for mode in [ExecutionMode::Strict, ExecutionMode::Resilient] {
        let session = Session::new(FakeLauncher::new(site()), mode, timeouts(1_000));
        assert!(matches!(session.dispatch(current_thread()), Err(BrowserError::SessionNotStarted)));
        assert!(matches!(session.execute(current_thread()), Err(BrowserError::SessionNotStarted)));

        session.start().unwrap();
        session.stop();
        assert!(matches!(session.execute(current_thread()), Err(BrowserError::SessionNotStarted)));
    }
}

#[test]
fn operations_run_on_the_worker_thread() {
    let session = Session::new(FakeLauncher::new(site()), ExecutionMode::Strict, timeouts(1_000));
    session.start().unwrap();

    let worker = session.worker_thread().unwrap();
    assert_ne!(worker, thread::current().id());
    for _ in 0..3 {
        assert_eq!(session.execute(current_thread()).unwrap(), Some(worker));
    }
    session.stop();
}

#[test]
fn timeout_returns_within_bound_while_action_keeps_running() {
    let session = Session::new(FakeLauncher::new(site()), ExecutionMode::Resilient, timeouts(1_000));
    session.start().unwrap();

    let started = Instant::now();
    let outcome = session.dispatch(sleeping(Duration::from_secs(5))).unwrap();
    let elapsed = started.elapsed();

    assert!(matches!(outcome, ExecutionResult::TimedOut { timeout } if timeout == Duration::from_secs(1)));
    assert!(elapsed >= Duration::from_millis(900), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);
    assert_eq!(session.stats().timed_out, 1);
}

#[test]
fn strict_timeout_raises_and_stops_the_session() {
    let scraper = Scraper::with_launcher(FakeLauncher::new(site()), ScraperConfig::default().timeout_ms(1_000));
    scraper.start().unwrap();

    let started = Instant::now();
    let err = scraper.run(sleeping(Duration::from_secs(5))).unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(err, BrowserError::Timeout { timeout_ms: 1_000, .. }));
    assert_eq!(scraper.state(), SessionState::Stopped);
}

#[test]
fn operation_timeout_overrides_session_default() {
    let session = Session::new(FakeLauncher::new(site()), ExecutionMode::Resilient, timeouts(10_000));
    session.start().unwrap();

    let started = Instant::now();
    let outcome = session.dispatch(sleeping(Duration::from_secs(2)).with_timeout(Duration::from_millis(100))).unwrap();
    assert!(outcome.is_timed_out());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn strict_failure_leaves_session_unusable_until_restarted() {
    let launcher = FakeLauncher::new(site());
    let launches = launcher.launches();
    let scraper = Scraper::with_launcher(launcher, ScraperConfig::default());
    scraper.start().unwrap();

    scraper.goto("https://shop.test/").unwrap();
    assert!(matches!(scraper.get_text("#missing"), Err(BrowserError::ElementNotFound(_))));
    assert_eq!(scraper.state(), SessionState::Stopped);
    assert!(matches!(scraper.title(), Err(BrowserError::SessionNotStarted)));

    scraper.start().unwrap();
    assert_eq!(launches.load(Ordering::SeqCst), 2);
    scraper.goto("https://shop.test/cart").unwrap();
    assert_eq!(scraper.title().unwrap().as_deref(), Some("Cart"));
}

#[test]
fn resilient_sequence_logs_one_warning_and_continues() {
    logger();
    let scraper = Scraper::with_launcher(FakeLauncher::new(site()), ScraperConfig::default().resilient());
    scraper.start().unwrap();
    scraper.goto("https://shop.test/").unwrap();

    let first = scraper.get_text("h1").unwrap();
    let second = scraper.get_text("#missing").unwrap();
    let third = scraper.get_texts("li.item").unwrap();

    assert_eq!(first.as_deref(), Some("Welcome"));
    assert_eq!(second, None);
    assert_eq!(third, Some(vec!["Boots".to_string(), "Scarf".to_string()]));

    let warnings = logged(&scraper.session().id().to_string(), log::Level::Warn);
    assert_eq!(warnings.len(), 1, "{:?}", warnings);
    assert_eq!(warnings[0].0, RESILIENT_LOG_TARGET);
    assert_eq!(
        warnings[0].1,
        format!(
            "session {}: suppressed failure in 'get text of '#missing'': Element not found: Element '#missing' not found",
            scraper.session().id()
        )
    );
    assert_eq!(scraper.state(), SessionState::Running);
}

#[test]
fn resilient_timeout_logs_one_warning_and_keeps_session() {
    logger();
    let scraper = Scraper::with_launcher(FakeLauncher::new(site()), ScraperConfig::default().resilient().timeout_ms(1_000));
    scraper.start().unwrap();

    let started = Instant::now();
    assert_eq!(scraper.run(sleeping(Duration::from_secs(5))).unwrap(), None);
    assert!(started.elapsed() < Duration::from_secs(3), "returned after {:?}", started.elapsed());

    let session = scraper.session();
    let warnings = logged(&session.id().to_string(), log::Level::Warn);
    assert_eq!(
        warnings,
        vec![(
            RESILIENT_LOG_TARGET.to_string(),
            format!("session {}: suppressed timeout in 'sleep 5s' after 1000ms", session.id())
        )]
    );
    assert_eq!(scraper.state(), SessionState::Running);

    // The abandoned sleep still occupies the worker; the next call queues behind it
    let outcome = session.dispatch(current_thread().with_timeout(Duration::from_secs(10))).unwrap();
    assert!(outcome.is_success());
}

#[test]
fn panicking_action_is_reported_and_worker_survives() {
    let launcher = FakeLauncher::new(site());
    let journal = launcher.journal();
    let session = Session::new(launcher, ExecutionMode::Resilient, timeouts(1_000));
    session.start().unwrap();
    let worker = session.worker_thread();

    let out_of_range: Operation<FakeEngine, u32> = Operation::new("fourth item", |_: Rc<FakeEngine>| async {
        let items: Vec<u32> = vec![1, 2];
        Ok(items[3])
    });
    match session.dispatch(out_of_range).unwrap() {
        ExecutionResult::Failure(BrowserError::OperationPanicked { operation, message }) => {
            assert_eq!(operation, "fourth item");
            assert!(message.contains("index out of bounds"), "{}", message);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    assert_eq!(session.state(), SessionState::Running);
    assert!(matches!(session.dispatch(current_thread()).unwrap(), ExecutionResult::Success(id) if Some(id) == worker));

    session.stop();
    assert_eq!(journal.entries().last().map(String::as_str), Some("close"));
}

#[test]
fn resilient_chain_survives_failing_step() {
    let launcher = FakeLauncher::new(site());
    let journal = launcher.journal();
    let scraper = Scraper::with_launcher(launcher, ScraperConfig::default().resilient());
    scraper.start().unwrap();

    let first = scraper.goto("https://shop.test/").unwrap();
    let second = first.click("#missing").unwrap();
    let third = second.goto("https://shop.test/cart").unwrap();

    assert!(std::ptr::eq(first, &scraper));
    assert!(std::ptr::eq(second, &scraper));
    assert!(std::ptr::eq(third, &scraper));
    assert!(journal.contains("goto https://shop.test/cart"));
    assert_eq!(scraper.session().stats().suppressed, 1);
}

#[test]
fn stop_with_queued_operations_completes_or_discards_them() {
    let launcher = FakeLauncher::new(site());
    let journal = launcher.journal();
    let session = Session::new(launcher, ExecutionMode::Resilient, timeouts(5_000));
    session.start().unwrap();

    let outcomes = thread::scope(|scope| {
        let busy = scope.spawn(|| session.dispatch(sleeping(Duration::from_millis(300))));
        while session.stats().dispatched < 1 {
            thread::sleep(Duration::from_millis(5));
        }

        let queued: Vec<_> = (0..3).map(|_| scope.spawn(|| session.dispatch(current_thread()))).collect();
        while session.stats().dispatched < 4 {
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        session.stop();
        assert!(started.elapsed() < Duration::from_secs(3));

        let busy = busy.join().unwrap().unwrap();
        let queued: Vec<_> = queued.into_iter().map(|handle| handle.join().unwrap().unwrap()).collect();
        (busy, queued)
    });

    assert!(outcomes.0.is_success());
    for outcome in outcomes.1 {
        match outcome {
            ExecutionResult::Success(_) | ExecutionResult::Failure(BrowserError::Discarded(_)) => {}
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(journal.entries().last().map(String::as_str), Some("close"));
}

#[test]
fn stop_abandons_a_worker_that_outlives_the_shutdown_bound() {
    logger();
    let session = Session::new(
        FakeLauncher::new(site()),
        ExecutionMode::Resilient,
        Timeouts { shutdown: Duration::from_millis(200), ..timeouts(100) },
    );
    session.start().unwrap();
    assert!(session.dispatch(sleeping(Duration::from_secs(2))).unwrap().is_timed_out());

    let started = Instant::now();
    session.stop();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(session.state(), SessionState::Stopped);

    let errors = logged(&session.id().to_string(), log::Level::Error);
    assert!(errors.iter().any(|(_, message)| message.contains("did not exit within 200ms")), "{:?}", errors);
}

#[test]
fn teardown_closes_pages_then_context_then_engine() {
    let launcher = FakeLauncher::new(site());
    let journal = launcher.journal();
    let scraper = Scraper::with_launcher(launcher, ScraperConfig::default());
    scraper.start().unwrap();
    scraper.new_page().unwrap();
    scraper.stop();

    let entries = journal.entries();
    let tail: Vec<&str> = entries.iter().rev().take(4).rev().map(String::as_str).collect();
    assert_eq!(tail, ["close_page page-0", "close_page page-1", "close_context", "close"]);
}

#[test]
fn slow_launch_fails_startup_within_bound() {
    let launcher = FakeLauncher::new(site()).launch_delay(Duration::from_secs(2));
    let session = Session::new(
        launcher,
        ExecutionMode::Strict,
        Timeouts { startup: Duration::from_millis(200), ..timeouts(1_000) },
    );

    let started = Instant::now();
    let err = session.start().unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(err, BrowserError::StartupFailed(_)));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn failing_launch_reports_startup_failure() {
    let session =
        Session::new(FakeLauncher::new(site()).failing("chrome not found"), ExecutionMode::Resilient, timeouts(1_000));

    match session.start() {
        Err(BrowserError::StartupFailed(reason)) => assert!(reason.contains("chrome not found")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!session.is_running());
}

#[test]
fn operations_never_overlap() {
    let session = Session::new(FakeLauncher::new(site()), ExecutionMode::Strict, timeouts(5_000));
    session.start().unwrap();

    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    thread::scope(|scope| {
        for caller in 0..4 {
            let (active, peak, order, session) = (&active, &peak, &order, &session);
            scope.spawn(move || {
                for step in 0..5 {
                    let (active, peak, order) = (Arc::clone(active), Arc::clone(peak), Arc::clone(order));
                    let op = Operation::new("probe", move |_: Rc<FakeEngine>| async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        order.lock().unwrap().push((caller, step));
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    });
                    session.execute(op).unwrap();
                }
            });
        }
    });

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    let order = order.lock().unwrap();
    assert_eq!(order.len(), 20);
    for caller in 0..4 {
        let steps: Vec<_> = order.iter().filter(|(c, _)| *c == caller).map(|(_, s)| *s).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4]);
    }
    session.stop();
}

#[test]
fn stats_track_outcomes() {
    let session = Session::new(FakeLauncher::new(site()), ExecutionMode::Resilient, timeouts(1_000));
    session.start().unwrap();

    session.execute(current_thread()).unwrap();
    let failing: Operation<FakeEngine, ()> =
        Operation::new("explode", |_: Rc<FakeEngine>| async { Err(BrowserError::EvaluationFailed("boom".into())) });
    assert_eq!(session.execute(failing).unwrap(), None);

    let stats = session.stats();
    assert_eq!((stats.dispatched, stats.succeeded, stats.failed, stats.suppressed), (2, 1, 1, 1));
    session.stop();
}
