//! Per-thread log capture for unit tests.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, Log, Metadata, Record};

thread_local! {
    static RECORDS: RefCell<Option<Vec<(Level, String)>>> = const { RefCell::new(None) };
}

struct Capture;

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            if let Some(records) = records.borrow_mut().as_mut() {
                records.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;
static INSTALL: Once = Once::new();

/// Runs `f` and returns what it logged on the current thread.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<(Level, String)>) {
    INSTALL.call_once(|| {
        if log::set_logger(&CAPTURE).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
    RECORDS.with(|records| *records.borrow_mut() = Some(Vec::new()));
    let out = f();
    let logged = RECORDS.with(|records| records.borrow_mut().take().unwrap_or_default());
    (out, logged)
}

/// Whether any warning in `logged` mentions every one of `needles`.
pub(crate) fn warned(logged: &[(Level, String)], needles: &[&str]) -> bool {
    logged
        .iter()
        .any(|(level, msg)| *level == Level::Warn && needles.iter().all(|n| msg.contains(n)))
}
