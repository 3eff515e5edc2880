//! Logging for CosmWasm-hosted code.
//!
//! With the `logging` feature the standard `log` macros route through the
//! host's `api.debug()`; without it every macro expands to nothing, so
//! production builds carry no logging code at all. Call [`init_logger`] at
//! the start of each contract entry point; repeated calls are a no-op.

#[cfg(feature = "logging")]
mod enabled {
    use cosmwasm_std::Api;
    use log::{Level, Log, Metadata, Record};
    use std::sync::Once;

    pub use log::{debug, error, info, log, trace, warn};

    static LOGGER: ApiLogger = ApiLogger;
    static INIT: Once = Once::new();

    thread_local! {
        static HOST_API: std::cell::RefCell<Option<&'static dyn Api>> =
            const { std::cell::RefCell::new(None) };
    }

    struct ApiLogger;

    impl Log for ApiLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            HOST_API.with(|api| {
                if let Some(api) = *api.borrow() {
                    let level = match record.level() {
                        Level::Error => "ERROR",
                        Level::Warn => "WARN",
                        Level::Info => "INFO",
                        Level::Debug => "DEBUG",
                        Level::Trace => "TRACE",
                    };
                    api.debug(&format!("{}: [{}] {}", record.target(), level, record.args()));
                }
            });
        }

        fn flush(&self) {}
    }

    pub fn init_logger(api: &dyn Api) {
        INIT.call_once(|| {
            HOST_API.with(|slot| {
                // SAFETY: the host API outlives every contract call, which is
                // the only scope in which the logger dereferences it
                let api: &'static dyn Api = unsafe { std::mem::transmute(api) };
                *slot.borrow_mut() = Some(api);
            });
            let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Trace));
        });
    }
}

#[cfg(not(feature = "logging"))]
mod disabled {
    /// No-op stand-in for the feature-enabled initializer.
    pub fn init_logger(_api: &dyn cosmwasm_std::Api) {}

    #[macro_export]
    macro_rules! error {
        (target: $target:expr, $($arg:tt)*) => {};
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! warn {
        (target: $target:expr, $($arg:tt)*) => {};
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! info {
        (target: $target:expr, $($arg:tt)*) => {};
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug {
        (target: $target:expr, $($arg:tt)*) => {};
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! trace {
        (target: $target:expr, $($arg:tt)*) => {};
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! log {
        (target: $target:expr, $lvl:expr, $($arg:tt)+) => {};
        ($lvl:expr, $($arg:tt)+) => {};
    }
}

#[cfg(feature = "logging")]
pub use enabled::*;

#[cfg(not(feature = "logging"))]
pub use disabled::*;
