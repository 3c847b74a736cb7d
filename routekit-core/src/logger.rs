//! Logging capability handed to routes and CRUD operations.
//!
//! The core never requires a logger: [`Logger`] wraps an optional
//! [`ApiLogger`] and every call is a no-op when none is installed.

use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Leveled logging sink.
pub trait ApiLogger: Send + Sync {
    fn log(&self, message: &str, context: &Value);
    fn info(&self, message: &str, context: &Value);
    fn warn(&self, message: &str, context: &Value);
    fn error(&self, message: &str, context: &Value);
    fn debug(&self, message: &str, context: &Value);
    fn trace(&self, message: &str, context: &Value);
}

/// [`ApiLogger`] forwarding to `tracing` with the context as a field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ApiLogger for TracingLogger {
    fn log(&self, message: &str, context: &Value) {
        tracing::info!(context = %context, "{message}");
    }

    fn info(&self, message: &str, context: &Value) {
        tracing::info!(context = %context, "{message}");
    }

    fn warn(&self, message: &str, context: &Value) {
        tracing::warn!(context = %context, "{message}");
    }

    fn error(&self, message: &str, context: &Value) {
        tracing::error!(context = %context, "{message}");
    }

    fn debug(&self, message: &str, context: &Value) {
        tracing::debug!(context = %context, "{message}");
    }

    fn trace(&self, message: &str, context: &Value) {
        tracing::trace!(context = %context, "{message}");
    }
}

/// Optional logger capability, cheap to clone.
#[derive(Clone, Default)]
pub struct Logger(Option<Arc<dyn ApiLogger>>);

impl Logger {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new(logger: impl ApiLogger + 'static) -> Self {
        Self(Some(Arc::new(logger)))
    }

    pub fn from_arc(logger: Arc<dyn ApiLogger>) -> Self {
        Self(Some(logger))
    }

    pub fn tracing() -> Self {
        Self::new(TracingLogger)
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    pub fn log(&self, message: &str, context: &Value) {
        if let Some(ref l) = self.0 {
            l.log(message, context);
        }
    }

    pub fn info(&self, message: &str, context: &Value) {
        if let Some(ref l) = self.0 {
            l.info(message, context);
        }
    }

    pub fn warn(&self, message: &str, context: &Value) {
        if let Some(ref l) = self.0 {
            l.warn(message, context);
        }
    }

    pub fn error(&self, message: &str, context: &Value) {
        if let Some(ref l) = self.0 {
            l.error(message, context);
        }
    }

    pub fn debug(&self, message: &str, context: &Value) {
        if let Some(ref l) = self.0 {
            l.debug(message, context);
        }
    }

    pub fn trace(&self, message: &str, context: &Value) {
        if let Some(ref l) = self.0 {
            l.trace(message, context);
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Logger").field(&self.is_enabled()).finish()
    }
}

/// Install a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`
/// (default `info`). Does nothing if a global subscriber already exists.
pub fn init_tracing() {
    init_tracing_with("info");
}

pub fn init_tracing_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, String)>>);

    impl Recorder {
        fn push(&self, level: &str, message: &str) {
            self.0
                .lock()
                .unwrap()
                .push((level.to_string(), message.to_string()));
        }
    }

    impl ApiLogger for Arc<Recorder> {
        fn log(&self, m: &str, _: &Value) {
            self.push("log", m)
        }
        fn info(&self, m: &str, _: &Value) {
            self.push("info", m)
        }
        fn warn(&self, m: &str, _: &Value) {
            self.push("warn", m)
        }
        fn error(&self, m: &str, _: &Value) {
            self.push("error", m)
        }
        fn debug(&self, m: &str, _: &Value) {
            self.push("debug", m)
        }
        fn trace(&self, m: &str, _: &Value) {
            self.push("trace", m)
        }
    }

    #[test]
    fn absent_logger_is_silent() {
        let logger = Logger::none();
        assert!(!logger.is_enabled());
        logger.error("ignored", &json!({}));
    }

    #[test]
    fn levels_reach_the_sink() {
        let recorder = Arc::new(Recorder::default());
        let logger = Logger::new(recorder.clone());
        logger.info("a", &json!({}));
        logger.warn("b", &json!({ "k": 1 }));
        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen, vec![("info".into(), "a".into()), ("warn".into(), "b".into())]);
    }
}
