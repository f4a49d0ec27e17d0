//! Logging capability consumed by the engine.
//!
//! Skipped-for-safety outcomes are reported here rather than through return
//! values, so the logger is the main window into what a run actually did.
//! The engine takes any [`Logger`] implementation at construction; the
//! default forwards to the `tracing` macros and stays silent until the host
//! application installs a subscriber.

/// Receives leveled, preformatted messages from engine operations.
///
/// `verbose` is used for high-frequency detail such as idempotent no-ops;
/// everything a caller would normally want to see arrives at `info` (applied
/// mutations) and `warn` (mutations skipped to protect user changes).
pub trait Logger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn verbose(&self, message: &str);
}

/// Default logger forwarding to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn verbose(&self, message: &str) {
        tracing::trace!("{}", message);
    }
}

/// Logger that discards every message.
///
/// Useful for tests and for embedders that surface engine activity through
/// their own channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn verbose(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_tracing_logger_forwards_to_subscriber() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let logger = TracingLogger;
            logger.info("Written file (tracked): a.txt");
            logger.warn("Skipped write file (tracked): b.txt");
            logger.verbose("Tracked directory is already gone: out");
        });

        let output = capture.contents();
        assert!(output.contains("INFO"));
        assert!(output.contains("Written file (tracked): a.txt"));
        assert!(output.contains("WARN"));
        assert!(output.contains("Skipped write file (tracked): b.txt"));
        assert!(output.contains("TRACE"));
        assert!(output.contains("Tracked directory is already gone: out"));
    }
}
