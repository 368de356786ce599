//! Library error type

/// Errors surfaced while setting up metrics collection.
///
/// The request path never returns errors: measurement failures degrade to
/// zero-size observations so telemetry can never alter the application's
/// response.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Collector construction or registration failed, typically because a
    /// metric name is already registered or an option is invalid. This is a
    /// setup-time programming error and is surfaced eagerly at build time.
    #[error("collector setup failed: {0}")]
    Collector(#[from] prometheus::Error),
}
