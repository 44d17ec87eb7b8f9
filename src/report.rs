use crate::error::TourError;

/// Receives failures that a cache or resolver operation swallowed.
///
/// Read paths never surface errors to their callers; they hand them here
/// so a host can still show or count them.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, error: &TourError);
}

/// Default reporter: a warning on the `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, context: &str, error: &TourError) {
        tracing::warn!(context, %error, "offline cache error");
    }
}
