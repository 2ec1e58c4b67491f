//! Cancellable pause.

use std::time::Duration;

use crate::cancel::{CancelReason, CancelSignal};

/// How a [`wait`] ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WaitOutcome {
    /// The full duration elapsed.
    Completed,
    /// The request was cancelled first; the rest of the pause is abandoned.
    Cancelled(CancelReason),
}

/// Sleeps for `duration` unless `signal` fires first.
///
/// A signal that has already fired wins even against a zero duration, so a
/// request cancelled before its pause is never treated as live.
pub async fn wait(duration: Duration, signal: &CancelSignal) -> WaitOutcome {
    if let Some(reason) = signal.reason() {
        return WaitOutcome::Cancelled(reason);
    }
    if duration.is_zero() {
        return WaitOutcome::Completed;
    }
    tokio::select! {
        biased;
        reason = signal.cancelled() => WaitOutcome::Cancelled(reason),
        () = tokio::time::sleep(duration) => WaitOutcome::Completed,
    }
}
