//! Per-request cancellation signal.
//!
//! The server owns one [`Canceller`] per in-flight request and hands the
//! matching [`CancelSignal`] to the handler inside the [`Request`](crate::Request).
//! Middleware never fires the signal; it only observes it.
//!
//! ```text
//! server task                          handler task
//! ───────────                          ────────────
//! let (canceller, signal) = channel();
//! spawn(handler(Request { signal }))   signal.cancelled().await
//! peer gone / deadline hit
//!   canceller.cancel(reason)   ──────▶ wakes with `reason`
//! ```
//!
//! Backed by a [`tokio::sync::watch`] channel holding `Option<CancelReason>`:
//! `None` while the request is live, `Some(reason)` once it is done. Waiting
//! on the channel parks the task; nothing polls in a loop.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Why a request stopped being worth answering.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CancelReason {
    /// The peer closed the connection before the response was written.
    ClientDisconnected,
    /// The server's request timeout elapsed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClientDisconnected => "client disconnected",
            Self::DeadlineExceeded   => "deadline exceeded",
        })
    }
}

/// Creates a linked canceller / signal pair for one request.
pub fn channel() -> (Canceller, CancelSignal) {
    let (tx, rx) = watch::channel(None);
    (Canceller { tx: Arc::new(tx) }, CancelSignal { rx })
}

// ── Canceller ─────────────────────────────────────────────────────────────────

/// The firing side. Owned by whoever controls the request's lifetime.
#[derive(Clone, Debug)]
pub struct Canceller {
    tx: Arc<watch::Sender<Option<CancelReason>>>,
}

impl Canceller {
    /// Fires the signal. The first reason wins; later calls are no-ops.
    pub fn cancel(&self, reason: CancelReason) {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
            true
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Returns a guard that fires the signal with `reason` when dropped,
    /// unless [`CancelOnDrop::disarm`] is called first.
    pub fn cancel_on_drop(self, reason: CancelReason) -> CancelOnDrop {
        CancelOnDrop { canceller: Some(self), reason }
    }
}

/// Fires its canceller on drop. See [`Canceller::cancel_on_drop`].
#[derive(Debug)]
pub struct CancelOnDrop {
    canceller: Option<Canceller>,
    reason: CancelReason,
}

impl CancelOnDrop {
    /// Consumes the guard without firing.
    pub fn disarm(mut self) {
        self.canceller = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(canceller) = self.canceller.take() {
            canceller.cancel(self.reason);
        }
    }
}

// ── CancelSignal ──────────────────────────────────────────────────────────────

/// The observing side, carried by every [`Request`](crate::Request).
///
/// Cloning is cheap and every clone sees the same state.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: watch::Receiver<Option<CancelReason>>,
}

impl CancelSignal {
    /// A signal that can never fire. Used for requests built outside a server.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self { rx }
    }

    /// The reason the request was cancelled, if it has been.
    pub fn reason(&self) -> Option<CancelReason> {
        *self.rx.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves once the signal fires, yielding the reason.
    ///
    /// If the canceller is dropped without firing, the request can no longer
    /// be cancelled and this future stays pending forever.
    pub async fn cancelled(&self) -> CancelReason {
        let mut rx = self.rx.clone();
        let fired = match rx.wait_for(Option::is_some).await {
            Ok(slot) => *slot,
            Err(_) => None,
        };
        match fired {
            Some(reason) => reason,
            None => std::future::pending().await,
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self { Self::never() }
}
