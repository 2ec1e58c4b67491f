//! Latency injection around a handler.
//!
//! [`delay`] wraps any [`Handler`] and returns a handler that behaves the same
//! except that it pauses before and/or after the wrapped one runs. Use it in
//! test environments to force a particular ordering between concurrent
//! requests and reproduce client-side races deterministically.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use stall::middleware::delay::{delay, header, max};
//! use stall::{Request, Response, Server};
//!
//! async fn hello(_req: Request) -> Response {
//!     Response::text("Hello world\n")
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // Clients send `delay-before: 300ms` / `delay-after: 1.5s`,
//!     // never more than 5s each.
//!     let app = delay(hello, [header("delay"), max(Duration::from_secs(5))]);
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```
//!
//! # Lifecycle of one request
//!
//! ```text
//! resolve plan ─▶ wait(before) ─cancelled─▶ stop, handler never runs
//!                      │
//!                      ▼
//!                 call handler ─cancelled since?─▶ return its response
//!                      │
//!                      ▼
//!                 wait(after) ─▶ return its response
//! ```
//!
//! The wrapped handler runs at most once, and the added latency never exceeds
//! twice the configured [`max`]. This is not a rate limiter or a fault
//! injector: responses pass through unchanged.

mod config;
mod duration;
mod resolve;
mod wait;

use std::sync::Arc;

use tracing::debug;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

pub use self::config::{
    DEFAULT_AFTER, DEFAULT_BEFORE, DEFAULT_MAX, DelayConfig, DelayOption, condition, fixed,
    header, max,
};
pub use self::duration::{ParseDurationError, parse_duration};
pub use self::resolve::{Phase, Plan};
pub use self::wait::{WaitOutcome, wait};

/// Wraps `handler` so that each request is paused according to `options`.
///
/// With no options every request waits 1s before reaching `handler`.
/// The options are applied once, here; the resulting [`DelayConfig`] is
/// shared read-only by all requests.
pub fn delay<I>(handler: impl Handler, options: I) -> impl Handler
where
    I: IntoIterator<Item = DelayOption>,
{
    delay_with(handler, DelayConfig::from_options(options))
}

/// Like [`delay`], with a configuration built beforehand.
pub fn delay_with(handler: impl Handler, config: DelayConfig) -> impl Handler {
    let inner = handler.into_boxed_handler();
    let config = Arc::new(config);
    move |req: Request| {
        let inner = Arc::clone(&inner);
        let config = Arc::clone(&config);
        async move { run(&config, &inner, req).await }
    }
}

/// Before-wait, handler, after-wait, stopping early on cancellation.
async fn run(config: &DelayConfig, inner: &BoxedHandler, req: Request) -> Response {
    let signal = req.cancel_signal().clone();
    let plan = config.plan(&req);
    debug!(before = ?plan.before, after = ?plan.after, path = req.path(), "delaying request");

    if let WaitOutcome::Cancelled(reason) = wait(plan.before, &signal).await {
        debug!(%reason, phase = %Phase::Before, "request cancelled, skipping handler");
        return Response::cancelled();
    }

    let response = inner.call(req).await;

    if let Some(reason) = signal.reason() {
        debug!(%reason, "request cancelled during handler, skipping after-delay");
        return response;
    }

    if let WaitOutcome::Cancelled(reason) = wait(plan.after, &signal).await {
        debug!(%reason, phase = %Phase::After, "request cancelled during delay");
    }
    response
}
