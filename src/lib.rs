//! # stall
//!
//! Latency injection for HTTP handlers, for test environments.
//!
//! Client-side race conditions often depend on the order in which concurrent
//! requests complete. `stall` wraps a handler so that every request pauses
//! before and/or after it runs, with durations that are fixed, capped, gated
//! by predicates, or chosen per request by the client through headers. That
//! makes the ordering you want to test reproducible. It has nothing to do
//! with memory-model data races.
//!
//! ## The contract
//!
//! The delay layer only changes *when* a response is produced:
//!
//! - **Output is untouched** — status, headers and body come from your handler
//! - **Bounded** — each pause is capped (20s by default), so a request gains
//!   at most twice the cap
//! - **Cancellable** — when the client disconnects or the server deadline
//!   passes, pauses stop and a not-yet-started handler never runs
//! - **Fail-open** — a malformed delay header means no delay, never an error
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use stall::middleware::delay::{delay, header, max};
//! use stall::{Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     // `curl -H 'delay-before: 300ms' -H 'delay-after: 1.5s' localhost:3000`
//!     let app = delay(hello, [header("delay"), max(Duration::from_secs(5))]);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn hello(_req: Request) -> Response {
//!     Response::text("Hello world\n")
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod server;

pub mod cancel;
pub mod middleware;

pub use error::Error;
pub use handler::Handler;
pub use request::{Request, RequestBuilder};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::Server;
