//! Middleware layer.
//!
//! Middleware takes a [`Handler`](crate::Handler) and returns another one, so
//! layers compose by plain function application and the server never needs to
//! know they are there:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use stall::middleware::delay::{delay, fixed};
//! # async fn hello(_req: stall::Request) -> &'static str { "hi" }
//!
//! let app = delay(hello, [fixed(Duration::from_millis(300), Duration::ZERO)]);
//! ```
//!
//! Built-in middleware:
//! - [`delay`] — pauses before and after a handler to reproduce request races

pub mod delay;
