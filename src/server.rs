//! HTTP server, per-request cancellation and graceful shutdown.
//!
//! # Cancellation
//!
//! Every request gets its own [`Canceller`](crate::cancel::Canceller). The
//! handler runs on a task of its own, so it keeps running cooperatively
//! whatever happens to the connection, and the server fires the signal when:
//!
//! 1. the peer goes away: hyper drops the in-flight request future, which
//!    drops a guard that fires [`CancelReason::ClientDisconnected`];
//! 2. the configured [`request_timeout`](Server::request_timeout) elapses:
//!    the server fires [`CancelReason::DeadlineExceeded`] and answers
//!    `503 Service Unavailable` without waiting for the handler.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or Ctrl-C the server stops accepting connections, lets every
//! in-flight connection run to completion, then returns from
//! [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cancel::{self, CancelReason};
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: String,
    request_timeout: Option<Duration>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The address is resolved at that point.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use stall::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), request_timeout: None }
    }

    /// Cancels requests that have not produced a response within `limit`.
    /// Unset by default: requests may take as long as they like.
    pub fn request_timeout(mut self, limit: Duration) -> Self {
        self.request_timeout = Some(limit);
        self
    }

    /// Starts accepting connections and dispatching them to `handler`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, handler: impl Handler) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr.as_str()).await?;
        self.serve_listener(listener, handler, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), on an already-bound listener and
    /// stopping when `shutdown` resolves. The bind address is ignored.
    pub async fn serve_listener<S>(
        self,
        listener: TcpListener,
        handler: impl Handler,
        shutdown: S,
    ) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let handler = handler.into_boxed_handler();
        let request_timeout = self.request_timeout;

        info!(addr = %listener.local_addr()?, ?request_timeout, "stall listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM immediately stops
                // accepting new connections, even if more are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let handler = Arc::clone(&handler);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let handler = Arc::clone(&handler);
                            async move { dispatch(handler, req, remote_addr, request_timeout).await }
                        });

                        // `auto::Builder` handles both HTTP/1.1 and HTTP/2.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("stall stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request to completion and produces one response.
///
/// Errors never reach hyper: body read failures answer `400`, a panicking
/// handler answers `500`, an expired deadline answers `503`.
async fn dispatch(
    handler: BoxedHandler,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
    request_timeout: Option<Duration>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let (canceller, signal) = cancel::channel();
    let request = Request::from_parts(parts, body, signal);

    // If hyper drops this future because the peer went away, the guard fires.
    let on_disconnect = canceller.clone().cancel_on_drop(CancelReason::ClientDisconnected);

    let mut task = tokio::spawn(async move { handler.call(request).await });

    let joined = match request_timeout {
        Some(limit) => tokio::select! {
            joined = &mut task => joined,
            () = tokio::time::sleep(limit) => {
                canceller.cancel(CancelReason::DeadlineExceeded);
                on_disconnect.disarm();
                warn!(peer = %remote_addr, ?limit, "request deadline exceeded");
                return Ok(Response::status(StatusCode::SERVICE_UNAVAILABLE).into_inner());
            }
        },
        None => task.await,
    };
    on_disconnect.disarm();

    match joined {
        Ok(response) => Ok(response.into_inner()),
        Err(e) => {
            error!(peer = %remote_addr, "handler task failed: {e}");
            Ok(Response::status(StatusCode::INTERNAL_SERVER_ERROR).into_inner())
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. If a handler cannot be installed the
/// failure is logged and that arm never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
