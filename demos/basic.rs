//! Minimal stall example — a slow endpoint for reproducing request races.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try two overlapping requests and watch the second one finish first:
//!   curl -H 'delay-before: 2s' http://localhost:3000/orders &
//!   curl -H 'delay-before: 200ms' http://localhost:3000/orders
//!
//! Requests without the headers are answered immediately. Requests from the
//! health checker (`user-agent: kube-probe/...`) are never delayed.

use std::time::Duration;

use stall::middleware::delay::{condition, delay, header, max};
use stall::{Request, Response, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = delay(
        orders,
        [
            header("delay"),
            max(Duration::from_secs(5)),
            condition(|req: &Request| {
                !req.header("user-agent").is_some_and(|ua| ua.starts_with("kube-probe/"))
            }),
        ],
    );

    if let Err(e) = Server::bind("0.0.0.0:3000")
        .request_timeout(Duration::from_secs(30))
        .serve(app)
        .await
    {
        eprintln!("server error: {e}");
        std::process::exit(1);
    }
}

async fn orders(req: Request) -> Response {
    Response::json(format!(r#"{{"path":"{}","orders":[]}}"#, req.path()).into_bytes())
}
