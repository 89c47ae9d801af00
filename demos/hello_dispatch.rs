//! Registers a few routes and dispatches hand-built requests against them.
//!
//! Run with `RUST_LOG=debug cargo run --example hello_dispatch` to see the
//! registration and lookup events alongside the per-request log lines.

use rttp_dispatch::context::Context;
use rttp_dispatch::{HandlerError, Method, Request, Router};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut router = Router::new();
    router
        .get("/hello/:name", |ctx: &mut Context| {
            format!("Hello, {}", ctx.param("name").unwrap_or("stranger"))
        })?
        .post("/orders", |_ctx: &mut Context| -> Result<String, HandlerError> {
            Err(HandlerError::msg("payment gateway timeout"))
        })?
        .get("404", |ctx: &mut Context| {
            format!("Nothing lives at {}", ctx.request().path())
        })?;
    router.static_files("/static", "./public");

    for request in [
        Request::get("/hello/Ada"),
        Request::new(Method::Post, "/orders"),
        Request::from_target(Method::Get, "/missing?from=demo"),
    ] {
        let out = router.dispatch(request);
        let (status, headers, body) = out.context.into_parts();
        println!("{status}\n{headers}{:?}\n", body);
    }

    Ok(())
}
