//! # rttp-dispatch
//!
//! Route registry, path matching and request dispatch for rttp.
//!
//! The host server hands over an already-parsed [`Request`]; the [`Router`]
//! picks the first registered route whose verb and path pattern match, runs
//! its handler against a fresh [`Context`](context::Context), captures any
//! failure as a `500`, runs the after-filters, and returns the finished
//! context for the host to write back.
//!
//! ## Quick Start
//!
//! ```rust
//! use rttp_dispatch::{Request, Router, StatusCode};
//! use rttp_dispatch::context::Context;
//!
//! let mut router = Router::new();
//! router.get("/users/:id", |ctx: &mut Context| {
//!     format!("user {}", ctx.param("id").unwrap_or("?"))
//! })?;
//! router.static_files("/static", "./public");
//!
//! let out = router.dispatch(Request::get("/users/42"));
//! assert_eq!(out.context.status(), StatusCode::OK);
//!
//! let out = router.dispatch(Request::get("/nowhere"));
//! assert_eq!(out.context.status(), StatusCode::NOT_FOUND);
//! # Ok::<(), rttp_dispatch::router::PatternError>(())
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod http;
pub mod router;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use context::{Body, Context};
pub use error::HandlerError;
pub use http::{Headers, Method, Request, StatusCode};
pub use router::{Dispatched, Route, Router};
