//! Request routing — the route registry, lookup and dispatch.
//!
//! A [`Router`] holds routes in registration order. Registration order is also
//! match priority: [`Router::lookup`] scans linearly and the first route whose
//! verb matches and whose pattern recognizes the path wins. Nothing is ever
//! reordered or removed individually; [`Router::reset`] clears everything.
//!
//! When nothing matches, lookup falls back in two steps:
//!
//! 1. a `GET` route registered at the reserved path `"404"`, if any;
//! 2. otherwise a built-in handler that serves an index page for `GET /` and a
//!    not-found page for everything else.
//!
//! Either way the context starts at status `404`. So does a direct request for
//! `/404` that lands on the reserved route; its handler may still change it.
//!
//! Registration takes `&mut self` and dispatch takes `&self`, so a router that
//! has been moved into an `Arc` for the serving phase is read-only and can be
//! shared across threads without further locking.

use std::path::PathBuf;

use tracing::debug;

use crate::config::{ConfigError, RouterConfig};
use crate::context::Context;
use crate::filter::AfterFilterChain;
use crate::http::{Method, Request, StatusCode};

pub mod pattern;
pub mod route;
pub mod static_files;

pub use pattern::{Pattern, PatternError};
pub use route::{Dispatched, Responder, Route};

/// Reserved path of the application-defined not-found route.
pub const NOT_FOUND_PATH: &str = "404";

/// The route chosen by [`Router::lookup`].
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A registered route matched the request.
    Found(&'a Route),
    /// Nothing matched; the application's `"404"` route answers.
    CustomNotFound(&'a Route),
    /// Nothing matched; the built-in not-found handler answers.
    NotFound(Route),
}

impl Resolution<'_> {
    pub fn route(&self) -> &Route {
        match self {
            Resolution::Found(route) | Resolution::CustomNotFound(route) => *route,
            Resolution::NotFound(route) => route,
        }
    }

    /// `true` unless a registered route matched the request itself.
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Resolution::Found(_))
    }
}

/// Ordered route registry plus the after-filter chain.
///
/// # Examples
///
/// ```
/// use rttp_dispatch::{Router, Request, StatusCode};
/// use rttp_dispatch::context::Context;
///
/// let mut router = Router::new();
/// router
///     .get("/hello/:name", |ctx: &mut Context| {
///         format!("Hello, {}", ctx.param("name").unwrap_or("stranger"))
///     })
///     .unwrap();
///
/// let out = router.dispatch(Request::get("/hello/Ada"));
/// assert_eq!(out.context.status(), StatusCode::OK);
/// assert_eq!(out.context.body().and_then(|b| b.as_text()), Some("Hello, Ada"));
/// ```
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    filters: AfterFilterChain,
    config: RouterConfig,
    views_dir: PathBuf,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates an empty router with the default configuration.
    ///
    /// [`log_event`](crate::filter::log_event) is installed as the first after-filter.
    pub fn new() -> Self {
        Self::build(RouterConfig::default())
    }

    /// Creates an empty router from `config`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidChunkSize`] when the chunk size is zero.
    pub fn with_config(config: RouterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RouterConfig) -> Self {
        let filters = if config.log_requests {
            AfterFilterChain::with_logging()
        } else {
            AfterFilterChain::new()
        };
        Self {
            routes: Vec::new(),
            filters,
            views_dir: config.resolved_views_dir(),
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Appends a pre-built route. Duplicates are not detected; the earlier one wins.
    pub fn register(&mut self, route: Route) -> &mut Self {
        debug!(method = %route.method(), pattern = %route.pattern(), "route registered");
        self.routes.push(route);
        self
    }

    /// Registers `handler` for `method` requests matching `path`.
    ///
    /// # Errors
    ///
    /// [`PatternError`] when `path` is not a valid pattern.
    pub fn route<F, R>(
        &mut self,
        method: Method,
        path: &str,
        handler: F,
    ) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        let route = Route::new(method, path, handler)?;
        Ok(self.register(route))
    }

    /// Register a handler for `GET` requests matching `path`.
    pub fn get<F, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        self.route(Method::Get, path, handler)
    }

    /// Register a handler for `POST` requests matching `path`.
    pub fn post<F, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        self.route(Method::Post, path, handler)
    }

    /// Register a handler for `PUT` requests matching `path`.
    pub fn put<F, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        self.route(Method::Put, path, handler)
    }

    /// Register a handler for `DELETE` requests matching `path`.
    pub fn delete<F, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        self.route(Method::Delete, path, handler)
    }

    /// Register a handler for `PATCH` requests matching `path`.
    pub fn patch<F, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        self.route(Method::Patch, path, handler)
    }

    /// Register a handler for `OPTIONS` requests matching `path`.
    pub fn options<F, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        self.route(Method::Options, path, handler)
    }

    /// Register a handler for `HEAD` requests matching `path`.
    pub fn head<F, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        self.route(Method::Head, path, handler)
    }

    /// Serves files from `root` for `GET` requests under `prefix`.
    ///
    /// `/static/css/site.css` with prefix `/static` and root `./public` is
    /// answered from `./public/css/site.css`, if that file exists.
    pub fn static_files(&mut self, prefix: &str, root: impl Into<PathBuf>) -> &mut Self {
        let route = Route::static_files_with_chunk_size(prefix, root, self.config.chunk_size);
        self.register(route)
    }

    /// Appends an after-filter. Filters run in the order they were added.
    pub fn after<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(&Context) + Send + Sync + 'static,
    {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &AfterFilterChain {
        &self.filters
    }

    /// Removes every registered route. After-filters are kept.
    pub fn reset(&mut self) {
        debug!(routes = self.routes.len(), "router reset");
        self.routes.clear();
    }

    /// Registered routes in priority order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds the route answering `method` and `path`.
    ///
    /// Never fails: when no registered route matches, the not-found fallback
    /// described in the [module docs](self) is returned.
    pub fn lookup(&self, method: &Method, path: &str) -> Resolution<'_> {
        if let Some(route) = self.find(method, path) {
            return Resolution::Found(route);
        }

        debug!(%method, path, "no route matched");
        match self.find(&Method::Get, NOT_FOUND_PATH) {
            Some(route) => Resolution::CustomNotFound(route),
            None => Resolution::NotFound(Route::not_found(self.config.pages_dir.clone())),
        }
    }

    fn find(&self, method: &Method, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.method() == method && route.recognize(path).is_some())
    }

    /// Dispatches `request` to the route chosen by [`lookup`](Self::lookup).
    ///
    /// Handler failures (errors and panics) are captured into the context and
    /// returned as [`Dispatched::failure`]; they never propagate. After-filters
    /// run exactly once, in order, on every outcome.
    pub fn dispatch(&self, request: Request) -> Dispatched {
        let resolution = self.lookup(request.method(), request.path());
        // The reserved route answers with 404 whether it was reached by
        // fallback or requested directly as `/404`.
        let status = if resolution.is_not_found()
            || resolution.route().pattern().as_str() == NOT_FOUND_PATH
        {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        };

        resolution.route().attend_with(
            request,
            &route::Attendance {
                views_dir: &self.views_dir,
                filters: &self.filters,
                status,
            },
        )
    }
}
