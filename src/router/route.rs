//! Registered routes and the per-request dispatch step.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use super::pattern::{Pattern, PatternError};
use super::static_files::{self, FileBody};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::context::{Body, Context, Template};
use crate::error::HandlerError;
use crate::filter::AfterFilterChain;
use crate::http::{Method, Request, StatusCode};

/// Page served by the built-in not-found handler for `GET /`.
pub const DEFAULT_INDEX_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>It works</title></head>\n<body>\n<h1>It works</h1>\n<p>No route is registered for <code>/</code> yet.</p>\n</body>\n</html>\n";

/// Page served by the built-in not-found handler for every other path.
pub const NOT_FOUND_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>Not Found</title></head>\n<body>\n<h1>Not Found</h1>\n<p>The requested page does not exist.</p>\n</body>\n</html>\n";

// Body of a failed request whose handler set none. Error detail stays out of it.
const FAILURE_BODY: &str = "Internal Server Error";

/// What a handler produced: a body to use if it did not set one itself, or a failure.
pub type Outcome = Result<Option<Body>, HandlerError>;

/// Type-erased handler stored on a dynamic route.
pub type Action = Arc<dyn Fn(&mut Context) -> Outcome + Send + Sync + 'static>;

/// Values a handler may return.
///
/// `()` and `None` produce no body; text, bytes and [`Body`] produce one;
/// `Err` turns into a captured [`HandlerError`].
pub trait Responder {
    fn into_outcome(self) -> Outcome;
}

impl Responder for () {
    fn into_outcome(self) -> Outcome {
        Ok(None)
    }
}

impl Responder for String {
    fn into_outcome(self) -> Outcome {
        Ok(Some(Body::Text(self)))
    }
}

impl Responder for &'static str {
    fn into_outcome(self) -> Outcome {
        Ok(Some(Body::from(self)))
    }
}

impl Responder for Vec<u8> {
    fn into_outcome(self) -> Outcome {
        Ok(Some(Body::from(self)))
    }
}

impl Responder for Bytes {
    fn into_outcome(self) -> Outcome {
        Ok(Some(Body::Bytes(self)))
    }
}

impl Responder for Body {
    fn into_outcome(self) -> Outcome {
        Ok(Some(self))
    }
}

impl<T: Responder> Responder for Option<T> {
    fn into_outcome(self) -> Outcome {
        match self {
            Some(value) => value.into_outcome(),
            None => Ok(None),
        }
    }
}

impl<T, E> Responder for Result<T, E>
where
    T: Responder,
    E: Into<HandlerError>,
{
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(value) => value.into_outcome(),
            Err(error) => Err(error.into()),
        }
    }
}

#[derive(Clone)]
enum RouteKind {
    Dynamic(Action),
    Static { root: PathBuf, chunk_size: usize },
    NotFound { pages_dir: Option<PathBuf> },
}

/// The result of dispatching one request.
///
/// `failure` is the same error stored in `context.error()`, handed back so the
/// caller does not have to dig it out.
#[derive(Debug)]
pub struct Dispatched {
    pub context: Context,
    pub failure: Option<HandlerError>,
}

impl Dispatched {
    pub fn into_context(self) -> Context {
        self.context
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

// Per-router settings a route needs while attending a request.
pub(crate) struct Attendance<'a> {
    pub views_dir: &'a Path,
    pub filters: &'a AfterFilterChain,
    pub status: StatusCode,
}

/// A registered route: a verb, a path pattern and what to do on a match.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: Pattern,
    kind: RouteKind,
}

impl Route {
    /// Builds a dynamic route that runs `handler` on a match.
    ///
    /// # Errors
    ///
    /// [`PatternError`] when `path` is not a valid pattern.
    pub fn new<F, R>(method: Method, path: &str, handler: F) -> Result<Self, PatternError>
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Responder,
    {
        let action: Action = Arc::new(move |ctx: &mut Context| handler(ctx).into_outcome());
        Ok(Self {
            method,
            pattern: Pattern::compile(path)?,
            kind: RouteKind::Dynamic(action),
        })
    }

    /// Builds a `GET` route serving files under `root` for paths under `prefix`.
    pub fn static_files(prefix: &str, root: impl Into<PathBuf>) -> Self {
        Self::static_files_with_chunk_size(prefix, root, DEFAULT_CHUNK_SIZE)
    }

    pub fn static_files_with_chunk_size(
        prefix: &str,
        root: impl Into<PathBuf>,
        chunk_size: usize,
    ) -> Self {
        Self {
            method: Method::Get,
            pattern: Pattern::literal(prefix),
            kind: RouteKind::Static {
                root: root.into(),
                chunk_size,
            },
        }
    }

    // Synthesized on demand as the last-resort fallback; never registered.
    pub(crate) fn not_found(pages_dir: Option<PathBuf>) -> Self {
        Self {
            method: Method::Get,
            pattern: Pattern::literal("not_found"),
            kind: RouteKind::NotFound { pages_dir },
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_static(&self) -> bool {
        matches!(self.kind, RouteKind::Static { .. })
    }

    /// Checks whether this route answers `path`, returning the path parameters.
    ///
    /// Static routes answer when a regular file exists at the resolved path;
    /// they never bind parameters. The built-in not-found route answers nothing.
    pub fn recognize(&self, path: &str) -> Option<BTreeMap<String, String>> {
        match &self.kind {
            RouteKind::Dynamic(_) => self.pattern.recognize(path),
            RouteKind::Static { root, .. } => {
                static_files::physical_path(self.pattern.as_str(), root, path)
                    .filter(|file| file.is_file())
                    .map(|_| BTreeMap::new())
            }
            RouteKind::NotFound { .. } => None,
        }
    }

    /// Dispatches `request` to this route with the default views directory.
    pub fn attend(&self, request: Request, filters: &AfterFilterChain) -> Dispatched {
        let views_dir = crate::config::default_views_dir();
        self.attend_with(
            request,
            &Attendance {
                views_dir: &views_dir,
                filters,
                status: StatusCode::OK,
            },
        )
    }

    pub(crate) fn attend_with(&self, mut request: Request, env: &Attendance<'_>) -> Dispatched {
        if let RouteKind::Dynamic(_) = self.kind {
            if let Some(params) = self.pattern.recognize(request.path()) {
                request.merge_params(params);
            }
        }

        let mut ctx = Context::with_views_dir(request, env.views_dir);
        ctx.set_status(env.status);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(&mut ctx)))
            .unwrap_or_else(|payload| Err(panic_to_error(payload)));

        match outcome {
            Ok(result) => {
                if !ctx.has_body() {
                    ctx.set_body(result.unwrap_or_else(Body::empty));
                }
            }
            Err(error) => {
                ctx.set_error(error);
                if !ctx.has_body() {
                    ctx.set_body(FAILURE_BODY);
                }
            }
        }

        // A handler may record an error itself and still return a value.
        let failure = ctx.error().cloned();
        env.filters.run(&ctx);
        Dispatched {
            context: ctx,
            failure,
        }
    }

    fn run(&self, ctx: &mut Context) -> Outcome {
        match &self.kind {
            RouteKind::Dynamic(action) => action(ctx),
            RouteKind::Static { root, chunk_size } => {
                let path = static_files::physical_path(
                    self.pattern.as_str(),
                    root,
                    ctx.request().path(),
                )
                .ok_or_else(|| HandlerError::msg("static path escapes its root"))?;
                let file = FileBody::open(&path, *chunk_size)?;
                tracing::trace!(file = %path.display(), len = file.len(), "serving static file");

                ctx.set_header("Content-Type", file.content_type());
                ctx.set_header("Content-Length", file.len().to_string());
                ctx.set_body(file);
                Ok(None)
            }
            RouteKind::NotFound { pages_dir } => {
                ctx.set_status(StatusCode::NOT_FOUND);
                let index = ctx.request().path() == "/" && ctx.request().method() == &Method::Get;
                let page = if index { DEFAULT_INDEX_PAGE } else { NOT_FOUND_PAGE };
                let body = match pages_dir {
                    Some(dir) => {
                        ctx.set_views_dir(dir);
                        let name = if index { "default_index" } else { "not_found" };
                        match ctx.determine_template(Template::named(name), "html") {
                            Ok(body) => body,
                            Err(error) => {
                                tracing::warn!(
                                    pages_dir = %dir.display(),
                                    page = name,
                                    %error,
                                    "not-found page unreadable, serving built-in page"
                                );
                                ctx.determine_template(page, "html")?
                            }
                        }
                    }
                    None => ctx.determine_template(page, "html")?,
                };
                ctx.set_header("Content-Type", "text/html");
                Ok(Some(Body::Text(body)))
            }
        }
    }
}

fn panic_to_error(payload: Box<dyn std::any::Any + Send>) -> HandlerError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned());
    HandlerError::msg(format!("handler panicked: {message}"))
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            RouteKind::Dynamic(_) => "dynamic",
            RouteKind::Static { .. } => "static",
            RouteKind::NotFound { .. } => "not_found",
        };
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("kind", &kind)
            .finish()
    }
}
