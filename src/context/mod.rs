//! Per-request context — the mutable state a handler works on.
//!
//! A [`Context`] is created fresh for every dispatch and owns its [`Request`].
//! Handlers set the status, body and headers; the dispatcher records any
//! failure; after-filters observe the finished context; the host server turns
//! it into bytes on the wire via [`Context::into_parts`].

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::HandlerError;
use crate::http::{Headers, Request, StatusCode};
use crate::router::static_files::FileBody;

/// Request parameters as seen by handlers: the raw request parameters merged
/// with the path parameters of the matched route (path parameters win).
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Params {
    map: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Params {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self { map }
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

/// A response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Bytes(Bytes),
    /// A file streamed in chunks by the host server.
    File(FileBody),
}

impl Body {
    pub fn empty() -> Self {
        Body::Text(String::new())
    }

    /// The body as text, when it is a [`Body::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            Body::Bytes(_) | Body::File(_) => None,
        }
    }

    /// The streaming file reference, when it is a [`Body::File`].
    pub fn as_file(&self) -> Option<&FileBody> {
        match self {
            Body::File(file) => Some(file),
            Body::Text(_) | Body::Bytes(_) => None,
        }
    }

    /// Size of the body in bytes.
    pub fn len(&self) -> u64 {
        match self {
            Body::Text(text) => text.len() as u64,
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File(file) => file.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<FileBody> for Body {
    fn from(file: FileBody) -> Self {
        Body::File(file)
    }
}

/// Template content handed to [`Context::determine_template`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// Inline template source, passed through untouched.
    Literal(String),
    /// A view name resolved to `{views_dir}/{name}.{ext}`.
    Named(String),
}

impl Template {
    pub fn named(name: impl Into<String>) -> Self {
        Template::Named(name.into())
    }

    pub fn literal(source: impl Into<String>) -> Self {
        Template::Literal(source.into())
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Template::Literal(source.to_owned())
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Template::Literal(source)
    }
}

/// Per-request mutable state bridging the request and the eventual response.
///
/// # Examples
///
/// ```
/// use rttp_dispatch::context::Context;
/// use rttp_dispatch::http::{Request, StatusCode};
///
/// let mut ctx = Context::new(Request::get("/ping").param("verbose", "1"));
/// ctx.set_status(StatusCode::ACCEPTED);
/// ctx.set_header("Content-Type", "text/plain");
/// ctx.set_body("pong");
///
/// assert_eq!(ctx.params().get("verbose"), Some("1"));
/// assert_eq!(ctx.body().and_then(|b| b.as_text()), Some("pong"));
/// ```
pub struct Context {
    request: Request,
    status: StatusCode,
    body: Option<Body>,
    headers: Headers,
    error: Option<HandlerError>,
    params: OnceCell<Params>,
    views_dir: PathBuf,
}

impl Context {
    /// Creates a context using the default views directory.
    pub fn new(request: Request) -> Self {
        Self::with_views_dir(request, crate::config::default_views_dir())
    }

    pub fn with_views_dir(request: Request, views_dir: impl Into<PathBuf>) -> Self {
        Self {
            request,
            status: StatusCode::OK,
            body: None,
            headers: Headers::new(),
            error: None,
            params: OnceCell::new(),
            views_dir: views_dir.into(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The body, if one has been set.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = Some(body.into());
    }

    /// Sets the body to the value produced by `compute`.
    pub fn set_body_with<B, F>(&mut self, compute: F)
    where
        B: Into<Body>,
        F: FnOnce() -> B,
    {
        self.body = Some(compute().into());
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Merges a batch of headers; later values replace earlier ones.
    pub fn merge_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.merge(headers);
    }

    pub fn error(&self) -> Option<&HandlerError> {
        self.error.as_ref()
    }

    /// Records a failure. Always forces the status to `500`.
    pub fn set_error(&mut self, error: HandlerError) {
        self.error = Some(error);
        self.status = StatusCode::INTERNAL_SERVER_ERROR;
    }

    /// The request parameters, copied from the request on first access.
    pub fn params(&self) -> &Params {
        self.params
            .get_or_init(|| Params::from(self.request.params().clone()))
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params().get(key)
    }

    /// The session handle the host stored in the request environment, if any.
    pub fn session<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.request.env().get::<T>()
    }

    /// Deserializes the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body_bytes())
    }

    pub fn views_dir(&self) -> &Path {
        &self.views_dir
    }

    pub fn set_views_dir(&mut self, dir: impl Into<PathBuf>) {
        self.views_dir = dir.into();
    }

    /// Resolves template content for the rendering layer.
    ///
    /// Literal content is returned as is; a named view is read from
    /// `{views_dir}/{name}.{ext}`.
    pub fn determine_template(
        &self,
        content: impl Into<Template>,
        ext: &str,
    ) -> std::io::Result<String> {
        match content.into() {
            Template::Literal(source) => Ok(source),
            Template::Named(name) => {
                let path = self.views_dir.join(format!("{name}.{ext}"));
                tracing::trace!(path = %path.display(), "reading template");
                std::fs::read_to_string(path)
            }
        }
    }

    /// Emits the one-line request summary, plus the captured error if there is one.
    ///
    /// A 5xx status set by hand, with no error behind it, is flagged at `warn`.
    pub fn log_event(&self) {
        tracing::info!(
            "{} {} | Status: {} | Params: {:?}",
            self.request.method(),
            self.request.path(),
            self.status.as_u16(),
            self.params()
        );
        match &self.error {
            Some(error) => tracing::error!(
                method = %self.request.method(),
                path = %self.request.path(),
                error = %error,
                details = ?error,
                "handler failed"
            ),
            None if self.status.is_server_error() => tracing::warn!(
                method = %self.request.method(),
                path = %self.request.path(),
                status = self.status.as_u16(),
                "server error status without a captured error"
            ),
            None => {}
        }
    }

    /// Splits the finished context into what the response writer needs.
    pub fn into_parts(self) -> (StatusCode, Headers, Option<Body>) {
        (self.status, self.headers, self.body)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    #[derive(Debug, PartialEq)]
    struct Session {
        user: &'static str,
    }

    fn ctx(request: Request) -> Context {
        Context::with_views_dir(request, "views")
    }

    #[test]
    fn defaults() {
        let ctx = ctx(Request::get("/"));
        assert_eq!(ctx.status(), StatusCode::OK);
        assert!(ctx.body().is_none());
        assert!(ctx.headers().is_empty());
        assert!(ctx.error().is_none());
    }

    #[test]
    fn set_error_forces_500() {
        let mut ctx = ctx(Request::get("/"));
        ctx.set_status(StatusCode::CREATED);
        ctx.set_error(HandlerError::msg("boom"));
        assert_eq!(ctx.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.error().map(|e| e.to_string()), Some("boom".to_owned()));
    }

    #[test]
    fn headers_merge_last_write_wins() {
        let mut ctx = ctx(Request::get("/"));
        ctx.set_header("Content-Type", "text/plain");
        ctx.merge_headers([("Content-Type", "text/html"), ("X-Foo", "bar")]);
        assert_eq!(ctx.headers().get("content-type"), Some("text/html"));
        assert_eq!(ctx.headers().len(), 2);
    }

    #[test]
    fn params_are_copied_once() {
        let ctx = ctx(Request::get("/").param("a", "1"));
        let first: *const Params = ctx.params();
        let second: *const Params = ctx.params();
        assert_eq!(first, second);
        assert_eq!(ctx.param("a"), Some("1"));
        assert_eq!(ctx.param("b"), None);
    }

    #[test]
    fn set_body_with_computes() {
        let mut ctx = ctx(Request::get("/"));
        ctx.set_body_with(|| format!("{}-{}", 1, 2));
        assert_eq!(ctx.body().and_then(Body::as_text), Some("1-2"));
    }

    #[test]
    fn session_reads_env() {
        let ctx = ctx(Request::get("/").extension(Session { user: "ada" }));
        assert_eq!(ctx.session::<Session>(), Some(&Session { user: "ada" }));
        assert!(ctx.session::<String>().is_none());
    }

    #[test]
    fn json_body() {
        let req = Request::new(Method::Post, "/users").body(r#"{"name":"Ada"}"#);
        let ctx = ctx(req);
        let value: serde_json::Value = ctx.json().unwrap();
        assert_eq!(value["name"], "Ada");
    }

    #[test]
    fn literal_template_passes_through() {
        let ctx = ctx(Request::get("/"));
        let out = ctx.determine_template("<p>hi</p>", "html").unwrap();
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn named_template_reads_views_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Index</h1>").unwrap();

        let mut ctx = ctx(Request::get("/"));
        ctx.set_views_dir(dir.path());
        let out = ctx.determine_template(Template::named("index"), "html").unwrap();
        assert_eq!(out, "<h1>Index</h1>");
    }

    #[test]
    fn missing_named_template_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::with_views_dir(Request::get("/"), dir.path());
        let err = ctx.determine_template(Template::named("nope"), "html").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn log_event_flags_bare_server_error() {
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mut ctx = ctx(Request::get("/health"));
        ctx.set_status(StatusCode::SERVICE_UNAVAILABLE);
        tracing::subscriber::with_default(subscriber, || ctx.log_event());

        let logged = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("Status: 503"));
        assert!(logged.contains("WARN"));
        assert!(logged.contains("server error status without a captured error"));
    }

    #[test]
    fn into_parts() {
        let mut ctx = ctx(Request::get("/"));
        ctx.set_body("ok");
        ctx.set_header("X-A", "1");
        let (status, headers, body) = ctx.into_parts();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get("x-a"), Some("1"));
        assert_eq!(body, Some(Body::from("ok")));
    }
}
