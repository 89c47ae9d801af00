//! The pre-parsed inbound request handed to the dispatcher.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::{Extensions, Method};

/// An inbound request as delivered by the host HTTP server.
///
/// Raw parsing is the host's job: a `Request` already knows its verb, its path
/// (without query string), its raw key/value parameters and an environment of
/// collaborator handles such as the session.
///
/// # Examples
///
/// ```
/// use rttp_dispatch::http::{Method, Request};
///
/// let request = Request::from_target(Method::Get, "/search?q=rust+lang&page=2");
///
/// assert_eq!(request.path(), "/search");
/// assert_eq!(request.param_value("q"), Some("rust lang"));
/// assert_eq!(request.param_value("page"), Some("2"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    params: BTreeMap<String, String>,
    env: Extensions,
    body: Bytes,
}

impl Request {
    /// Creates a request for `method` and `path` with no parameters and an empty body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: BTreeMap::new(),
            env: Extensions::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for `Request::new(Method::Get, path)`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a request from a request target, splitting off and decoding the
    /// query string into the raw parameter map.
    pub fn from_target(method: Method, target: &str) -> Self {
        match target.split_once('?') {
            Some((path, query)) => {
                let mut request = Self::new(method, path);
                request.params = parse_query_string(query);
                request
            }
            None => Self::new(method, target),
        }
    }

    /// Adds a raw parameter, replacing any previous value for `key`.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Stores a collaborator handle (e.g. a session) in the request environment.
    #[must_use]
    pub fn extension<T>(mut self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.env.insert(value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw parameter map (query/body parameters plus merged path parameters).
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn env(&self) -> &Extensions {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Extensions {
        &mut self.env
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Merges `params` into the raw parameter map. Incoming values win on conflict.
    pub fn merge_params<I>(&mut self, params: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.params.extend(params);
    }
}

/// Parses a URL query string (`key=value&key2=value2`) into a map.
///
/// Keys and values have `+` decoded as a space. Empty pairs are skipped.
fn parse_query_string(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key.replace('+', " "), value.replace('+', " "))
        })
        .collect()
}
