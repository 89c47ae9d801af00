//! After-filters — callbacks run against every finished [`Context`].
//!
//! Filters run in registration order after every dispatch, whether the handler
//! succeeded or failed. They observe the context; they cannot replace it.
//!
//! A panicking filter is a programming error and is not caught: the panic
//! propagates out of [`Router::dispatch`](crate::Router::dispatch).

use std::fmt;
use std::sync::Arc;

use crate::context::Context;

/// A type-erased, reference-counted after-filter.
pub type AfterFilter = Arc<dyn Fn(&Context) + Send + Sync + 'static>;

/// Ordered, append-only list of after-filters.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use rttp_dispatch::context::Context;
/// use rttp_dispatch::filter::AfterFilterChain;
/// use rttp_dispatch::http::Request;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let mut chain = AfterFilterChain::new();
/// let log = Arc::clone(&seen);
/// chain.push(move |ctx: &Context| log.lock().unwrap().push(ctx.request().path().to_owned()));
///
/// chain.run(&Context::new(Request::get("/a")));
/// assert_eq!(*seen.lock().unwrap(), vec!["/a".to_owned()]);
/// ```
#[derive(Clone, Default)]
pub struct AfterFilterChain {
    filters: Vec<AfterFilter>,
}

impl AfterFilterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chain holding only [`log_event`].
    pub fn with_logging() -> Self {
        let mut chain = Self::new();
        chain.push(log_event);
        chain
    }

    /// Appends a filter to the end of the chain.
    pub fn push<F>(&mut self, filter: F)
    where
        F: Fn(&Context) + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
    }

    /// Runs every filter against `ctx`, in registration order.
    pub fn run(&self, ctx: &Context) {
        for filter in &self.filters {
            filter(ctx);
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for AfterFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterFilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}

/// The default after-filter: logs method, path, status and params, plus the
/// captured error when the handler failed.
pub fn log_event(ctx: &Context) {
    ctx.log_event();
}
