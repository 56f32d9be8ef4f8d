//! # Request Context
//!
//! Per-request state threaded from the gateway HTTP layer into every cache and
//! upstream call: a cancellation token (client disconnects), an optional
//! deadline (request timeout), the resolved locale and a trace id.
//!
//! Every await point in the transport client and the cache stores runs through
//! [`RequestContext::guard`], so a cancelled or expired request aborts its
//! in-flight work instead of leaking it.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Locale used when the caller did not resolve one
pub const DEFAULT_LOCALE: &str = "en";

/// Why a guarded future did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    DeadlineExceeded { timeout_ms: u64 },
}

/// Context of one inbound gateway request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique trace ID for log correlation
    pub trace_id: String,

    /// Locale requested by the client
    locale: String,

    /// Cancelled when the client goes away
    cancellation: CancellationToken,

    /// Absolute deadline for all work done on behalf of this request
    deadline: Option<Instant>,

    /// Budget the deadline was derived from, for error reporting
    budget: Option<Duration>,
}

impl RequestContext {
    /// Create a context with a fresh cancellation token and no deadline
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            cancellation: CancellationToken::new(),
            deadline: None,
            budget: None,
        }
    }

    /// Bind the context to an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set a timeout measured from now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self.budget = Some(timeout);
        self
    }

    /// Set the request locale; empty values keep the default
    pub fn with_locale<S: Into<String>>(mut self, locale: S) -> Self {
        let locale = locale.into();
        if !locale.trim().is_empty() {
            self.locale = locale.trim().to_string();
        }
        self
    }

    /// Set the trace id (e.g. propagated from an inbound header)
    pub fn with_trace_id<S: Into<String>>(mut self, trace_id: S) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Token cancelled together with this request
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel all work bound to this context
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Check the context without awaiting anything
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(self.deadline_exceeded());
        }
        Ok(())
    }

    /// Run a future until it completes, the request is cancelled, or the deadline passes.
    ///
    /// The inner future is dropped on interruption, which aborts any in-flight
    /// HTTP or cache round trip it owns.
    pub async fn guard<F, T>(&self, future: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        self.check()?;

        match self.remaining() {
            Some(remaining) => {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
                    result = tokio::time::timeout(remaining, future) => {
                        result.map_err(|_| self.deadline_exceeded())
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
                    result = future => Ok(result),
                }
            }
        }
    }

    fn deadline_exceeded(&self) -> Interrupted {
        Interrupted::DeadlineExceeded {
            timeout_ms: self.budget.map(|b| b.as_millis() as u64).unwrap_or(0),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
