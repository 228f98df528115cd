//! Per-call context
//!
//! Every public operation takes a [`Context`]. It carries the caller's
//! cancellation signal, an optional deadline, and values that some
//! authentication strategies need per request (the AWS service name).
//!
//! Suspension points (HTTP round-trips, token refresh, body reads) race
//! against the context so that cancellation aborts the in-flight request.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation, deadline and request-scoped values for one call
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    aws_service: Option<String>,
}

impl Context {
    /// Create a context that is never cancelled and has no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context driven by an existing cancellation token
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..Default::default()
        }
    }

    /// Bound the call by a timeout from now (keeps an earlier deadline)
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound the call by an absolute deadline (keeps an earlier deadline)
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Set the AWS service name used by SigV4 signing
    #[must_use]
    pub fn with_aws_service(mut self, service: impl Into<String>) -> Self {
        self.aws_service = Some(service.into());
        self
    }

    /// AWS service name, if the caller supplied one
    pub fn aws_service(&self) -> Option<&str> {
        self.aws_service.as_deref()
    }

    /// Deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Derive a child context. Cancelling the child leaves the parent alone;
    /// cancelling the parent cancels the child.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            aws_service: self.aws_service.clone(),
        }
    }

    /// Cancel this context and all of its children
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context is already cancelled or past its deadline
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run a future to completion unless the context is cancelled or its
    /// deadline passes first. The losing future is dropped, which aborts
    /// any in-flight HTTP request it owns.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            () = sleep_until(self.deadline) => Err(Error::DeadlineExceeded),
            result = fut => result,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
