//! Request context threaded through every pool and catalog operation.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context for the current request.
///
/// Built by the caller (an API layer, a job, a test) and passed by
/// reference into every operation so that logging carries the request
/// identity and a cancelled request never commits.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation ID for logs.
    pub request_id: Uuid,
    /// Tenant the request acts for, when multi-tenant routing is in use.
    pub tenant: Option<String>,
    /// Identity of the caller, for audit logging.
    pub actor: Option<String>,
    /// When the request was received.
    pub received_at: DateTime<Utc>,
    /// Cancelled when the caller abandons the request.
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Creates an anonymous context with a fresh request ID.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::now_v7(),
            tenant: None,
            actor: None,
            received_at: Utc::now(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the tenant.
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Sets the acting identity.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Replaces the cancellation token, e.g. with a child of a server-wide token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The request's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancels the request.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
