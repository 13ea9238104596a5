//! Core notification provider trait.
//!
//! The one capability every notification backend implements: accept an
//! event and deliver it as a single outbound request. Concrete providers
//! differ only in payload shape and target construction.

use async_trait::async_trait;

use crate::error::NotifyResult;
use crate::event::Event;

/// Trait for notification providers (chat, incident, commit status, ...)
///
/// All providers must be Send + Sync; a provider instance is immutable
/// after construction and safe to share across tasks. One `post` call
/// performs exactly one delivery request (the commit-status provider may
/// additionally exchange an app token first). Nothing is retried
/// internally; a failed delivery leaves the instance reusable.
///
/// Cancellation: wrap the returned future in `tokio::time::timeout` or
/// drop it. A request-level timeout surfaces as `NotifyError::Cancelled`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Translates the event into the backend's wire payload and delivers
    /// it.
    async fn post(&self, event: &Event) -> NotifyResult<()>;

    /// Returns the provider name for logging/debugging
    fn name(&self) -> &'static str;
}
