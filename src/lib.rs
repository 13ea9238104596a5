//! Herald-RS Library
//!
//! Dispatches structured lifecycle events (GitOps reconciliation results)
//! to heterogeneous notification endpoints: chat systems, incident
//! management tools and source-control commit-status APIs.

pub mod dispatch;
pub mod error;
pub mod event;
pub mod providers;

#[cfg(test)]
pub(crate) mod testutil;

pub use dispatch::TlsConfig;
pub use error::{NotifyError, NotifyResult};
pub use event::{Event, ObjectRef, Severity};
pub use providers::{build_provider, Provider, ProviderKind, ProviderOptions};
