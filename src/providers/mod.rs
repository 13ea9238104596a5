//! Notification providers with a uniform dispatch capability.
//!
//! The core trait [`Provider`] lets heterogeneous backends — chat,
//! incident management, commit status — be constructed and invoked
//! identically. Each concrete provider differs only in payload shape and
//! target construction; delivery always goes through the shared dispatch
//! primitive.

mod alertmanager;
mod factory;
mod github;
mod opsgenie;
mod provider;
mod zulip;

pub use alertmanager::{Alertmanager, AlertmanagerAlert};
pub use factory::{build_provider, ProviderKind, ProviderOptions};
pub use github::{GitHub, GitHubAppData, GitHubStatus};
pub use opsgenie::{Opsgenie, OpsgenieAlert};
pub use provider::Provider;
pub use zulip::Zulip;
