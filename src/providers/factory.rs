//! Provider construction from configuration.
//!
//! Maps a configured backend kind plus its option bundle onto a boxed
//! [`Provider`], so callers can construct and invoke every backend
//! identically.

use serde::{Deserialize, Serialize};

use crate::dispatch::TlsConfig;
use crate::error::NotifyResult;
use crate::providers::{Alertmanager, GitHub, GitHubAppData, Opsgenie, Provider, Zulip};

/// Supported notification backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Zulip,
    Opsgenie,
    Alertmanager,
    GitHub,
}

/// Construction parameters shared across provider kinds.
///
/// Only the fields relevant to the chosen kind are consulted: `channel`
/// is the Zulip `<channel>/<topic>` string, `endpoint` doubles as the
/// repository address for the GitHub kind, and `github_app` only matters
/// there as well.
#[derive(Default)]
pub struct ProviderOptions {
    pub endpoint: String,
    pub channel: String,
    pub token: String,
    pub username: String,
    pub password: String,
    pub proxy_url: String,
    pub tls: Option<TlsConfig>,
    pub github_app: Option<GitHubAppData>,
}

/// Builds a provider of the given kind, failing fast on invalid
/// configuration.
pub fn build_provider(kind: ProviderKind, opts: ProviderOptions) -> NotifyResult<Box<dyn Provider>> {
    let provider: Box<dyn Provider> = match kind {
        ProviderKind::Zulip => Box::new(Zulip::new(
            &opts.endpoint,
            &opts.channel,
            &opts.proxy_url,
            opts.tls,
            &opts.username,
            &opts.password,
        )?),
        ProviderKind::Opsgenie => Box::new(Opsgenie::new(
            &opts.endpoint,
            &opts.proxy_url,
            opts.tls,
            &opts.token,
        )?),
        ProviderKind::Alertmanager => Box::new(Alertmanager::new(
            &opts.endpoint,
            &opts.proxy_url,
            opts.tls,
            &opts.token,
            &opts.username,
            &opts.password,
        )?),
        ProviderKind::GitHub => Box::new(GitHub::new(
            &opts.endpoint,
            &opts.token,
            opts.github_app,
            &opts.proxy_url,
            opts.tls,
        )?),
    };
    Ok(provider)
}
