//! GitHub commit-status provider.
//!
//! Reports a reconciliation outcome as a commit status against the
//! revision named in the event metadata. Authenticates either with a
//! static token or as an installed GitHub App (see [`app_auth`]).

mod app_auth;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::dispatch::{
    post_message, with_header, with_method, with_proxy, with_tls_config, TlsConfig,
};
use crate::error::{NotifyError, NotifyResult};
use crate::event::{Event, Severity, COMMIT_STATUS_KEY, COMMIT_STATUS_UPDATE_VALUE};
use crate::providers::Provider;

use app_auth::AppTokenSource;

const PUBLIC_HOST: &str = "github.com";
const PUBLIC_API_BASE: &str = "https://api.github.com/";
const ENTERPRISE_API_PATH: &str = "/api/v3/";
const DESCRIPTION_MAX_CHARS: usize = 140;

/// GitHub App credential fields, typically read from a secret.
///
/// App authentication requires app ID, installation ID and private key;
/// the base URL only matters for enterprise deployments where the
/// exchange endpoint is self-hosted.
#[derive(Debug, Clone, Default)]
pub struct GitHubAppData {
    pub app_id: Option<String>,
    pub installation_id: Option<String>,
    pub private_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug)]
enum GitHubAuth {
    Token(String),
    App(AppTokenSource),
}

/// GitHub commit-status notification provider
#[derive(Debug)]
pub struct GitHub {
    api_base: Url,
    owner: String,
    repo: String,
    auth: GitHubAuth,
    proxy_url: String,
    tls: Option<TlsConfig>,
}

/// Commit status body posted to the GitHub API
#[derive(Debug, Serialize, Deserialize)]
pub struct GitHubStatus {
    pub state: String,
    pub context: String,
    pub description: String,
}

impl GitHub {
    /// Creates a GitHub provider for one repository.
    ///
    /// `address` must be `https://<host>/<owner>/<repo>` with exactly two
    /// path segments. Host `github.com` selects the public API; any other
    /// host is treated as an enterprise deployment and used directly as
    /// the API host. Credential precedence: complete app details win over
    /// a static token; incomplete app details are a construction error.
    pub fn new(
        address: &str,
        token: &str,
        app: Option<GitHubAppData>,
        proxy_url: &str,
        tls: Option<TlsConfig>,
    ) -> NotifyResult<Self> {
        let (api_base, owner, repo) = parse_repository_url(address)?;
        let auth = select_auth(token, app, proxy_url, tls.clone())?;

        Ok(Self {
            api_base,
            owner,
            repo,
            auth,
            proxy_url: proxy_url.to_string(),
            tls,
        })
    }

    fn build_status(&self, event: &Event) -> GitHubStatus {
        let state = match event.severity {
            Severity::Error => "failure",
            Severity::Info => "success",
        };
        GitHubStatus {
            state: state.to_string(),
            context: format!(
                "{}/{}",
                event.involved_object.kind.to_lowercase(),
                event.involved_object.name
            ),
            description: event.message.chars().take(DESCRIPTION_MAX_CHARS).collect(),
        }
    }

    /// Resolves the method/target pair before dispatch: the reserved
    /// metadata key switches an event from status creation to an update
    /// of the previously posted status.
    fn resolve_target(&self, event: &Event, revision: &str) -> NotifyResult<(Method, Url)> {
        let url = self
            .api_base
            .join(&format!(
                "repos/{}/{}/statuses/{revision}",
                self.owner, self.repo
            ))
            .map_err(|e| NotifyError::config(format!("invalid status target URL: {e}")))?;

        let method = if event.has_metadata(COMMIT_STATUS_KEY, COMMIT_STATUS_UPDATE_VALUE) {
            Method::PATCH
        } else {
            Method::POST
        };
        Ok((method, url))
    }
}

fn parse_repository_url(address: &str) -> NotifyResult<(Url, String, String)> {
    let url = Url::parse(address)
        .map_err(|e| NotifyError::config(format!("invalid repository URL '{address}': {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| NotifyError::config(format!("invalid repository URL '{address}': no host")))?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|parts| parts.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let [owner, repo] = segments.as_slice() else {
        return Err(NotifyError::config(format!(
            "invalid repository URL '{address}', expected https://<host>/<owner>/<repo>"
        )));
    };

    let api_base = if host == PUBLIC_HOST {
        Url::parse(PUBLIC_API_BASE).expect("static URL")
    } else {
        // Enterprise mode keeps the input host (and scheme/port) intact.
        let mut base = url.clone();
        base.set_path(ENTERPRISE_API_PATH);
        base.set_query(None);
        base
    };

    Ok((api_base, owner.to_string(), repo.to_string()))
}

fn select_auth(
    token: &str,
    app: Option<GitHubAppData>,
    proxy_url: &str,
    tls: Option<TlsConfig>,
) -> NotifyResult<GitHubAuth> {
    let app = app.unwrap_or_default();
    let field = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

    let Some(app_id) = field(&app.app_id) else {
        if token.is_empty() {
            return Err(NotifyError::config(
                "github token or github app details must be specified",
            ));
        }
        return Ok(GitHubAuth::Token(token.to_string()));
    };

    let installation_id = field(&app.installation_id).ok_or_else(|| {
        NotifyError::config("app installation ID must be provided to use github app authentication")
    })?;
    let private_key = field(&app.private_key).ok_or_else(|| {
        NotifyError::config("private key must be provided to use github app authentication")
    })?;

    let source = AppTokenSource::new(
        &app_id,
        &installation_id,
        &private_key,
        app.base_url.as_deref(),
        proxy_url,
        tls,
    )?;
    Ok(GitHubAuth::App(source))
}

#[async_trait]
impl Provider for GitHub {
    async fn post(&self, event: &Event) -> NotifyResult<()> {
        let revision = event
            .revision_hash()
            .ok_or_else(|| NotifyError::config("missing revision metadata"))?;
        let (method, url) = self.resolve_target(event, revision)?;

        let status = self.build_status(event);
        let payload = serde_json::to_vec(&status)
            .map_err(|e| NotifyError::config(format!("failed to serialize commit status: {e}")))?;

        let credential = match &self.auth {
            GitHubAuth::Token(token) => format!("token {token}"),
            GitHubAuth::App(source) => format!("Bearer {}", source.token().await?),
        };

        post_message(
            url.as_str(),
            payload,
            vec![
                with_proxy(&self.proxy_url),
                with_tls_config(self.tls.clone()),
                with_method(method),
                with_header("Authorization", &credential),
                with_header("Accept", "application/vnd.github+json"),
            ],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "github"
    }
}
