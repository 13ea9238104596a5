//! GitHub App installation token source.
//!
//! When the commit-status provider authenticates as an installed app
//! instead of with a static token, this module owns the token acquisition
//! protocol: sign a short-lived RS256 assertion with the app private key,
//! exchange it for an installation access token, cache the result and
//! refresh it once it nears expiry.

use anyhow::anyhow;
use jiff::Timestamp;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::dispatch::{build_client, RequestOptions, TlsConfig};
use crate::error::{NotifyError, NotifyResult};

const DEFAULT_API_BASE: &str = "https://api.github.com";

// Tokens are refreshed this many seconds before their stated expiry so an
// in-flight request never carries a credential that lapses mid-delivery.
const EXPIRY_MARGIN_SECS: i64 = 60;

const ASSERTION_BACKDATE_SECS: i64 = 30;
const ASSERTION_LIFETIME_SECS: i64 = 300;

/// A short-lived installation access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AppToken {
    pub token: String,
    pub expires_at: Timestamp,
}

#[derive(Debug, Serialize)]
struct AssertionClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Produces currently-valid installation tokens for one provider instance.
///
/// The cached token is the only mutable state in the crate; the mutex
/// serializes the check-refresh-write sequence so at most one exchange is
/// in flight per instance and readers never observe a torn token.
#[derive(Debug)]
pub(crate) struct AppTokenSource {
    app_id: String,
    installation_id: String,
    encoding_key: EncodingKey,
    base_url: String,
    proxy_url: String,
    tls: Option<TlsConfig>,
    cached: Mutex<Option<AppToken>>,
}

impl AppTokenSource {
    /// Creates a token source. The private key is parsed here so a
    /// malformed key fails construction, but no network call happens
    /// until the first token is needed.
    pub(crate) fn new(
        app_id: &str,
        installation_id: &str,
        private_key: &str,
        base_url: Option<&str>,
        proxy_url: &str,
        tls: Option<TlsConfig>,
    ) -> NotifyResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| NotifyError::config(format!("invalid github app private key: {e}")))?;
        let base_url = base_url
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            app_id: app_id.to_string(),
            installation_id: installation_id.to_string(),
            encoding_key,
            base_url,
            proxy_url: proxy_url.to_string(),
            tls,
            cached: Mutex::new(None),
        })
    }

    /// Returns a currently-valid token, exchanging a fresh one if the
    /// cache is empty or inside the expiry margin.
    pub(crate) async fn token(&self) -> NotifyResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at.as_second() > Timestamp::now().as_second() + EXPIRY_MARGIN_SECS {
                return Ok(token.token.clone());
            }
            // Expired: discard before the next exchange.
            *cached = None;
        }

        let fresh = self.exchange().await?;
        let value = fresh.token.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn sign_assertion(&self) -> NotifyResult<String> {
        let now = Timestamp::now().as_second();
        let claims = AssertionClaims {
            iat: now - ASSERTION_BACKDATE_SECS,
            exp: now + ASSERTION_LIFETIME_SECS,
            iss: self.app_id.clone(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key).map_err(|e| {
            NotifyError::Authentication {
                message: "failed to sign github app assertion".to_string(),
                source: Some(anyhow!(e)),
            }
        })
    }

    async fn exchange(&self) -> NotifyResult<AppToken> {
        let assertion = self.sign_assertion()?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.base_url, self.installation_id
        );

        let mut opts = RequestOptions::default();
        if !self.proxy_url.is_empty() {
            opts.proxy = Some(self.proxy_url.clone());
        }
        opts.tls = self.tls.clone();
        let client = build_client(&opts)?;

        let response = client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {assertion}"))
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| NotifyError::Authentication {
                message: "github app token exchange request failed".to_string(),
                source: Some(anyhow!(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Authentication {
                message: format!("github app token exchange returned status {status}"),
                source: None,
            });
        }

        let token: AppToken = response.json().await.map_err(|e| NotifyError::Authentication {
            message: "malformed github app token exchange response".to_string(),
            source: Some(anyhow!(e)),
        })?;
        tracing::debug!(expires_at = %token.expires_at, "exchanged github app installation token");
        Ok(token)
    }
}
