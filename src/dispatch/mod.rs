//! Shared HTTP dispatch primitive.
//!
//! Every provider funnels its outbound request through [`post_message`]:
//! build one request, apply the caller's transport options in order, send,
//! classify the outcome. The primitive holds no state and is safe for
//! unlimited concurrent invocation.
//!
//! Transport options are an ordered list of closures over a mutable
//! [`RequestOptions`] build context. Later options override earlier ones
//! for the same field, so a conflicting pair resolves last-wins.

use std::time::Duration;

use anyhow::anyhow;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};

use crate::error::{NotifyError, NotifyResult};

const DEFAULT_CONTENT_TYPE: &str = "application/json";
const BODY_EXCERPT_LEN: usize = 200;

/// TLS material overriding the client defaults.
///
/// Both fields are PEM-encoded; `None` leaves the corresponding default in
/// place.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Additional root certificate to trust
    pub root_ca_pem: Option<Vec<u8>>,
    /// Client certificate plus private key for mutual TLS
    pub identity_pem: Option<Vec<u8>>,
}

/// Request build context mutated by transport options.
pub struct RequestOptions {
    pub(crate) method: Method,
    pub(crate) content_type: String,
    pub(crate) proxy: Option<String>,
    pub(crate) tls: Option<TlsConfig>,
    pub(crate) basic_auth: Option<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::POST,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            proxy: None,
            tls: None,
            basic_auth: None,
            headers: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A single composable transport modifier.
pub type PostOption = Box<dyn FnOnce(&mut RequestOptions) + Send>;

/// Routes the request through the given proxy URL. Empty string is a no-op.
pub fn with_proxy(proxy_url: &str) -> PostOption {
    let proxy_url = proxy_url.to_string();
    Box::new(move |opts| {
        if !proxy_url.is_empty() {
            opts.proxy = Some(proxy_url);
        }
    })
}

/// Overrides the client TLS trust/cert material. `None` is a no-op.
pub fn with_tls_config(tls: Option<TlsConfig>) -> PostOption {
    Box::new(move |opts| {
        if tls.is_some() {
            opts.tls = tls;
        }
    })
}

/// Sets the request's basic-auth credential. Empty username is a no-op.
pub fn with_basic_auth(username: &str, password: &str) -> PostOption {
    let username = username.to_string();
    let password = password.to_string();
    Box::new(move |opts| {
        if !username.is_empty() {
            opts.basic_auth = Some((username, password));
        }
    })
}

/// Sets the content-type header. Empty string keeps `application/json`.
pub fn with_content_type(content_type: &str) -> PostOption {
    let content_type = content_type.to_string();
    Box::new(move |opts| {
        if !content_type.is_empty() {
            opts.content_type = content_type;
        }
    })
}

/// Overrides the HTTP method (default POST).
pub fn with_method(method: Method) -> PostOption {
    Box::new(move |opts| {
        opts.method = method;
    })
}

/// Adds an extra request header, e.g. a provider-specific auth scheme.
pub fn with_header(name: &str, value: &str) -> PostOption {
    let name = name.to_string();
    let value = value.to_string();
    Box::new(move |opts| {
        opts.headers.push((name, value));
    })
}

/// Overrides the per-request timeout (default 30 s).
pub fn with_timeout(timeout: Duration) -> PostOption {
    Box::new(move |opts| {
        opts.timeout = timeout;
    })
}

/// Builds a client honoring the proxy/TLS fields of `opts`.
///
/// Clients are built per call because proxy and TLS material vary per
/// provider instance; the builder settings otherwise match the shared
/// client configuration.
pub(crate) fn build_client(opts: &RequestOptions) -> NotifyResult<Client> {
    let mut builder = Client::builder()
        .use_rustls_tls()
        .timeout(opts.timeout)
        .connect_timeout(Duration::from_secs(10));

    if let Some(proxy_url) = &opts.proxy {
        let proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|e| {
            NotifyError::config(format!("invalid proxy URL '{proxy_url}': {e}"))
        })?;
        builder = builder.proxy(proxy);
    }

    if let Some(tls) = &opts.tls {
        if let Some(pem) = &tls.root_ca_pem {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| NotifyError::config(format!("invalid root CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        if let Some(pem) = &tls.identity_pem {
            let identity = reqwest::Identity::from_pem(pem)
                .map_err(|e| NotifyError::config(format!("invalid TLS identity: {e}")))?;
            builder = builder.identity(identity);
        }
    }

    builder
        .build()
        .map_err(|e| NotifyError::Transport { source: anyhow!(e) })
}

/// Builds and sends one HTTP request.
///
/// Applies every option in sequence, sends the request and maps the
/// outcome: transport failure wraps the underlying cause, a timeout
/// classifies as cancellation, a non-2xx response carries the status code
/// and a body excerpt, 2xx is success.
pub async fn post_message(url: &str, body: Vec<u8>, options: Vec<PostOption>) -> NotifyResult<()> {
    let mut opts = RequestOptions::default();
    for apply in options {
        apply(&mut opts);
    }

    let client = build_client(&opts)?;
    let mut request = client
        .request(opts.method.clone(), url)
        .header(CONTENT_TYPE, opts.content_type.as_str())
        .body(body);
    if let Some((username, password)) = &opts.basic_auth {
        request = request.basic_auth(username, Some(password));
    }
    for (name, value) in &opts.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request.send().await.map_err(classify_send_error)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, url, "notification endpoint rejected request");
        return Err(NotifyError::Delivery {
            status: status.as_u16(),
            body: excerpt(&body),
        });
    }

    tracing::debug!(%status, url, "notification delivered");
    Ok(())
}

fn classify_send_error(err: reqwest::Error) -> NotifyError {
    if err.is_timeout() {
        NotifyError::Cancelled
    } else {
        NotifyError::Transport {
            source: anyhow!(err),
        }
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}
