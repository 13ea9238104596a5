//! Opsgenie incident notification provider.
//!
//! Posts events as alerts to the Opsgenie REST API, authenticated with a
//! `GenieKey` API key header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::dispatch::{post_message, with_header, with_proxy, with_tls_config, TlsConfig};
use crate::error::{NotifyError, NotifyResult};
use crate::event::{Event, Severity};
use crate::providers::Provider;

/// Opsgenie notification provider
pub struct Opsgenie {
    endpoint: String,
    proxy_url: String,
    tls: Option<TlsConfig>,
    api_key: String,
}

/// Alert object posted to the Opsgenie API
#[derive(Debug, Serialize, Deserialize)]
pub struct OpsgenieAlert {
    pub message: String,
    pub description: String,
    pub details: HashMap<String, String>,
}

impl Opsgenie {
    /// Creates an Opsgenie provider. The API key is mandatory.
    pub fn new(
        endpoint: &str,
        proxy_url: &str,
        tls: Option<TlsConfig>,
        api_key: &str,
    ) -> NotifyResult<Self> {
        Url::parse(endpoint)
            .map_err(|e| NotifyError::config(format!("invalid Opsgenie endpoint URL: {e}")))?;
        if api_key.is_empty() {
            return Err(NotifyError::config("an Opsgenie API key is required"));
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            proxy_url: proxy_url.to_string(),
            tls,
            api_key: api_key.to_string(),
        })
    }

    fn build_alert(&self, event: &Event) -> OpsgenieAlert {
        // Empty metadata is valid input and serializes to an empty map.
        let mut details = event.metadata.clone();
        let severity = match event.severity {
            Severity::Error => "error",
            Severity::Info => "info",
        };
        details.insert("severity".to_string(), severity.to_string());

        OpsgenieAlert {
            message: format!(
                "{}/{}.{}",
                event.involved_object.kind.to_lowercase(),
                event.involved_object.name,
                event.involved_object.namespace
            ),
            description: event.message.clone(),
            details,
        }
    }
}

#[async_trait]
impl Provider for Opsgenie {
    async fn post(&self, event: &Event) -> NotifyResult<()> {
        let alert = self.build_alert(event);
        let payload = serde_json::to_vec(&alert).map_err(|e| {
            NotifyError::config(format!("failed to serialize Opsgenie alert: {e}"))
        })?;

        post_message(
            &self.endpoint,
            payload,
            vec![
                with_proxy(&self.proxy_url),
                with_tls_config(self.tls.clone()),
                with_header("Authorization", &format!("GenieKey {}", self.api_key)),
            ],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "opsgenie"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{serve, test_event};
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_new_requires_api_key() {
        let result = Opsgenie::new("https://api.opsgenie.com/v2/alerts", "", None, "");
        assert!(matches!(result, Err(NotifyError::Configuration { .. })));
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let result = Opsgenie::new("not a url", "", None, "token");
        assert!(result.is_err());
    }

    #[test]
    fn test_alert_carries_severity_and_metadata() {
        let opsgenie = Opsgenie::new("https://api.opsgenie.com/v2/alerts", "", None, "token").unwrap();
        let alert = opsgenie.build_alert(&test_event());
        assert_eq!(alert.message, "gitrepository/webapp.gitops-system");
        assert_eq!(alert.description, "message");
        assert_eq!(alert.details["severity"], "info");
        assert_eq!(alert.details["test"], "metadata");
    }

    #[tokio::test]
    async fn test_post_delivers_json_alert() {
        type Capture = Arc<Mutex<Option<(HeaderMap, String)>>>;
        let capture: Capture = Arc::default();
        let router = Router::new()
            .route(
                "/",
                post(
                    |State(capture): State<Capture>, headers: HeaderMap, body: String| async move {
                        *capture.lock().unwrap() = Some((headers, body));
                        StatusCode::ACCEPTED
                    },
                ),
            )
            .with_state(capture.clone());
        let base = serve(router).await;

        let opsgenie = Opsgenie::new(&base, "", None, "token").unwrap();
        opsgenie.post(&test_event()).await.unwrap();

        let (headers, body) = capture.lock().unwrap().take().unwrap();
        assert_eq!(headers["authorization"], "GenieKey token");
        let alert: OpsgenieAlert = serde_json::from_str(&body).unwrap();
        assert_eq!(alert.description, "message");
    }

    #[tokio::test]
    async fn test_post_accepts_empty_metadata() {
        let router = Router::new().route("/", post(|| async { StatusCode::OK }));
        let base = serve(router).await;

        let opsgenie = Opsgenie::new(&base, "", None, "token").unwrap();
        let mut event = test_event();
        event.metadata.clear();
        assert!(opsgenie.post(&event).await.is_ok());
    }
}
