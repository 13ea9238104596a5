//! Alertmanager generic webhook provider.
//!
//! Posts events to the Alertmanager v2 alerts endpoint. The body is a JSON
//! array of alert objects, never a bare object, since the endpoint accepts
//! batches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::dispatch::{
    post_message, with_basic_auth, with_header, with_proxy, with_tls_config, TlsConfig,
};
use crate::error::{NotifyError, NotifyResult};
use crate::event::{Event, Severity};
use crate::providers::Provider;

/// Alertmanager notification provider
pub struct Alertmanager {
    endpoint: String,
    proxy_url: String,
    tls: Option<TlsConfig>,
    token: String,
    username: String,
    password: String,
}

/// One alert in the batch posted to Alertmanager
#[derive(Debug, Serialize, Deserialize)]
pub struct AlertmanagerAlert {
    pub status: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    #[serde(rename = "startsAt")]
    pub starts_at: jiff::Timestamp,
}

impl Alertmanager {
    /// Creates an Alertmanager provider. Bearer token and basic auth are
    /// both optional.
    pub fn new(
        endpoint: &str,
        proxy_url: &str,
        tls: Option<TlsConfig>,
        token: &str,
        username: &str,
        password: &str,
    ) -> NotifyResult<Self> {
        Url::parse(endpoint)
            .map_err(|e| NotifyError::config(format!("invalid Alertmanager endpoint URL: {e}")))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            proxy_url: proxy_url.to_string(),
            tls,
            token: token.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn build_alerts(&self, event: &Event) -> Vec<AlertmanagerAlert> {
        let severity = match event.severity {
            Severity::Error => "error",
            Severity::Info => "info",
        };

        let mut labels = event.metadata.clone();
        labels.insert(
            "alertname".to_string(),
            format!("Herald{}", event.involved_object.kind),
        );
        labels.insert("severity".to_string(), severity.to_string());
        labels.insert("kind".to_string(), event.involved_object.kind.clone());
        labels.insert("name".to_string(), event.involved_object.name.clone());
        labels.insert(
            "namespace".to_string(),
            event.involved_object.namespace.clone(),
        );

        let annotations = HashMap::from([("message".to_string(), event.message.clone())]);

        vec![AlertmanagerAlert {
            status: "firing".to_string(),
            labels,
            annotations,
            starts_at: event.timestamp,
        }]
    }
}

#[async_trait]
impl Provider for Alertmanager {
    async fn post(&self, event: &Event) -> NotifyResult<()> {
        let alerts = self.build_alerts(event);
        let payload = serde_json::to_vec(&alerts).map_err(|e| {
            NotifyError::config(format!("failed to serialize Alertmanager alerts: {e}"))
        })?;

        let mut options = vec![
            with_proxy(&self.proxy_url),
            with_tls_config(self.tls.clone()),
            with_basic_auth(&self.username, &self.password),
        ];
        if !self.token.is_empty() {
            options.push(with_header(
                "Authorization",
                &format!("Bearer {}", self.token),
            ));
        }

        post_message(&self.endpoint, payload, options).await
    }

    fn name(&self) -> &'static str {
        "alertmanager"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{serve, test_event};
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let result = Alertmanager::new("not a url", "", None, "", "", "");
        assert!(matches!(result, Err(NotifyError::Configuration { .. })));
    }

    #[test]
    fn test_payload_is_json_array() {
        let alertmanager =
            Alertmanager::new("https://alertmanager.example.com/api/v2/alerts", "", None, "", "", "")
                .unwrap();
        let value = serde_json::to_value(alertmanager.build_alerts(&test_event())).unwrap();
        assert!(value.is_array());
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_alert_labels_and_annotations() {
        let alertmanager =
            Alertmanager::new("https://alertmanager.example.com/api/v2/alerts", "", None, "", "", "")
                .unwrap();
        let alerts = alertmanager.build_alerts(&test_event());
        let alert = &alerts[0];
        assert_eq!(alert.status, "firing");
        assert_eq!(alert.labels["alertname"], "HeraldGitRepository");
        assert_eq!(alert.labels["severity"], "info");
        assert_eq!(alert.labels["namespace"], "gitops-system");
        assert_eq!(alert.labels["test"], "metadata");
        assert_eq!(alert.annotations["message"], "message");
    }

    #[tokio::test]
    async fn test_post_delivers_array_body() {
        let capture: Arc<Mutex<Option<String>>> = Arc::default();
        let router = Router::new()
            .route(
                "/api/v2/alerts",
                post(
                    |State(capture): State<Arc<Mutex<Option<String>>>>, body: String| async move {
                        *capture.lock().unwrap() = Some(body);
                        StatusCode::OK
                    },
                ),
            )
            .with_state(capture.clone());
        let base = serve(router).await;

        let alertmanager =
            Alertmanager::new(&format!("{base}/api/v2/alerts"), "", None, "", "", "").unwrap();
        alertmanager.post(&test_event()).await.unwrap();

        let body = capture.lock().unwrap().take().unwrap();
        let alerts: Vec<AlertmanagerAlert> = serde_json::from_str(&body).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].annotations["message"], "message");
    }
}
