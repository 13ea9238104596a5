//! Zulip chat notification provider.
//!
//! Posts events as stream messages via the Zulip REST API, authenticated
//! with a bot email/API key pair over basic auth. The payload is form
//! encoded, not JSON.

use async_trait::async_trait;
use url::Url;

use crate::dispatch::{
    post_message, with_basic_auth, with_content_type, with_proxy, with_tls_config, TlsConfig,
};
use crate::error::{NotifyError, NotifyResult};
use crate::event::{Event, Severity};
use crate::providers::Provider;

const MESSAGES_PATH: &str = "/api/v1/messages";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Zulip notification provider
pub struct Zulip {
    endpoint: String,
    channel: String,
    topic: String,
    proxy_url: String,
    tls: Option<TlsConfig>,
    username: String,
    password: String,
}

impl Zulip {
    /// Creates a Zulip provider.
    ///
    /// The endpoint is rewritten to the fixed message-posting path.
    /// `channel` is a compound `<channel>/<topic>` string, split on the
    /// first `/`; a missing separator or an empty side fails construction.
    pub fn new(
        endpoint: &str,
        channel: &str,
        proxy_url: &str,
        tls: Option<TlsConfig>,
        username: &str,
        password: &str,
    ) -> NotifyResult<Self> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| NotifyError::config(format!("invalid Zulip endpoint URL: {e}")))?;
        url.set_path(MESSAGES_PATH);

        let (channel, topic) = split_channel(channel)?;

        Ok(Self {
            endpoint: url.to_string(),
            channel,
            topic,
            proxy_url: proxy_url.to_string(),
            tls,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn format_content(&self, event: &Event) -> String {
        let obj = format!(
            "{}/{}.{}",
            event.involved_object.kind.to_lowercase(),
            event.involved_object.name,
            event.involved_object.namespace
        );

        let header = match event.severity {
            Severity::Error => format!("⚠️ Error: `{obj}`"),
            Severity::Info => format!("ℹ️ Info: `{obj}`"),
        };

        let mut keys: Vec<&String> = event.metadata.keys().collect();
        keys.sort();
        let metadata = keys
            .iter()
            .map(|k| format!("- **{k}**: `{}`", event.metadata[*k]))
            .collect::<Vec<_>>()
            .join("\n");

        format!("{header}\n\n`{}`\n\nMetadata:\n{metadata}", event.message)
    }
}

fn split_channel(channel: &str) -> NotifyResult<(String, String)> {
    match channel.split_once('/') {
        Some((channel, topic)) if !channel.is_empty() && !topic.is_empty() => {
            Ok((channel.to_string(), topic.to_string()))
        }
        _ => Err(NotifyError::config(format!(
            "invalid Zulip channel format, expected <channel>/<topic>, got '{channel}'"
        ))),
    }
}

#[async_trait]
impl Provider for Zulip {
    async fn post(&self, event: &Event) -> NotifyResult<()> {
        let payload = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("type", "stream")
            .append_pair("to", &self.channel)
            .append_pair("topic", &self.topic)
            .append_pair("content", &self.format_content(event))
            .finish();

        post_message(
            &self.endpoint,
            payload.into_bytes(),
            vec![
                with_proxy(&self.proxy_url),
                with_tls_config(self.tls.clone()),
                with_basic_auth(&self.username, &self.password),
                with_content_type(FORM_CONTENT_TYPE),
            ],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "zulip"
    }
}
