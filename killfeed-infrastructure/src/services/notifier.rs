use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use killfeed_domain::ports::Notifier;
use killfeed_domain::{ChannelId, GameEvent, RuntimeConfig};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    channel_id: u64,
    tenant: String,
    message: String,
    event: &'a GameEvent,
}

/// Posts each event as JSON to a webhook relay that forwards it to the channel.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    token: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(3)))
            .build()?;
        Ok(Self { client, url, token })
    }
}

async fn send_event(
    client: &Client,
    url: &str,
    token: Option<&str>,
    event: &GameEvent,
    destination: ChannelId,
) -> Result<()> {
    let payload = WebhookPayload {
        channel_id: destination.0,
        tenant: event.tenant.to_string(),
        message: event.to_string(),
        event,
    };
    let mut request = client.post(url).json(&payload);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    request.send().await?.error_for_status()?;
    Ok(())
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn dispatch(&self, event: GameEvent, destination: ChannelId) {
        let client = self.client.clone();
        let url = self.url.clone();
        let token = self.token.clone();
        tokio::spawn(async move {
            if let Err(err) = send_event(&client, &url, token.as_deref(), &event, destination).await {
                warn!(
                    tenant = %event.tenant,
                    channel = %destination,
                    event = event.kind.name(),
                    error = %err,
                    "notification delivery failed"
                );
            }
        });
    }

    async fn check_target(&self) -> Result<()> {
        let response = self.client.get(&self.url).send().await?;
        if response.status().is_server_error() {
            anyhow::bail!("webhook responded {}", response.status());
        }
        Ok(())
    }
}

/// Writes events to the log when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn dispatch(&self, event: GameEvent, destination: ChannelId) {
        info!(
            tenant = %event.tenant,
            channel = %destination,
            event = event.kind.name(),
            "{}",
            event
        );
    }

    async fn check_target(&self) -> Result<()> {
        Ok(())
    }
}

pub fn build_notifier(config: &RuntimeConfig) -> Result<Arc<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url.clone(),
            config.webhook_token.clone(),
            config.request_timeout_seconds,
        )?)),
        None => {
            info!("no webhook_url configured; events will be logged only");
            Ok(Arc::new(LogNotifier))
        }
    }
}
