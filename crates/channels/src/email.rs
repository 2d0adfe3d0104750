use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::outbound::{ChannelError, ChannelSender, DeliveryId};

const EMAIL_SEND_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_SUBJECT: &str = "Re: Your Inquiry";

/// Transactional email gateway client (bearer-auth JSON send endpoint).
pub struct HttpEmailSender {
    client: Client,
    api_url: String,
    api_key: SecretString,
    from_address: String,
}

impl HttpEmailSender {
    pub fn new(
        api_url: impl Into<String>,
        api_key: SecretString,
        from_address: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(EMAIL_SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key,
            from_address: from_address.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmailCreateResponse {
    id: String,
}

#[async_trait]
impl ChannelSender for HttpEmailSender {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryId, ChannelError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "from": self.from_address,
                "to": to,
                "subject": DEFAULT_SUBJECT,
                "text": body,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected { status: status.as_u16(), body });
        }

        let payload: EmailCreateResponse = response
            .json()
            .await
            .map_err(|error| ChannelError::Decode(format!("email response: {error}")))?;

        Ok(DeliveryId(payload.id))
    }
}
