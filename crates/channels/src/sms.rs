use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::outbound::{ChannelError, ChannelSender, DeliveryId};

const SMS_SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// SMS gateway client (Twilio-style REST API: form-encoded message create
/// under an account resource, basic auth).
pub struct HttpSmsSender {
    client: Client,
    api_url: String,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
}

impl HttpSmsSender {
    pub fn new(
        api_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: SecretString,
        from_number: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(SMS_SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            account_sid: account_sid.into(),
            auth_token,
            from_number: from_number.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SmsCreateResponse {
    sid: String,
}

#[async_trait]
impl ChannelSender for HttpSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryId, ChannelError> {
        let url = format!("{}/Accounts/{}/Messages.json", self.api_url, self.account_sid);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected { status: status.as_u16(), body });
        }

        let payload: SmsCreateResponse = response
            .json()
            .await
            .map_err(|error| ChannelError::Decode(format!("sms response: {error}")))?;

        Ok(DeliveryId(payload.sid))
    }
}
