use reqwest::Client;
use serde::Deserialize;

use crate::config::TwilioConfig;
use crate::errors::{AppError, Result};

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: Option<String>,
}

/// Twilio Programmable Messaging client for SMS and WhatsApp.
#[derive(Clone)]
pub struct SMSService {
    config: TwilioConfig,
    client: Client,
}

impl SMSService {
    pub fn new(config: TwilioConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, client }
    }

    pub async fn send_sms(&self, to: &str, body: &str) -> Result<String> {
        self.send(to, &self.config.phone_number, body).await
    }

    pub async fn send_whatsapp(&self, to: &str, body: &str) -> Result<String> {
        let to = whatsapp_address(to);
        let from = whatsapp_address(&self.config.whatsapp_number);
        self.send(&to, &from, body).await
    }

    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            TWILIO_API, self.config.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Twilio API error: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let message: TwilioMessage = response.json().await?;
            tracing::debug!("📨 Twilio accepted message {}", message.sid);
            Ok(message.sid)
        } else {
            let detail = response
                .json::<TwilioError>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| status.to_string());
            Err(AppError::ExternalApi(format!(
                "Twilio rejected message ({}): {}",
                status, detail
            )))
        }
    }
}

pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_prefix_is_added_once() {
        assert_eq!(whatsapp_address("+911234567890"), "whatsapp:+911234567890");
        assert_eq!(whatsapp_address("whatsapp:+14155238886"), "whatsapp:+14155238886");
    }
}
