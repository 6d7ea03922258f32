use async_trait::async_trait;
use serde::Serialize;

use crate::services::email_service::EmailService;
use crate::services::sms_service::SMSService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Sms,
    WhatsApp,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::WhatsApp => "whatsapp",
            Channel::Email => "email",
        }
    }
}

/// Outcome of a delivery attempt. Failures are reported, not raised.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeliveryReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryReport {
    pub fn delivered() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn deliver(&self, channel: Channel, destination: &str, body: &str) -> DeliveryReport;
}

/// Development messenger: writes messages to the log instead of sending them.
#[derive(Default, Clone)]
pub struct ConsoleMessenger;

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn deliver(&self, channel: Channel, destination: &str, body: &str) -> DeliveryReport {
        tracing::info!(
            channel = channel.as_str(),
            "📱 [dev] message for {} not sent:\n{}",
            destination,
            body
        );
        DeliveryReport::delivered()
    }
}

/// Production messenger backed by Twilio and, when configured, SMTP.
#[derive(Clone)]
pub struct ProviderMessenger {
    sms: SMSService,
    email: Option<EmailService>,
}

impl ProviderMessenger {
    pub fn new(sms: SMSService, email: Option<EmailService>) -> Self {
        Self { sms, email }
    }
}

const EMAIL_SUBJECT: &str = "Your verification code";

#[async_trait]
impl Messenger for ProviderMessenger {
    async fn deliver(&self, channel: Channel, destination: &str, body: &str) -> DeliveryReport {
        let result = match channel {
            Channel::Sms => self.sms.send_sms(destination, body).await.map(|_| ()),
            Channel::WhatsApp => self.sms.send_whatsapp(destination, body).await.map(|_| ()),
            Channel::Email => match &self.email {
                Some(email) => email.send(destination, EMAIL_SUBJECT, body).await,
                None => return DeliveryReport::failed("email delivery is not configured"),
            },
        };

        match result {
            Ok(()) => DeliveryReport::delivered(),
            Err(e) => {
                tracing::error!(channel = channel.as_str(), "❌ delivery to {} failed: {}", destination, e);
                DeliveryReport::failed(e.to_string())
            }
        }
    }
}
