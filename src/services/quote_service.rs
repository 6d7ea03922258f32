use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::errors::{AppError, Result};
use crate::models::account::ContactId;
use crate::models::lead::Lead;
use crate::services::lead_store::LeadStore;
use crate::services::messaging::{Channel, Messenger};
use crate::services::otp_service::{IssuedOtp, OtpPolicy};
use crate::services::templates;

const CONFIRMED_MESSAGE: &str = "Your quote has been successfully verified. ✔";

/// Codes a customer uses to confirm the quote on their most recent lead.
#[derive(Clone)]
pub struct QuoteOtpService {
    leads: Arc<dyn LeadStore>,
    messenger: Arc<dyn Messenger>,
    policy: OtpPolicy,
}

impl QuoteOtpService {
    pub fn new(leads: Arc<dyn LeadStore>, messenger: Arc<dyn Messenger>, policy: OtpPolicy) -> Self {
        Self {
            leads,
            messenger,
            policy,
        }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    pub async fn send(&self, phone: &ContactId) -> Result<IssuedOtp> {
        self.send_at(phone, Utc::now()).await
    }

    /// Stores a fresh code on the newest lead for `phone` and texts it.
    pub async fn send_at(&self, phone: &ContactId, now: DateTime<Utc>) -> Result<IssuedOtp> {
        let code = self.policy.generate();
        let expires_at = self.policy.expiry_from(now);

        let lead = self
            .leads
            .set_quote_otp(phone.value(), &code, expires_at)
            .await?
            .ok_or(AppError::DocumentNotFound("Lead for this phone number"))?;

        let body = templates::quote_otp_message(&lead.user_name, &code, self.policy.window_minutes());
        let report = self.messenger.deliver(Channel::Sms, phone.value(), &body).await;
        if !report.success {
            let reason = report.error.unwrap_or_else(|| "SMS delivery failed".to_string());
            tracing::error!("❌ quote OTP to {} failed: {}", phone, reason);
            return Err(AppError::DeliveryFailed(reason));
        }

        tracing::info!("✅ quote OTP sent to {}", phone);
        Ok(IssuedOtp {
            expires_at,
            window_minutes: self.policy.window_minutes(),
            code: self.policy.reveal(code),
        })
    }

    pub async fn verify(&self, phone: &ContactId, submitted: &str) -> Result<Lead> {
        self.verify_at(phone, submitted, Utc::now()).await
    }

    /// Confirms the quote and clears the code, so a code confirms at most once.
    pub async fn verify_at(&self, phone: &ContactId, submitted: &str, now: DateTime<Utc>) -> Result<Lead> {
        let expected = if self.policy.accepts_test_code(submitted) {
            None
        } else {
            Some(submitted)
        };

        let lead = self
            .leads
            .confirm_quote_otp(phone.value(), expected, now)
            .await?
            .ok_or(AppError::InvalidOrExpiredOtp)?;

        let report = self
            .messenger
            .deliver(Channel::WhatsApp, &lead.user_phone, CONFIRMED_MESSAGE)
            .await;
        if !report.success {
            tracing::warn!("⚠️ quote confirmation message to {} not delivered", lead.user_phone);
        }

        Ok(lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::models::lead::LeadStatus;
    use crate::services::memory_store::MemoryLeadStore;
    use crate::services::messaging::DeliveryReport;
    use async_trait::async_trait;
    use chrono::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(Channel, String, String)>>,
    }

    #[async_trait]
    impl Messenger for Outbox {
        async fn deliver(&self, channel: Channel, destination: &str, body: &str) -> DeliveryReport {
            self.sent
                .lock()
                .await
                .push((channel, destination.to_string(), body.to_string()));
            DeliveryReport::delivered()
        }
    }

    const PHONE: &str = "+919876543210";

    async fn service(mode: RunMode) -> (QuoteOtpService, Arc<Outbox>) {
        let leads = Arc::new(MemoryLeadStore::new());
        leads
            .insert(Lead {
                _id: None,
                user_name: "Asha".into(),
                user_phone: PHONE.into(),
                vehicle: None,
                services: vec![],
                location: None,
                pickup_drop: false,
                notes: None,
                budget: None,
                garage_id: "4821937".into(),
                status: LeadStatus::Quoted,
                partner_quote: None,
                quote_otp: None,
                quote_otp_expires: None,
                quote_confirmed_at: None,
                whatsapp_logs: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let outbox = Arc::new(Outbox::default());
        let policy = OtpPolicy::new(Duration::minutes(5), mode, "12345");
        (QuoteOtpService::new(leads, outbox.clone(), policy), outbox)
    }

    async fn sent_code(outbox: &Outbox) -> String {
        let sent = outbox.sent.lock().await;
        let (channel, _, body) = sent.last().unwrap();
        assert_eq!(*channel, Channel::Sms);
        body.split_whitespace()
            .map(|w| w.trim_matches('*'))
            .find(|w| w.len() == 5 && w.chars().all(|c| c.is_ascii_digit()))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn code_is_accepted_inside_five_minutes() {
        let (quotes, outbox) = service(RunMode::Production).await;
        let phone = ContactId::Phone(PHONE.into());
        let now = Utc::now();

        let issued = quotes.send_at(&phone, now).await.unwrap();
        assert!(issued.code.is_none());
        let code = sent_code(&outbox).await;

        let lead = quotes
            .verify_at(&phone, &code, now + Duration::minutes(4))
            .await
            .unwrap();
        assert!(lead.quote_confirmed_at.is_some());
    }

    #[tokio::test]
    async fn code_is_rejected_after_five_minutes() {
        let (quotes, outbox) = service(RunMode::Production).await;
        let phone = ContactId::Phone(PHONE.into());
        let now = Utc::now();

        quotes.send_at(&phone, now).await.unwrap();
        let code = sent_code(&outbox).await;

        let err = quotes
            .verify_at(&phone, &code, now + Duration::minutes(6))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredOtp));
    }

    #[tokio::test]
    async fn code_confirms_only_once() {
        let (quotes, outbox) = service(RunMode::Production).await;
        let phone = ContactId::Phone(PHONE.into());

        quotes.send(&phone).await.unwrap();
        let code = sent_code(&outbox).await;

        quotes.verify(&phone, &code).await.unwrap();
        let err = quotes.verify(&phone, &code).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredOtp));
    }

    #[tokio::test]
    async fn unknown_phone_has_no_lead() {
        let (quotes, _) = service(RunMode::Development).await;
        let err = quotes
            .send(&ContactId::Phone("+911111111111".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound(_)));
    }
}
