use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;

use crate::config::{AppConfig, RunMode};
use crate::errors::{AppError, Result};
use crate::models::account::{Account, AccountResponse, AccountType, ContactId};
use crate::services::account_resolver::AccountResolver;
use crate::services::account_store::AccountStore;
use crate::services::messaging::{Channel, Messenger};
use crate::services::templates;
use crate::services::token_service::TokenService;

pub const QUOTE_OTP_MINUTES: i64 = 5;

/// How codes are generated and how long they live for one flow.
#[derive(Debug, Clone)]
pub struct OtpPolicy {
    pub window: Duration,
    pub mode: RunMode,
    pub test_code: String,
}

impl OtpPolicy {
    pub fn new(window: Duration, mode: RunMode, test_code: impl Into<String>) -> Self {
        Self {
            window,
            mode,
            test_code: test_code.into(),
        }
    }

    /// Account login and signup.
    pub fn login(config: &AppConfig) -> Self {
        Self::new(
            Duration::minutes(config.otp.expiry_minutes),
            config.mode,
            config.otp.default_code.clone(),
        )
    }

    /// Customer confirmation of a garage quote.
    pub fn quote(config: &AppConfig) -> Self {
        Self::new(
            Duration::minutes(QUOTE_OTP_MINUTES),
            config.mode,
            config.otp.default_code.clone(),
        )
    }

    // 5-digit code in production, the fixed test code everywhere else
    pub fn generate(&self) -> String {
        if self.mode.is_production() {
            rand::thread_rng().gen_range(10_000..=99_999).to_string()
        } else {
            self.test_code.clone()
        }
    }

    pub fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.window
    }

    pub fn window_minutes(&self) -> i64 {
        self.window.num_minutes()
    }

    pub fn accepts_test_code(&self, submitted: &str) -> bool {
        !self.mode.is_production() && submitted == self.test_code
    }

    /// The code is only echoed back to clients outside production.
    pub fn reveal(&self, code: String) -> Option<String> {
        (!self.mode.is_production()).then_some(code)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub expires_at: DateTime<Utc>,
    pub window_minutes: i64,
    pub code: Option<String>,
}

#[derive(Debug)]
pub struct VerifiedSession {
    pub token: String,
    pub account: Account,
}

impl VerifiedSession {
    pub fn account_type(&self) -> AccountType {
        self.account.account_type()
    }

    pub fn summary(&self) -> AccountResponse {
        self.account.to_response()
    }
}

/// Issues login codes to accounts and exchanges correct codes for session tokens.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn AccountStore>,
    resolver: AccountResolver,
    messenger: Arc<dyn Messenger>,
    tokens: Arc<TokenService>,
    policy: OtpPolicy,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        messenger: Arc<dyn Messenger>,
        tokens: Arc<TokenService>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            resolver: AccountResolver::new(store.clone()),
            store,
            messenger,
            tokens,
            policy,
        }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// Stores a fresh code on the account, then sends it to `contact`, the
    /// identifier the account was resolved by. The stored code is kept even
    /// when delivery fails.
    pub async fn issue(&self, account: &Account, contact: &ContactId) -> Result<IssuedOtp> {
        let id = account.require_id()?;

        let code = self.policy.generate();
        let expires_at = self.policy.expiry_from(Utc::now());

        self.store
            .set_otp(account.account_type(), &id, &code, expires_at)
            .await?;

        let channel = match contact {
            ContactId::Phone(_) => Channel::Sms,
            ContactId::Email(_) => Channel::Email,
        };
        let body = templates::otp_message(&code, self.policy.window_minutes());
        let report = self.messenger.deliver(channel, contact.value(), &body).await;

        if !report.success {
            let reason = report.error.unwrap_or_else(|| "unknown error".to_string());
            tracing::error!("❌ OTP delivery to {} failed: {}", contact, reason);
            return Err(AppError::DeliveryFailed(reason));
        }

        tracing::info!(
            account_type = %account.account_type(),
            "✅ OTP issued to {} via {}",
            contact,
            channel.as_str()
        );

        Ok(IssuedOtp {
            expires_at,
            window_minutes: self.policy.window_minutes(),
            code: self.policy.reveal(code),
        })
    }

    pub async fn verify(&self, contact: &ContactId, submitted: &str) -> Result<VerifiedSession> {
        self.verify_at(contact, submitted, Utc::now()).await
    }

    pub async fn verify_at(
        &self,
        contact: &ContactId,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedSession> {
        let account = self
            .resolver
            .find(contact)
            .await?
            .ok_or(AppError::AccountNotFound)?;
        let id = account.require_id()?;

        let expected = if self.policy.accepts_test_code(submitted) {
            None
        } else {
            Some(submitted)
        };

        let verified = self
            .store
            .consume_otp(account.account_type(), &id, expected, now)
            .await?
            .ok_or(AppError::InvalidOrExpiredOtp)?;

        let token = self.tokens.issue(&verified)?;
        tracing::info!(
            account_type = %verified.account_type(),
            "🔐 {} verified",
            contact
        );

        Ok(VerifiedSession {
            token,
            account: verified,
        })
    }
}
