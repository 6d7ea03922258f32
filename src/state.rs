use mongodb::Database;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::services::account_resolver::AccountResolver;
use crate::services::account_store::{AccountStore, MongoAccountStore};
use crate::services::email_service::EmailService;
use crate::services::lead_store::{LeadStore, MongoLeadStore};
use crate::services::messaging::{ConsoleMessenger, Messenger, ProviderMessenger};
use crate::services::otp_service::{OtpPolicy, OtpService};
use crate::services::profile_store::ProfileStore;
use crate::services::quote_service::QuoteOtpService;
use crate::services::rate_limiter::OtpRateLimiter;
use crate::services::review_store::{MongoReviewStore, ReviewStore};
use crate::services::sms_service::SMSService;
use crate::services::token_service::TokenService;

/// Persistence handles the handlers work through.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub leads: Arc<dyn LeadStore>,
    pub reviews: Arc<dyn ReviewStore>,
}

impl Stores {
    pub fn mongo(db: &Database) -> Self {
        let accounts = Arc::new(MongoAccountStore::new(db.clone()));
        Stores {
            accounts: accounts.clone(),
            profiles: accounts,
            leads: Arc::new(MongoLeadStore::new(db.clone())),
            reviews: Arc::new(MongoReviewStore::new(db.clone())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    /// Only used for the health check; everything else goes through the stores.
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub accounts: Arc<dyn AccountStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub leads: Arc<dyn LeadStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub resolver: AccountResolver,
    pub messenger: Arc<dyn Messenger>,
    pub tokens: Arc<TokenService>,
    pub otp: OtpService,
    pub quotes: QuoteOtpService,
    pub otp_limiter: Arc<OtpRateLimiter>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, stores: Stores, messenger: Arc<dyn Messenger>) -> Self {
        let Stores {
            accounts,
            profiles,
            leads,
            reviews,
        } = stores;
        let tokens = Arc::new(TokenService::new(&config.jwt_secret, config.jwt_expires_in));
        let otp = OtpService::new(
            accounts.clone(),
            messenger.clone(),
            tokens.clone(),
            OtpPolicy::login(&config),
        );
        let window_secs = config.otp.rate_limit_window_minutes.max(1) as u64 * 60;
        let otp_limiter = Arc::new(OtpRateLimiter::new(
            config.otp.rate_limit_max,
            std::time::Duration::from_secs(window_secs),
        ));

        let quotes = QuoteOtpService::new(leads.clone(), messenger.clone(), OtpPolicy::quote(&config));

        AppState {
            db,
            resolver: AccountResolver::new(accounts.clone()),
            config: Arc::new(config),
            accounts,
            profiles,
            leads,
            reviews,
            quotes,
            messenger,
            tokens,
            otp,
            otp_limiter,
        }
    }

    /// MongoDB-backed stores; real providers in production, console output otherwise.
    pub fn from_config(db: Database, config: AppConfig) -> Result<Self> {
        let stores = Stores::mongo(&db);
        let messenger = build_messenger(&config)?;
        Ok(Self::new(db, config, stores, messenger))
    }
}

fn build_messenger(config: &AppConfig) -> Result<Arc<dyn Messenger>> {
    if !config.is_production() {
        tracing::info!("📱 Development mode: messages are logged, not sent");
        return Ok(Arc::new(ConsoleMessenger));
    }

    let twilio = config
        .twilio
        .clone()
        .ok_or_else(|| AppError::configuration("Twilio is not configured"))?;
    let email = config.smtp.as_ref().map(EmailService::new).transpose()?;
    if email.is_none() {
        tracing::warn!("⚠️ SMTP not configured, email OTP delivery will fail");
    }

    tracing::info!("✅ Twilio messaging initialized");
    Ok(Arc::new(ProviderMessenger::new(SMSService::new(twilio), email)))
}
