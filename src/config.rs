// config.rs
use chrono::Duration;
use std::env;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    /// `NODE_ENV=production` is the only value that switches production behaviour on.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "production" => RunMode::Production,
            _ => RunMode::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, RunMode::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OtpSettings {
    pub expiry_minutes: i64,
    pub default_code: String,
    pub rate_limit_max: u32,
    pub rate_limit_window_minutes: i64,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            expiry_minutes: 10,
            default_code: "12345".to_string(),
            rate_limit_max: 5,
            rate_limit_window_minutes: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_number: String,
    pub whatsapp_number: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: RunMode,
    pub database_url: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub otp: OtpSettings,
    pub twilio: Option<TwilioConfig>,
    pub smtp: Option<SmtpConfig>,
    pub public_base_url: String,
    pub port: u16,
    pub host: String,
}

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mode = RunMode::from_env_value(env::var("NODE_ENV").ok().as_deref());

        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("MONGO_URI"))
            .map_err(|_| AppError::configuration("DATABASE_URL or MONGO_URI must be set"))?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if mode.is_production() => {
                return Err(AppError::configuration("JWT_SECRET must be set in production"))
            }
            _ => {
                tracing::warn!("JWT_SECRET not set, using development fallback");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt_expires_in = match env::var("JWT_EXPIRES_IN") {
            Ok(raw) => parse_duration(&raw).ok_or_else(|| {
                AppError::configuration(format!("JWT_EXPIRES_IN has an invalid value: {}", raw))
            })?,
            Err(_) => Duration::days(7),
        };

        let defaults = OtpSettings::default();
        let otp = OtpSettings {
            expiry_minutes: parse_var("OTP_EXPIRY", defaults.expiry_minutes)?,
            default_code: env::var("DEFAULT_OTP")
                .map(|code| code.trim().to_string())
                .unwrap_or(defaults.default_code),
            rate_limit_max: parse_var("OTP_RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            rate_limit_window_minutes: parse_var(
                "OTP_RATE_LIMIT_WINDOW_MINUTES",
                defaults.rate_limit_window_minutes,
            )?,
        };
        if otp.expiry_minutes <= 0 {
            return Err(AppError::configuration("OTP_EXPIRY must be a positive number of minutes"));
        }
        check_default_code(&otp.default_code)?;

        let twilio = twilio_from_env();
        if mode.is_production() && twilio.is_none() {
            return Err(AppError::configuration(
                "TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_PHONE_NUMBER must be set in production",
            ));
        }

        let port = parse_var("PORT", 9002u16)?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        Ok(AppConfig {
            mode,
            database_url,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "garages".to_string()),
            jwt_secret,
            jwt_expires_in,
            otp,
            twilio,
            smtp: smtp_from_env(),
            public_base_url,
            port,
            host,
        })
    }

    /// Development defaults without reading the environment.
    pub fn development(database_url: impl Into<String>) -> Self {
        AppConfig {
            mode: RunMode::Development,
            database_url: database_url.into(),
            database_name: "garages".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_in: Duration::days(7),
            otp: OtpSettings::default(),
            twilio: None,
            smtp: None,
            public_base_url: "http://localhost:9002".to_string(),
            port: 9002,
            host: "0.0.0.0".to_string(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.mode.is_production()
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.mode.as_str(),
            "database_name": self.database_name,
            "otp_expiry_minutes": self.otp.expiry_minutes,
            "jwt_expires_in_seconds": self.jwt_expires_in.num_seconds(),
            "twilio_configured": self.twilio.is_some(),
            "smtp_configured": self.smtp.is_some(),
            "public_base_url": self.public_base_url,
            "port": self.port,
            "host": self.host,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::configuration(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// The test code must look like a code clients can submit: 4 to 8 digits.
pub fn check_default_code(code: &str) -> Result<()> {
    let digits_only = code.chars().all(|c| c.is_ascii_digit());
    if !(4..=8).contains(&code.len()) || !digits_only {
        return Err(AppError::configuration(format!(
            "DEFAULT_OTP must be 4 to 8 digits, got {:?}",
            code
        )));
    }
    Ok(())
}

fn twilio_from_env() -> Option<TwilioConfig> {
    let account_sid = env::var("TWILIO_ACCOUNT_SID").ok()?;
    let auth_token = env::var("TWILIO_AUTH_TOKEN").ok()?;
    let phone_number = env::var("TWILIO_PHONE_NUMBER").ok()?;
    let whatsapp_number = env::var("TWILIO_WHATSAPP_NUMBER")
        .unwrap_or_else(|_| format!("whatsapp:{}", phone_number));

    Some(TwilioConfig {
        account_sid,
        auth_token,
        phone_number,
        whatsapp_number,
    })
}

fn smtp_from_env() -> Option<SmtpConfig> {
    Some(SmtpConfig {
        host: env::var("SMTP_HOST").ok()?,
        username: env::var("SMTP_USERNAME").ok()?,
        password: env::var("SMTP_PASSWORD").ok()?,
        from: env::var("SMTP_FROM").ok()?,
    })
}

/// Parses `JWT_EXPIRES_IN`-style durations: `90` (seconds), `15m`, `24h`, `7d`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let amount: i64 = digits.parse().ok()?;
    if amount <= 0 {
        return None;
    }

    match unit {
        "s" => Some(Duration::seconds(amount)),
        "m" => Some(Duration::minutes(amount)),
        "h" => Some(Duration::hours(amount)),
        "d" => Some(Duration::days(amount)),
        _ => None,
    }
}
