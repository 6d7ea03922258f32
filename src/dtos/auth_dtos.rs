use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::Result;
use crate::models::account::{AccountResponse, AccountType, ContactId};

fn numeric_code(code: &str) -> std::result::Result<(), ValidationError> {
    if code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("otp_numeric"))
    }
}

// Codes are compared after trimming, so validation sees the trimmed value too.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    String::deserialize(deserializer).map(|code| code.trim().to_string())
}

/// Presence and format of the identifier are checked by `contact()`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpRequest {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub account_type: Option<AccountType>,
}

impl RequestOtpRequest {
    pub fn contact(&self) -> Result<ContactId> {
        ContactId::from_parts(self.phone.as_deref(), self.email.as_deref())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub phone: Option<String>,
    pub email: Option<String>,

    #[serde(deserialize_with = "trimmed")]
    #[validate(
        length(min = 4, max = 8, message = "OTP must be 4 to 8 digits"),
        custom(function = "numeric_code", message = "OTP must contain only digits")
    )]
    pub otp: String,
}

impl VerifyOtpRequest {
    pub fn contact(&self) -> Result<ContactId> {
        ContactId::from_parts(self.phone.as_deref(), self.email.as_deref())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOtpResponse {
    pub success: bool,
    pub message: String,
    pub mode: &'static str,
    pub account_type: AccountType,
    pub is_new_account: bool,
    pub expires_in: String,
    pub expires_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub mode: &'static str,
    pub token: String,
    pub account_type: AccountType,
    pub account: AccountResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub success: bool,
    pub account_type: AccountType,
    pub account: AccountResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteOtpRequest {
    pub user_phone: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuoteOtpRequest {
    pub user_phone: String,

    #[serde(deserialize_with = "trimmed")]
    #[validate(
        length(min = 4, max = 8, message = "OTP must be 4 to 8 digits"),
        custom(function = "numeric_code", message = "OTP must contain only digits")
    )]
    pub otp: String,
}
