use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidateEmail;

use crate::errors::{AppError, Result};
use crate::models::partner::Partner;
use crate::models::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    User,
    Partner,
}

impl AccountType {
    pub fn collection_name(&self) -> &'static str {
        match self {
            AccountType::User => "users",
            AccountType::Partner => "partners",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::User => "user",
            AccountType::Partner => "partner",
        }
    }

    pub fn other(&self) -> AccountType {
        match self {
            AccountType::User => AccountType::Partner,
            AccountType::Partner => AccountType::User,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phone number or email address an account is looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContactId {
    Phone(String),
    Email(String),
}

impl ContactId {
    /// Builds an identifier from request fields. Phone wins when both are sent.
    pub fn from_parts(phone: Option<&str>, email: Option<&str>) -> Result<Self> {
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());
        let email = email.map(str::trim).filter(|e| !e.is_empty());

        match (phone, email) {
            (Some(phone), _) => Self::phone(phone),
            (None, Some(email)) => Self::email(email),
            (None, None) => Err(AppError::invalid_data("Either phone or email is required")),
        }
    }

    pub fn phone(raw: &str) -> Result<Self> {
        let normalized: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
        let digits = normalized.strip_prefix('+').unwrap_or(&normalized);

        if digits.len() < 10 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::invalid_data("Valid phone number is required"));
        }
        Ok(ContactId::Phone(normalized))
    }

    pub fn email(raw: &str) -> Result<Self> {
        let email = raw.trim().to_lowercase();
        if !email.validate_email() {
            return Err(AppError::invalid_data("Please provide a valid email"));
        }
        Ok(ContactId::Email(email))
    }

    pub fn field(&self) -> &'static str {
        match self {
            ContactId::Phone(_) => "phone",
            ContactId::Email(_) => "email",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ContactId::Phone(v) | ContactId::Email(v) => v,
        }
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// An account resolved from one of the two collections.
#[derive(Debug, Clone)]
pub enum Account {
    User(User),
    Partner(Partner),
}

impl Account {
    pub fn account_type(&self) -> AccountType {
        match self {
            Account::User(_) => AccountType::User,
            Account::Partner(_) => AccountType::Partner,
        }
    }

    pub fn id(&self) -> Option<ObjectId> {
        match self {
            Account::User(u) => u._id,
            Account::Partner(p) => p._id,
        }
    }

    pub fn require_id(&self) -> Result<ObjectId> {
        self.id()
            .ok_or_else(|| AppError::service("account record has no _id"))
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            Account::User(u) => u.phone.as_deref(),
            Account::Partner(p) => p.phone.as_deref(),
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Account::User(u) => u.email.as_deref(),
            Account::Partner(p) => p.email.as_deref(),
        }
    }

    pub fn is_verified(&self) -> bool {
        match self {
            Account::User(u) => u.is_verified,
            Account::Partner(p) => p.is_verified,
        }
    }

    pub fn otp(&self) -> Option<&str> {
        match self {
            Account::User(u) => u.otp.as_deref(),
            Account::Partner(p) => p.otp.as_deref(),
        }
    }

    pub fn otp_expires(&self) -> Option<BsonDateTime> {
        match self {
            Account::User(u) => u.otp_expires,
            Account::Partner(p) => p.otp_expires,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            Account::User(u) => u.name.as_deref().or(u.first_name.as_deref()),
            Account::Partner(p) => p.full_name.as_deref().or(p.business_name.as_deref()),
        }
    }

    pub fn as_partner(&self) -> Option<&Partner> {
        match self {
            Account::Partner(p) => Some(p),
            Account::User(_) => None,
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Account::User(u) => Some(u),
            Account::Partner(_) => None,
        }
    }

    pub fn to_response(&self) -> AccountResponse {
        AccountResponse {
            id: self.id().map(|id| id.to_hex()).unwrap_or_default(),
            account_type: self.account_type(),
            phone: self.phone().map(str::to_string),
            email: self.email().map(str::to_string),
            name: self.display_name().map(str::to_string),
            is_verified: self.is_verified(),
            garage_id: self.as_partner().and_then(|p| p.garage_id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub account_type: AccountType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garage_id: Option<i64>,
}
