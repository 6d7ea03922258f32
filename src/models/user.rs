use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    // Outstanding OTP challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_expires: Option<BsonDateTime>,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn with_phone(phone: impl Into<String>) -> Self {
        let mut user = Self::blank();
        user.phone = Some(phone.into());
        user
    }

    pub fn with_email(email: impl Into<String>) -> Self {
        let mut user = Self::blank();
        user.email = Some(email.into());
        user
    }

    fn blank() -> Self {
        let now = Utc::now();
        User {
            _id: None,
            phone: None,
            email: None,
            name: None,
            first_name: None,
            last_name: None,
            otp: None,
            otp_expires: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserProfile {
    #[validate(length(min = 1, max = 80, message = "Name must be between 1 and 80 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,
}

impl UpdateUserProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }

    pub fn to_set_document(&self) -> bson::Document {
        let mut set = bson::doc! {
            "updatedAt": BsonDateTime::from_millis(Utc::now().timestamp_millis()),
        };
        if let Some(name) = &self.name {
            set.insert("name", name.trim());
        }
        if let Some(first_name) = &self.first_name {
            set.insert("firstName", first_name.trim());
        }
        if let Some(last_name) = &self.last_name {
            set.insert("lastName", last_name.trim());
        }
        set
    }

    /// In-process counterpart of `to_set_document`.
    pub fn apply(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            user.name = Some(name.trim().to_string());
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = Some(first_name.trim().to_string());
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = Some(last_name.trim().to_string());
        }
        user.updated_at = now;
    }
}
