use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Quoted,
    InProgress,
    Completed,
    Cancelled,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Quoted => "quoted",
            LeadStatus::InProgress => "in_progress",
            LeadStatus::Completed => "completed",
            LeadStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, LeadStatus::Completed | LeadStatus::Cancelled)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "new" => Ok(LeadStatus::New),
            "quoted" => Ok(LeadStatus::Quoted),
            "in_progress" => Ok(LeadStatus::InProgress),
            "completed" => Ok(LeadStatus::Completed),
            "cancelled" => Ok(LeadStatus::Cancelled),
            other => Err(AppError::invalid_data(format!("Unknown lead status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerQuote {
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_completion_time: Option<String>,
    pub sent_at: BsonDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsappLog {
    pub partner_message: String,
    pub user_message: String,
    pub sent_at: BsonDateTime,
    pub delivery_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub user_name: String,
    pub user_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub pickup_drop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    pub garage_id: String,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_quote: Option<PartnerQuote>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_otp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_otp_expires: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_confirmed_at: Option<BsonDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_logs: Option<WhatsappLog>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Lead as returned over HTTP; the quote OTP never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub id: String,
    pub user_name: String,
    pub user_phone: String,
    pub vehicle: Option<String>,
    pub services: Vec<String>,
    pub location: Option<String>,
    pub pickup_drop: bool,
    pub notes: Option<String>,
    pub budget: Option<f64>,
    pub garage_id: String,
    pub status: LeadStatus,
    pub partner_quote: Option<QuoteResponse>,
    pub quote_confirmed: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub amount: f64,
    pub message: Option<String>,
    pub estimated_completion_time: Option<String>,
    pub sent_at: String,
}

impl From<&Lead> for LeadResponse {
    fn from(lead: &Lead) -> Self {
        LeadResponse {
            id: lead._id.map(|id| id.to_hex()).unwrap_or_default(),
            user_name: lead.user_name.clone(),
            user_phone: lead.user_phone.clone(),
            vehicle: lead.vehicle.clone(),
            services: lead.services.clone(),
            location: lead.location.clone(),
            pickup_drop: lead.pickup_drop,
            notes: lead.notes.clone(),
            budget: lead.budget,
            garage_id: lead.garage_id.clone(),
            status: lead.status,
            partner_quote: lead.partner_quote.as_ref().map(|q| QuoteResponse {
                amount: q.amount,
                message: q.message.clone(),
                estimated_completion_time: q.estimated_completion_time.clone(),
                sent_at: q.sent_at.to_chrono().to_rfc3339(),
            }),
            quote_confirmed: lead.quote_confirmed_at.is_some(),
            created_at: lead.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLead {
    #[validate(length(min = 1, max = 80, message = "userName is required"))]
    pub user_name: String,
    pub user_phone: String,
    pub vehicle: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub pickup_drop: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(range(min = 0.0))]
    pub budget: Option<f64>,
    pub garage_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteReply {
    #[validate(range(min = 0.0, message = "Quote amount must not be negative"))]
    pub amount: f64,
    #[validate(length(max = 500))]
    pub message: Option<String>,
    pub estimated_completion_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadStatus {
    pub status: String,
}
