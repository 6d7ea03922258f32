use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::ReturnDocument,
    Collection, Database,
};

use crate::errors::{AppError, Result};
use crate::models::lead::{Lead, LeadStatus, PartnerQuote, WhatsappLog};
use crate::services::account_store::to_bson_datetime;

/// Persistence for customer enquiries and their quote confirmation codes.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Returns the lead with its assigned `_id`.
    async fn insert(&self, lead: Lead) -> Result<Lead>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Lead>>;

    /// Newest first.
    async fn list_by_garage(&self, garage_id: &str) -> Result<Vec<Lead>>;

    async fn set_whatsapp_log(&self, id: &ObjectId, log: &WhatsappLog) -> Result<()>;

    /// Stores the quote and moves the lead to `quoted`.
    async fn set_quote(&self, id: &ObjectId, quote: &PartnerQuote) -> Result<Option<Lead>>;

    async fn set_status(&self, id: &ObjectId, status: LeadStatus) -> Result<Option<Lead>>;

    /// Puts a fresh code on the newest lead for `user_phone`, replacing any earlier one.
    async fn set_quote_otp(
        &self,
        user_phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Lead>>;

    /// Single conditional update on the newest matching lead: with `Some(code)`
    /// the stored code must equal it and be unexpired at `now`; `None` only
    /// requires a code to be outstanding. On a match the code is cleared and
    /// `quoteConfirmedAt` set.
    async fn confirm_quote_otp(
        &self,
        user_phone: &str,
        code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>>;
}

fn to_bson_value<T: serde::Serialize>(value: &T) -> Result<bson::Bson> {
    bson::to_bson(value).map_err(|e| AppError::service(format!("BSON conversion failed: {}", e)))
}

#[derive(Clone)]
pub struct MongoLeadStore {
    db: Database,
}

impl MongoLeadStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn leads(&self) -> Collection<Lead> {
        self.db.collection("leads")
    }

    async fn update_by_id(&self, id: &ObjectId, update: Document) -> Result<Option<Lead>> {
        let lead = self
            .leads()
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(lead)
    }
}

#[async_trait]
impl LeadStore for MongoLeadStore {
    async fn insert(&self, mut lead: Lead) -> Result<Lead> {
        let inserted = self.leads().insert_one(&lead).await?;
        lead._id = Some(
            inserted
                .inserted_id
                .as_object_id()
                .ok_or_else(|| AppError::service("leads insert returned a non-ObjectId key"))?,
        );
        Ok(lead)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Lead>> {
        Ok(self.leads().find_one(doc! { "_id": id }).await?)
    }

    async fn list_by_garage(&self, garage_id: &str) -> Result<Vec<Lead>> {
        let leads = self
            .leads()
            .find(doc! { "garageId": garage_id })
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(leads)
    }

    async fn set_whatsapp_log(&self, id: &ObjectId, log: &WhatsappLog) -> Result<()> {
        self.leads()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "whatsappLogs": to_bson_value(log)? } },
            )
            .await?;
        Ok(())
    }

    async fn set_quote(&self, id: &ObjectId, quote: &PartnerQuote) -> Result<Option<Lead>> {
        self.update_by_id(
            id,
            doc! { "$set": {
                "partnerQuote": to_bson_value(quote)?,
                "status": LeadStatus::Quoted.as_str(),
            } },
        )
        .await
    }

    async fn set_status(&self, id: &ObjectId, status: LeadStatus) -> Result<Option<Lead>> {
        self.update_by_id(id, doc! { "$set": { "status": status.as_str() } })
            .await
    }

    async fn set_quote_otp(
        &self,
        user_phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Lead>> {
        let lead = self
            .leads()
            .find_one_and_update(
                doc! { "userPhone": user_phone },
                doc! { "$set": {
                    "quoteOtp": code,
                    "quoteOtpExpires": to_bson_datetime(expires_at),
                } },
            )
            .sort(doc! { "createdAt": -1 })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(lead)
    }

    async fn confirm_quote_otp(
        &self,
        user_phone: &str,
        code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>> {
        let mut filter = doc! { "userPhone": user_phone };
        match code {
            Some(code) => {
                filter.insert("quoteOtp", code);
                filter.insert("quoteOtpExpires", doc! { "$gte": to_bson_datetime(now) });
            }
            None => {
                filter.insert("quoteOtp", doc! { "$exists": true });
            }
        }

        let lead = self
            .leads()
            .find_one_and_update(
                filter,
                doc! {
                    "$set": { "quoteConfirmedAt": to_bson_datetime(now) },
                    "$unset": { "quoteOtp": "", "quoteOtpExpires": "" },
                },
            )
            .sort(doc! { "createdAt": -1 })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(lead)
    }
}
