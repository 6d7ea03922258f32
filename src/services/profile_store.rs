use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::ReturnDocument,
};

use crate::errors::Result;
use crate::models::partner::{Partner, PartnerPatch, PartnerQuery};
use crate::models::user::{UpdateUserProfile, User};
use crate::services::account_store::{to_bson_datetime, MongoAccountStore};

/// Profile reads and writes on top of the account collections.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn update_user(&self, id: &ObjectId, update: &UpdateUserProfile) -> Result<Option<User>>;

    async fn update_partner(&self, id: &ObjectId, patch: &PartnerPatch) -> Result<Option<Partner>>;

    async fn partner_by_garage_id(&self, garage_id: i64) -> Result<Option<Partner>>;

    /// Bumps `publicScans` and stamps `lastPublicScan` in one update.
    async fn record_scan(&self, garage_id: i64, at: DateTime<Utc>) -> Result<Option<Partner>>;

    async fn count_partners(&self) -> Result<u64>;

    /// Premium garages first, then newest.
    async fn search_partners(&self, query: &PartnerQuery) -> Result<Vec<Partner>>;
}

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn regex(pattern: String) -> Document {
    doc! { "$regex": pattern, "$options": "i" }
}

/// MongoDB filter equivalent to `PartnerQuery::matches`.
pub fn partner_filter(query: &PartnerQuery) -> Document {
    let mut filter = Document::new();
    if let Some(kind) = query.vehicle_type {
        filter.insert("vehicleTypes", kind.as_str());
    }
    if let Some(expertise) = query.expertise() {
        filter.insert("expertise", regex(format!("^{}$", escape_regex(expertise))));
    }
    if let Some(text) = query.text() {
        let pattern = escape_regex(text);
        let any_of: Vec<Document> = [
            "businessName",
            "fullName",
            "address",
            "expertise",
            "services.subServices.name",
        ]
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, regex(pattern.clone()));
            clause
        })
        .collect();
        filter.insert("$or", any_of);
    }
    filter
}

#[async_trait]
impl ProfileStore for MongoAccountStore {
    async fn update_user(&self, id: &ObjectId, update: &UpdateUserProfile) -> Result<Option<User>> {
        let user = self
            .users()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": update.to_set_document() })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(user)
    }

    async fn update_partner(&self, id: &ObjectId, patch: &PartnerPatch) -> Result<Option<Partner>> {
        let set = patch.to_set_document(Utc::now())?;
        let partner = self
            .partners()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(partner)
    }

    async fn partner_by_garage_id(&self, garage_id: i64) -> Result<Option<Partner>> {
        Ok(self.partners().find_one(doc! { "garageId": garage_id }).await?)
    }

    async fn record_scan(&self, garage_id: i64, at: DateTime<Utc>) -> Result<Option<Partner>> {
        let partner = self
            .partners()
            .find_one_and_update(
                doc! { "garageId": garage_id },
                doc! {
                    "$inc": { "publicScans": 1_i64 },
                    "$set": { "lastPublicScan": to_bson_datetime(at) },
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(partner)
    }

    async fn count_partners(&self) -> Result<u64> {
        Ok(self.partners().count_documents(doc! {}).await?)
    }

    async fn search_partners(&self, query: &PartnerQuery) -> Result<Vec<Partner>> {
        let partners = self
            .partners()
            .find(partner_filter(query))
            .sort(doc! { "isPremium": -1, "createdAt": -1 })
            .skip(query.skip())
            .limit(query.limit())
            .await?
            .try_collect()
            .await?;
        Ok(partners)
    }
}
