use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    options::ReturnDocument,
    Collection, Database,
};

use crate::errors::{AppError, Result};
use crate::models::account::{Account, AccountType, ContactId};
use crate::models::partner::{random_garage_id, Partner};
use crate::models::user::User;

const GARAGE_ID_ATTEMPTS: usize = 20;

/// Persistence for both account collections.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_contact(&self, kind: AccountType, contact: &ContactId) -> Result<Option<Account>>;

    async fn find_by_id(&self, kind: AccountType, id: &ObjectId) -> Result<Option<Account>>;

    async fn create(&self, kind: AccountType, contact: &ContactId) -> Result<Account>;

    /// Overwrites any outstanding challenge.
    async fn set_otp(&self, kind: AccountType, id: &ObjectId, code: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Single conditional update: when `code` is `Some`, it only matches while the
    /// stored code equals it and has not expired at `now`; `None` matches unconditionally.
    /// On a match the challenge is cleared and `isVerified` latched; returns the
    /// updated account, or `None` with nothing written.
    async fn consume_otp(
        &self,
        kind: AccountType,
        id: &ObjectId,
        code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>>;
}

/// Draws ids from `next` until one is not `taken`, giving up after a fixed number of tries.
pub(crate) fn pick_garage_id(mut next: impl FnMut() -> i64, taken: impl Fn(i64) -> bool) -> Result<i64> {
    (0..GARAGE_ID_ATTEMPTS)
        .map(|_| next())
        .find(|candidate| !taken(*candidate))
        .ok_or_else(|| AppError::service("could not allocate a free garage id"))
}

pub fn to_bson_datetime(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

#[derive(Clone)]
pub struct MongoAccountStore {
    db: Database,
}

impl MongoAccountStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub(crate) fn users(&self) -> Collection<User> {
        self.db.collection(AccountType::User.collection_name())
    }

    pub(crate) fn partners(&self) -> Collection<Partner> {
        self.db.collection(AccountType::Partner.collection_name())
    }

    fn raw(&self, kind: AccountType) -> Collection<Document> {
        self.db.collection(kind.collection_name())
    }

    async fn find_one(&self, kind: AccountType, filter: Document) -> Result<Option<Account>> {
        let account = match kind {
            AccountType::User => self.users().find_one(filter).await?.map(Account::User),
            AccountType::Partner => self.partners().find_one(filter).await?.map(Account::Partner),
        };
        Ok(account)
    }

    async fn unused_garage_id(&self) -> Result<i64> {
        for _ in 0..GARAGE_ID_ATTEMPTS {
            let candidate = random_garage_id();
            let taken = self
                .partners()
                .count_documents(doc! { "garageId": candidate })
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
        Err(AppError::service("could not allocate a free garage id"))
    }
}

#[async_trait]
impl AccountStore for MongoAccountStore {
    async fn find_by_contact(&self, kind: AccountType, contact: &ContactId) -> Result<Option<Account>> {
        let mut filter = Document::new();
        filter.insert(contact.field(), contact.value());
        self.find_one(kind, filter).await
    }

    async fn find_by_id(&self, kind: AccountType, id: &ObjectId) -> Result<Option<Account>> {
        self.find_one(kind, doc! { "_id": id }).await
    }

    async fn create(&self, kind: AccountType, contact: &ContactId) -> Result<Account> {
        match kind {
            AccountType::User => {
                let mut user = match contact {
                    ContactId::Phone(p) => User::with_phone(p.as_str()),
                    ContactId::Email(e) => User::with_email(e.as_str()),
                };
                let result = self.users().insert_one(&user).await?;
                user._id = result.inserted_id.as_object_id();
                tracing::info!("👤 Created user account for {}", contact);
                Ok(Account::User(user))
            }
            AccountType::Partner => {
                let mut partner = match contact {
                    ContactId::Phone(p) => Partner::with_phone(p.as_str()),
                    ContactId::Email(e) => Partner::with_email(e.as_str()),
                };
                partner.garage_id = Some(self.unused_garage_id().await?);
                let result = self.partners().insert_one(&partner).await?;
                partner._id = result.inserted_id.as_object_id();
                tracing::info!(
                    "🔧 Created partner account for {} (garage {:?})",
                    contact,
                    partner.garage_id
                );
                Ok(Account::Partner(partner))
            }
        }
    }

    async fn set_otp(&self, kind: AccountType, id: &ObjectId, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let update = doc! {
            "$set": {
                "otp": code,
                "otpExpires": to_bson_datetime(expires_at),
                "updatedAt": to_bson_datetime(Utc::now()),
            }
        };

        let result = self.raw(kind).update_one(doc! { "_id": id }, update).await?;
        if result.matched_count == 0 {
            return Err(AppError::AccountNotFound);
        }
        Ok(())
    }

    async fn consume_otp(
        &self,
        kind: AccountType,
        id: &ObjectId,
        code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let mut filter = doc! { "_id": id };
        if let Some(code) = code {
            filter.insert("otp", code);
            filter.insert("otpExpires", doc! { "$gte": to_bson_datetime(now) });
        }

        let update = doc! {
            "$set": { "isVerified": true, "updatedAt": to_bson_datetime(now) },
            "$unset": { "otp": "", "otpExpires": "" },
        };

        let account = match kind {
            AccountType::User => self
                .users()
                .find_one_and_update(filter, update)
                .return_document(ReturnDocument::After)
                .await?
                .map(Account::User),
            AccountType::Partner => self
                .partners()
                .find_one_and_update(filter, update)
                .return_document(ReturnDocument::After)
                .await?
                .map(Account::Partner),
        };
        Ok(account)
    }
}
