use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::{AppError, Result};
use crate::models::account::{Account, AccountType, ContactId};
use crate::models::lead::{Lead, LeadStatus, PartnerQuote, WhatsappLog};
use crate::models::partner::{random_garage_id, Partner, PartnerPatch, PartnerQuery};
use crate::models::review::{QuickReview, Review};
use crate::models::user::{UpdateUserProfile, User};
use crate::services::account_store::{pick_garage_id, to_bson_datetime, AccountStore};
use crate::services::lead_store::LeadStore;
use crate::services::profile_store::ProfileStore;
use crate::services::review_store::ReviewStore;

/// In-process account store with the same semantics as the MongoDB one.
/// A single lock guards both collections, so `consume_otp` is atomic.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<(AccountType, ObjectId), Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, kind: AccountType) -> usize {
        self.accounts
            .read()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub async fn get(&self, kind: AccountType, id: &ObjectId) -> Option<Account> {
        self.accounts.read().await.get(&(kind, *id)).cloned()
    }

    /// Inserts or replaces a stored account, assigning an `_id` when missing.
    pub async fn put(&self, account: Account) -> Account {
        let kind = account.account_type();
        let id = account.id().unwrap_or_else(ObjectId::new);
        let account = match account {
            Account::User(mut u) => {
                u._id = Some(id);
                Account::User(u)
            }
            Account::Partner(mut p) => {
                p._id = Some(id);
                Account::Partner(p)
            }
        };
        self.accounts.write().await.insert((kind, id), account.clone());
        account
    }
}

fn garage_id_taken(accounts: &HashMap<(AccountType, ObjectId), Account>, candidate: i64) -> bool {
    accounts
        .values()
        .filter_map(Account::as_partner)
        .any(|p| p.garage_id == Some(candidate))
}

fn partner_mut<'a>(
    accounts: &'a mut HashMap<(AccountType, ObjectId), Account>,
    garage_id: i64,
) -> Option<&'a mut Partner> {
    accounts.values_mut().find_map(|account| match account {
        Account::Partner(p) if p.garage_id == Some(garage_id) => Some(p),
        _ => None,
    })
}

fn matches_contact(account: &Account, contact: &ContactId) -> bool {
    match contact {
        ContactId::Phone(p) => account.phone() == Some(p.as_str()),
        ContactId::Email(e) => account.email() == Some(e.as_str()),
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_contact(&self, kind: AccountType, contact: &ContactId) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|((k, _), account)| *k == kind && matches_contact(account, contact))
            .map(|(_, account)| account.clone()))
    }

    async fn find_by_id(&self, kind: AccountType, id: &ObjectId) -> Result<Option<Account>> {
        Ok(self.get(kind, id).await)
    }

    async fn create(&self, kind: AccountType, contact: &ContactId) -> Result<Account> {
        let id = ObjectId::new();
        let account = match (kind, contact) {
            (AccountType::User, ContactId::Phone(p)) => Account::User(User::with_phone(p.as_str())),
            (AccountType::User, ContactId::Email(e)) => Account::User(User::with_email(e.as_str())),
            (AccountType::Partner, ContactId::Phone(p)) => {
                Account::Partner(Partner::with_phone(p.as_str()))
            }
            (AccountType::Partner, ContactId::Email(e)) => {
                Account::Partner(Partner::with_email(e.as_str()))
            }
        };

        let mut accounts = self.accounts.write().await;
        let account = match account {
            Account::User(mut u) => {
                u._id = Some(id);
                Account::User(u)
            }
            Account::Partner(mut p) => {
                p._id = Some(id);
                p.garage_id = Some(pick_garage_id(random_garage_id, |candidate| {
                    garage_id_taken(&accounts, candidate)
                })?);
                Account::Partner(p)
            }
        };

        accounts.insert((kind, id), account.clone());
        Ok(account)
    }

    async fn set_otp(&self, kind: AccountType, id: &ObjectId, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&(kind, *id)).ok_or(AppError::AccountNotFound)?;
        let expires = Some(to_bson_datetime(expires_at));
        match account {
            Account::User(u) => {
                u.otp = Some(code.to_string());
                u.otp_expires = expires;
                u.updated_at = Utc::now();
            }
            Account::Partner(p) => {
                p.otp = Some(code.to_string());
                p.otp_expires = expires;
                p.updated_at = Utc::now();
            }
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
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(&(kind, *id)) else {
            return Ok(None);
        };

        if let Some(code) = code {
            let now_millis = now.timestamp_millis();
            let live = account.otp() == Some(code)
                && account
                    .otp_expires()
                    .map(|exp| exp.timestamp_millis() >= now_millis)
                    .unwrap_or(false);
            if !live {
                return Ok(None);
            }
        }

        match account {
            Account::User(u) => {
                u.otp = None;
                u.otp_expires = None;
                u.is_verified = true;
                u.updated_at = now;
            }
            Account::Partner(p) => {
                p.otp = None;
                p.otp_expires = None;
                p.is_verified = true;
                p.updated_at = now;
            }
        }
        Ok(Some(account.clone()))
    }
}

#[async_trait]
impl ProfileStore for MemoryAccountStore {
    async fn update_user(&self, id: &ObjectId, update: &UpdateUserProfile) -> Result<Option<User>> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&(AccountType::User, *id)) {
            Some(Account::User(user)) => {
                update.apply(user, Utc::now());
                Ok(Some(user.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_partner(&self, id: &ObjectId, patch: &PartnerPatch) -> Result<Option<Partner>> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&(AccountType::Partner, *id)) {
            Some(Account::Partner(partner)) => {
                patch.apply(partner, Utc::now());
                Ok(Some(partner.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn partner_by_garage_id(&self, garage_id: i64) -> Result<Option<Partner>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .filter_map(Account::as_partner)
            .find(|p| p.garage_id == Some(garage_id))
            .cloned())
    }

    async fn record_scan(&self, garage_id: i64, at: DateTime<Utc>) -> Result<Option<Partner>> {
        let mut accounts = self.accounts.write().await;
        Ok(partner_mut(&mut accounts, garage_id).map(|partner| {
            partner.public_scans += 1;
            partner.last_public_scan = Some(to_bson_datetime(at));
            partner.clone()
        }))
    }

    async fn count_partners(&self) -> Result<u64> {
        Ok(self.count(AccountType::Partner).await as u64)
    }

    async fn search_partners(&self, query: &PartnerQuery) -> Result<Vec<Partner>> {
        let accounts = self.accounts.read().await;
        let mut found: Vec<Partner> = accounts
            .values()
            .filter_map(Account::as_partner)
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.is_premium
                .cmp(&a.is_premium)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(found
            .into_iter()
            .skip(query.skip() as usize)
            .take(query.limit() as usize)
            .collect())
    }
}

/// Leads kept in insertion order.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<Vec<Lead>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Lead> {
        self.leads.read().await.clone()
    }
}

fn newest_mut<'a>(leads: &'a mut [Lead], wanted: impl Fn(&Lead) -> bool) -> Option<&'a mut Lead> {
    // max_by_key keeps the last of equal keys, so ties go to the later insert
    leads
        .iter_mut()
        .filter(|lead| wanted(lead))
        .max_by_key(|lead| lead.created_at)
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn insert(&self, mut lead: Lead) -> Result<Lead> {
        lead._id = Some(ObjectId::new());
        self.leads.write().await.push(lead.clone());
        Ok(lead)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Lead>> {
        let leads = self.leads.read().await;
        Ok(leads.iter().find(|l| l._id.as_ref() == Some(id)).cloned())
    }

    async fn list_by_garage(&self, garage_id: &str) -> Result<Vec<Lead>> {
        let leads = self.leads.read().await;
        let mut found: Vec<Lead> = leads
            .iter()
            .rev()
            .filter(|l| l.garage_id == garage_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn set_whatsapp_log(&self, id: &ObjectId, log: &WhatsappLog) -> Result<()> {
        let mut leads = self.leads.write().await;
        if let Some(lead) = leads.iter_mut().find(|l| l._id.as_ref() == Some(id)) {
            lead.whatsapp_logs = Some(log.clone());
        }
        Ok(())
    }

    async fn set_quote(&self, id: &ObjectId, quote: &PartnerQuote) -> Result<Option<Lead>> {
        let mut leads = self.leads.write().await;
        Ok(leads
            .iter_mut()
            .find(|l| l._id.as_ref() == Some(id))
            .map(|lead| {
                lead.partner_quote = Some(quote.clone());
                lead.status = LeadStatus::Quoted;
                lead.clone()
            }))
    }

    async fn set_status(&self, id: &ObjectId, status: LeadStatus) -> Result<Option<Lead>> {
        let mut leads = self.leads.write().await;
        Ok(leads
            .iter_mut()
            .find(|l| l._id.as_ref() == Some(id))
            .map(|lead| {
                lead.status = status;
                lead.clone()
            }))
    }

    async fn set_quote_otp(
        &self,
        user_phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Lead>> {
        let mut leads = self.leads.write().await;
        Ok(newest_mut(&mut leads, |l| l.user_phone == user_phone).map(|lead| {
            lead.quote_otp = Some(code.to_string());
            lead.quote_otp_expires = Some(to_bson_datetime(expires_at));
            lead.clone()
        }))
    }

    async fn confirm_quote_otp(
        &self,
        user_phone: &str,
        code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>> {
        let now_millis = now.timestamp_millis();
        let mut leads = self.leads.write().await;
        let found = newest_mut(&mut leads, |l| {
            if l.user_phone != user_phone {
                return false;
            }
            match code {
                Some(code) => {
                    l.quote_otp.as_deref() == Some(code)
                        && l.quote_otp_expires
                            .map(|exp| exp.timestamp_millis() >= now_millis)
                            .unwrap_or(false)
                }
                None => l.quote_otp.is_some(),
            }
        });
        Ok(found.map(|lead| {
            lead.quote_otp = None;
            lead.quote_otp_expires = None;
            lead.quote_confirmed_at = Some(to_bson_datetime(now));
            lead.clone()
        }))
    }
}

#[derive(Default)]
pub struct MemoryReviewStore {
    reviews: RwLock<Vec<Review>>,
    quick: RwLock<Vec<QuickReview>>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(items: &[T], keep: impl Fn(&T) -> bool, created: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut found: Vec<T> = items.iter().rev().filter(|i| keep(i)).cloned().collect();
    found.sort_by_key(|i| std::cmp::Reverse(created(i)));
    found
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn insert(&self, mut review: Review) -> Result<Review> {
        review._id = Some(ObjectId::new());
        self.reviews.write().await.push(review.clone());
        Ok(review)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Review>> {
        let reviews = self.reviews.read().await;
        let mut found = newest_first(&reviews, |_| true, |r| r.created_at);
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn by_garage(&self, garage_id: &str) -> Result<Vec<Review>> {
        let reviews = self.reviews.read().await;
        Ok(newest_first(&reviews, |r| r.garage_id == garage_id, |r| r.created_at))
    }

    async fn insert_quick(&self, mut review: QuickReview) -> Result<QuickReview> {
        review._id = Some(ObjectId::new());
        self.quick.write().await.push(review.clone());
        Ok(review)
    }

    async fn latest_quick(&self, limit: i64) -> Result<Vec<QuickReview>> {
        let quick = self.quick.read().await;
        let mut found = newest_first(&quick, |_| true, |r| r.created_at);
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn quick_by_garage(&self, garage_id: &str) -> Result<Vec<QuickReview>> {
        let quick = self.quick.read().await;
        Ok(newest_first(&quick, |r| r.garage_id == garage_id, |r| r.created_at))
    }
}
