use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use crate::errors::{AppError, Result};
use crate::models::account::{Account, AccountType, ContactId};
use crate::services::account_store::AccountStore;

#[derive(Debug)]
pub struct Resolved {
    pub account: Account,
    pub created: bool,
}

/// Maps a contact identifier onto exactly one user or partner record.
#[derive(Clone)]
pub struct AccountResolver {
    store: Arc<dyn AccountStore>,
}

impl AccountResolver {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    async fn lookup_both(&self, contact: &ContactId) -> Result<(Option<Account>, Option<Account>)> {
        let (user, partner) = tokio::join!(
            self.store.find_by_contact(AccountType::User, contact),
            self.store.find_by_contact(AccountType::Partner, contact),
        );
        Ok((user?, partner?))
    }

    /// Returns the existing account of `requested` type, creates one when the
    /// identifier is unseen, and refuses identifiers bound to the other type.
    pub async fn resolve_or_create(&self, contact: &ContactId, requested: AccountType) -> Result<Resolved> {
        match self.lookup_both(contact).await? {
            (Some(_), Some(_)) => {
                tracing::warn!("⚠️ {} exists as both user and partner", contact);
                Err(AppError::AccountTypeConflict {
                    existing: requested.other(),
                })
            }
            (Some(user), None) if requested == AccountType::User => Ok(Resolved {
                account: user,
                created: false,
            }),
            (None, Some(partner)) if requested == AccountType::Partner => Ok(Resolved {
                account: partner,
                created: false,
            }),
            (Some(existing), None) | (None, Some(existing)) => Err(AppError::AccountTypeConflict {
                existing: existing.account_type(),
            }),
            (None, None) => {
                let account = self.store.create(requested, contact).await?;
                Ok(Resolved {
                    account,
                    created: true,
                })
            }
        }
    }

    /// First match wins: users are preferred over partners.
    pub async fn find(&self, contact: &ContactId) -> Result<Option<Account>> {
        let (user, partner) = self.lookup_both(contact).await?;
        Ok(user.or(partner))
    }

    pub async fn find_by_id(&self, kind: AccountType, id: &ObjectId) -> Result<Option<Account>> {
        self.store.find_by_id(kind, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryAccountStore;

    fn phone() -> ContactId {
        ContactId::Phone("+911234567890".into())
    }

    #[tokio::test]
    async fn creates_unseen_identifier_with_requested_type() {
        let store = Arc::new(MemoryAccountStore::new());
        let resolver = AccountResolver::new(store.clone());

        let resolved = resolver.resolve_or_create(&phone(), AccountType::User).await.unwrap();
        assert!(resolved.created);
        assert_eq!(resolved.account.account_type(), AccountType::User);
        assert_eq!(store.count(AccountType::User).await, 1);

        let again = resolver.resolve_or_create(&phone(), AccountType::User).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.account.id(), resolved.account.id());
        assert_eq!(store.count(AccountType::User).await, 1);
    }

    #[tokio::test]
    async fn partner_identifier_cannot_become_user() {
        let store = Arc::new(MemoryAccountStore::new());
        store.create(AccountType::Partner, &phone()).await.unwrap();
        let resolver = AccountResolver::new(store.clone());

        let err = resolver
            .resolve_or_create(&phone(), AccountType::User)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::AccountTypeConflict { existing: AccountType::Partner }
        ));
        assert_eq!(store.count(AccountType::User).await, 0);
    }

    #[tokio::test]
    async fn user_identifier_cannot_become_partner() {
        let store = Arc::new(MemoryAccountStore::new());
        store.create(AccountType::User, &phone()).await.unwrap();
        let resolver = AccountResolver::new(store.clone());

        let err = resolver
            .resolve_or_create(&phone(), AccountType::Partner)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::AccountTypeConflict { existing: AccountType::User }
        ));
        assert_eq!(store.count(AccountType::Partner).await, 0);
    }

    #[tokio::test]
    async fn identifier_in_both_collections_is_a_conflict() {
        let store = Arc::new(MemoryAccountStore::new());
        store.create(AccountType::User, &phone()).await.unwrap();
        store.create(AccountType::Partner, &phone()).await.unwrap();
        let resolver = AccountResolver::new(store);

        for requested in [AccountType::User, AccountType::Partner] {
            let err = resolver.resolve_or_create(&phone(), requested).await.unwrap_err();
            match err {
                AppError::AccountTypeConflict { existing } => assert_ne!(existing, requested),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn find_prefers_user_records() {
        let store = Arc::new(MemoryAccountStore::new());
        store.create(AccountType::Partner, &phone()).await.unwrap();
        store.create(AccountType::User, &phone()).await.unwrap();
        let resolver = AccountResolver::new(store);

        let found = resolver.find(&phone()).await.unwrap().unwrap();
        assert_eq!(found.account_type(), AccountType::User);
    }
}
