use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::errors::Result;
use crate::models::review::{QuickReview, Review};

/// Account reviews and walk-in quick reviews. Every listing is newest first.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, review: Review) -> Result<Review>;

    async fn latest(&self, limit: i64) -> Result<Vec<Review>>;

    async fn by_garage(&self, garage_id: &str) -> Result<Vec<Review>>;

    async fn insert_quick(&self, review: QuickReview) -> Result<QuickReview>;

    async fn latest_quick(&self, limit: i64) -> Result<Vec<QuickReview>>;

    async fn quick_by_garage(&self, garage_id: &str) -> Result<Vec<QuickReview>>;
}

#[derive(Clone)]
pub struct MongoReviewStore {
    db: Database,
}

impl MongoReviewStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn reviews(&self) -> Collection<Review> {
        self.db.collection("reviews")
    }

    fn quick_reviews(&self) -> Collection<QuickReview> {
        self.db.collection("quickreviews")
    }
}

#[async_trait]
impl ReviewStore for MongoReviewStore {
    async fn insert(&self, mut review: Review) -> Result<Review> {
        let inserted = self.reviews().insert_one(&review).await?;
        review._id = inserted.inserted_id.as_object_id();
        Ok(review)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Review>> {
        let reviews = self
            .reviews()
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(reviews)
    }

    async fn by_garage(&self, garage_id: &str) -> Result<Vec<Review>> {
        let reviews = self
            .reviews()
            .find(doc! { "garageId": garage_id })
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(reviews)
    }

    async fn insert_quick(&self, mut review: QuickReview) -> Result<QuickReview> {
        let inserted = self.quick_reviews().insert_one(&review).await?;
        review._id = inserted.inserted_id.as_object_id();
        Ok(review)
    }

    async fn latest_quick(&self, limit: i64) -> Result<Vec<QuickReview>> {
        let reviews = self
            .quick_reviews()
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(reviews)
    }

    async fn quick_by_garage(&self, garage_id: &str) -> Result<Vec<QuickReview>> {
        let reviews = self
            .quick_reviews()
            .find(doc! { "garageId": garage_id })
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(reviews)
    }
}
