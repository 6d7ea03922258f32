use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub garage_id: String,
    pub garage_name: String,
    pub user_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub vehicle_type: String,
    pub rating: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub garage_id: String,
    pub garage_name: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub vehicle_type: String,
    pub rating: i32,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
}

impl From<&Review> for ReviewResponse {
    fn from(review: &Review) -> Self {
        ReviewResponse {
            id: review._id.map(|id| id.to_hex()).unwrap_or_default(),
            garage_id: review.garage_id.clone(),
            garage_name: review.garage_name.clone(),
            user_id: review.user_id.to_hex(),
            user_name: review.user_name.clone(),
            vehicle_type: review.vehicle_type.clone(),
            rating: review.rating,
            description: review.description.clone(),
            tags: review.tags.clone(),
            created_at: review.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    #[validate(length(min = 1, message = "Garage ID is required"))]
    pub garage_id: String,
    #[validate(length(min = 1, max = 40, message = "Vehicle type is required"))]
    pub vehicle_type: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 tags"))]
    pub tags: Vec<String>,
}

/// Walk-in review left from the garage's QR page; no account needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickReview {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub garage_id: String,
    pub garage_name: String,
    pub vehicle: String,
    pub rating: i32,
    pub review_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_name: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

pub const QUICK_REVIEW_TYPE: &str = "quickReview";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickReviewResponse {
    pub id: String,
    pub garage_id: String,
    pub garage_name: String,
    pub vehicle: String,
    pub rating: i32,
    pub review_type: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub reviewer_name: Option<String>,
    pub created_at: String,
}

impl From<&QuickReview> for QuickReviewResponse {
    fn from(review: &QuickReview) -> Self {
        QuickReviewResponse {
            id: review._id.map(|id| id.to_hex()).unwrap_or_default(),
            garage_id: review.garage_id.clone(),
            garage_name: review.garage_name.clone(),
            vehicle: review.vehicle.clone(),
            rating: review.rating,
            review_type: review.review_type.clone(),
            description: review.description.clone(),
            tags: review.tags.clone(),
            reviewer_name: review.reviewer_name.clone(),
            created_at: review.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuickReview {
    #[validate(length(min = 1, message = "Garage ID is required"))]
    pub garage_id: String,
    #[validate(length(min = 1, max = 60, message = "Vehicle is required"))]
    pub vehicle: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 tags"))]
    pub tags: Vec<String>,
    pub reviewer_phone: Option<String>,
    #[validate(length(max = 80))]
    pub reviewer_name: Option<String>,
}

/// Trims free text and drops blank entries.
pub fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Mean rating rounded to one decimal; `None` when there are no ratings.
pub fn average_rating(ratings: impl IntoIterator<Item = i32>) -> Option<f64> {
    let (total, count) = ratings
        .into_iter()
        .fold((0i64, 0i64), |(total, count), r| (total + r as i64, count + 1));
    if count == 0 {
        return None;
    }
    let mean = total as f64 / count as f64;
    Some((mean * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i32) -> Review {
        Review {
            _id: None,
            garage_id: "4821937".into(),
            garage_name: "Sharma Motors".into(),
            user_id: ObjectId::new(),
            user_name: None,
            vehicle_type: "Car".into(),
            rating,
            description: None,
            tags: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn average_rating_rounds_to_one_decimal() {
        assert_eq!(average_rating(Vec::<i32>::new()), None);
        let reviews = [review(5), review(4), review(4)];
        assert_eq!(average_rating(reviews.iter().map(|r| r.rating)), Some(4.3));
    }

    #[test]
    fn rating_outside_range_fails_validation() {
        let payload = CreateReview {
            garage_id: "4821937".into(),
            vehicle_type: "Bike".into(),
            rating: 6,
            description: None,
            tags: vec![],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn quick_review_needs_vehicle_and_rating_in_range() {
        let payload: CreateQuickReview = serde_json::from_value(serde_json::json!({
            "garageId": "4821937",
            "vehicle": "",
            "rating": 0
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("vehicle"));
        assert!(fields.contains_key("rating"));
    }

    #[test]
    fn blank_tags_and_text_are_dropped() {
        assert_eq!(clean_tags(vec![" quick ".into(), "  ".into()]), vec!["quick".to_string()]);
        assert_eq!(clean_text(Some("   ".into())), None);
    }
}
