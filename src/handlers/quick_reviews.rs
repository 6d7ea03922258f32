use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::handlers::reviews::REVIEW_PAGE_LIMIT;
use crate::models::account::ContactId;
use crate::models::partner::parse_garage_id;
use crate::models::review::{
    average_rating, clean_tags, clean_text, CreateQuickReview, QuickReview, QuickReviewResponse,
    QUICK_REVIEW_TYPE,
};
use crate::state::AppState;

pub async fn add_quick_review(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuickReview>,
) -> Result<Json<Value>> {
    payload.validate()?;
    let garage_id = parse_garage_id(&payload.garage_id)?;
    let reviewer_phone = match clean_text(payload.reviewer_phone) {
        Some(raw) => Some(ContactId::phone(&raw)?.value().to_string()),
        None => None,
    };

    let partner = state
        .profiles
        .partner_by_garage_id(garage_id)
        .await?
        .ok_or(AppError::DocumentNotFound("Garage"))?;

    let now = Utc::now();
    let review = QuickReview {
        _id: None,
        garage_id: garage_id.to_string(),
        garage_name: partner.display_name().to_string(),
        vehicle: payload.vehicle.trim().to_string(),
        rating: payload.rating,
        review_type: QUICK_REVIEW_TYPE.to_string(),
        description: clean_text(payload.description),
        tags: clean_tags(payload.tags),
        reviewer_phone,
        reviewer_name: clean_text(payload.reviewer_name),
        created_at: now,
        updated_at: now,
    };
    let review = state.reviews.insert_quick(review).await?;

    tracing::info!("⭐ {}-star quick review for garage {}", review.rating, garage_id);

    Ok(Json(json!({
        "success": true,
        "message": "Quick review added successfully",
        "data": QuickReviewResponse::from(&review),
    })))
}

pub async fn all_quick_reviews(State(state): State<AppState>) -> Result<Json<Value>> {
    let found = state.reviews.latest_quick(REVIEW_PAGE_LIMIT).await?;
    let data: Vec<QuickReviewResponse> = found.iter().map(QuickReviewResponse::from).collect();

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub async fn garage_quick_reviews(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<Json<Value>> {
    let garage_id = parse_garage_id(&garage_id)?;
    let partner = state
        .profiles
        .partner_by_garage_id(garage_id)
        .await?
        .ok_or(AppError::DocumentNotFound("Garage"))?;

    let found = state.reviews.quick_by_garage(&garage_id.to_string()).await?;

    Ok(Json(json!({
        "success": true,
        "garage": {
            "garageId": garage_id,
            "garageName": partner.display_name(),
        },
        "count": found.len(),
        "averageRating": average_rating(found.iter().map(|r| r.rating)),
        "data": found.iter().map(QuickReviewResponse::from).collect::<Vec<_>>(),
    })))
}
