use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::middleware::auth::CurrentAccount;
use crate::models::partner::parse_garage_id;
use crate::models::review::{
    average_rating, clean_tags, clean_text, CreateReview, Review, ReviewResponse,
};
use crate::state::AppState;

pub(crate) const REVIEW_PAGE_LIMIT: i64 = 100;

pub async fn create_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(payload): Json<CreateReview>,
) -> Result<Json<Value>> {
    current.user()?;
    payload.validate()?;
    let garage_id = parse_garage_id(&payload.garage_id)?;

    let partner = state
        .profiles
        .partner_by_garage_id(garage_id)
        .await?
        .ok_or(AppError::DocumentNotFound("Garage"))?;

    let now = Utc::now();
    let review = Review {
        _id: None,
        garage_id: garage_id.to_string(),
        garage_name: partner.display_name().to_string(),
        user_id: current.0.require_id()?,
        user_name: current.0.display_name().map(str::to_string),
        vehicle_type: payload.vehicle_type.trim().to_string(),
        rating: payload.rating,
        description: clean_text(payload.description),
        tags: clean_tags(payload.tags),
        created_at: now,
        updated_at: now,
    };
    let review = state.reviews.insert(review).await?;

    tracing::info!("⭐ {}-star review for garage {}", review.rating, garage_id);

    Ok(Json(json!({
        "success": true,
        "message": "Review submitted successfully",
        "data": ReviewResponse::from(&review),
    })))
}

pub async fn list_reviews(State(state): State<AppState>) -> Result<Json<Value>> {
    let found = state.reviews.latest(REVIEW_PAGE_LIMIT).await?;
    let data: Vec<ReviewResponse> = found.iter().map(ReviewResponse::from).collect();

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub async fn garage_reviews(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<Json<Value>> {
    let garage_id = parse_garage_id(&garage_id)?;

    let found = state.reviews.by_garage(&garage_id.to_string()).await?;

    Ok(Json(json!({
        "success": true,
        "count": found.len(),
        "averageRating": average_rating(found.iter().map(|r| r.rating)),
        "data": found.iter().map(ReviewResponse::from).collect::<Vec<_>>(),
    })))
}
