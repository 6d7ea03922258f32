use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers::quick_reviews, state::AppState};

// Left from the garage QR page, so no login
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/addQuickReview", post(quick_reviews::add_quick_review))
        .route("/getAllQuickReview", get(quick_reviews::all_quick_reviews))
        .route("/:garageId", get(quick_reviews::garage_quick_reviews))
}
