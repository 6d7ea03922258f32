use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    handlers::reviews,
    middleware::auth::auth_middleware,
    state::AppState,
};

pub fn routes(state: AppState) -> Router<AppState> {
    let create = post(reviews::create_review)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/", get(reviews::list_reviews).merge(create))
        .route("/garage/:garageId", get(reviews::garage_reviews))
}
