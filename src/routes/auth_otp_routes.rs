use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    handlers::auth_otp,
    middleware::auth::auth_middleware,
    state::AppState,
};

pub fn auth_otp_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        // Current account from the bearer token
        .route("/me", get(auth_otp::me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Signup or login: creates the account on first use
        .route("/request-otp", post(auth_otp::request_otp))

        // Exchange the code for a session token
        .route("/verify-otp", post(auth_otp::verify_otp))
        .merge(protected)
}
