use axum::{
    middleware,
    routing::{patch, post},
    Router,
};

use crate::{
    handlers::{auth_otp, users},
    middleware::auth::auth_middleware,
    state::AppState,
};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/updateMe", patch(users::update_me))
        .route("/notify-garage/:partnerId", post(users::notify_garage))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // OTP login pinned to the user account type
        .route("/request-otp", post(auth_otp::request_user_otp))
        .route("/verify-otp", post(auth_otp::verify_otp))
        .merge(protected)
}
