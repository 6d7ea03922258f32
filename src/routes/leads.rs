use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{
    handlers::leads,
    middleware::auth::auth_middleware,
    state::AppState,
};

// Path parameters share one name so the routes can live in one tree.
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/:id", get(leads::get_leads_by_garage))
        .route("/:id/sendQuoteReply", patch(leads::send_quote_reply))
        .route("/:id/status", patch(leads::update_lead_status))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/createLead", post(leads::create_lead))
        .route("/getLeadById/:id", get(leads::get_lead_by_id))

        // Customer confirms a quote with a short-lived code
        .route("/send-quote-otp", post(leads::send_quote_otp))
        .route("/verify-quote-otp", post(leads::verify_quote_otp))
        .merge(protected)
}
