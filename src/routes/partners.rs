use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{
    handlers::{auth_otp, partners},
    middleware::auth::auth_middleware,
    state::AppState,
};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/updatePartnerProfile", patch(partners::update_partner_profile))
        .route("/qr-code", get(partners::qr_code))
        .route("/updatePartnerServices", patch(partners::update_partner_services))
        .route("/updatePartnerBrands", patch(partners::update_partner_brands))
        .route("/my-brands", get(partners::my_brands))
        .route("/check-limit", get(partners::check_brand_limit))
        .route("/partnerKYC", patch(partners::submit_kyc))
        .route("/kyc-status", get(partners::kyc_status))
        .route("/search", get(partners::search_partners))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // OTP login pinned to the partner account type
        .route("/request-otp", post(auth_otp::request_partner_otp))
        .route("/verify-otp", post(auth_otp::verify_otp))

        // Opened from the garage QR code
        .route("/public/:garageId", get(partners::public_garage))
        .route("/profile/:garageId", get(partners::public_profile_page))

        .route("/getAllServises", get(partners::all_services))
        .route("/services/selected/:garageId", get(partners::selected_services))
        .route("/services/unselected/:garageId", get(partners::unselected_services))
        .route(
            "/services/getAllPartnerServices/:garageId",
            get(partners::partner_service_menu),
        )
        .route("/brandsAvailable", get(partners::brands_available))

        .route("/count", get(partners::count_partners))
        .route("/", get(partners::list_partners))
        .route("/getAllPartners", get(partners::list_partners))
        .route("/:garageId", get(partners::garage_by_id))
        .merge(protected)
}
