use axum::{
    extract::{Path, Query, State},
    response::Html,
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::middleware::auth::CurrentAccount;
use crate::models::catalog::{self, BIKE_BRANDS, CAR_BRANDS};
use crate::models::partner::{
    parse_garage_id, Kyc, KycStatus, Partner, PartnerPatch, PartnerProfileResponse, PartnerQuery,
    PublicGarage, SubmitKyc, UpdatePartnerBrands, UpdatePartnerProfile, UpdatePartnerServices,
};
use crate::services::templates;
use crate::state::AppState;

async fn garage(state: &AppState, raw_id: &str) -> Result<Partner> {
    let garage_id = parse_garage_id(raw_id)?;
    state
        .profiles
        .partner_by_garage_id(garage_id)
        .await?
        .ok_or(AppError::DocumentNotFound("Garage"))
}

async fn patch_current(state: &AppState, current: &CurrentAccount, patch: &PartnerPatch) -> Result<Partner> {
    state
        .profiles
        .update_partner(&current.0.require_id()?, patch)
        .await?
        .ok_or(AppError::DocumentNotFound("Partner"))
}

pub async fn update_partner_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(payload): Json<UpdatePartnerProfile>,
) -> Result<Json<Value>> {
    current.partner()?;
    payload.validate()?;
    let patch = payload.into_patch()?;

    let updated = patch_current(&state, &current, &patch).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": PartnerProfileResponse::from(&updated),
    })))
}

/// Links encoded into the garage's printed QR code.
pub async fn qr_code(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<Value>> {
    let partner = current.partner()?;
    let garage_id = partner
        .garage_id
        .ok_or_else(|| AppError::invalid_data("Partner has no garage id yet"))?;
    let base = &state.config.public_base_url;

    Ok(Json(json!({
        "success": true,
        "data": {
            "garageId": garage_id,
            "garageName": partner.display_name(),
            "publicUrl": format!("{}/api/partners/public/{}", base, garage_id),
            "profileUrl": partner.public_profile_url(base),
        }
    })))
}

// Public: counts every scan
pub async fn public_garage(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<Json<Value>> {
    let garage_id = parse_garage_id(&garage_id)?;
    let now = Utc::now();

    let partner = state
        .profiles
        .record_scan(garage_id, now)
        .await?
        .ok_or(AppError::DocumentNotFound("Garage"))?;

    tracing::info!("📷 garage {} scanned ({} total)", garage_id, partner.public_scans);

    Ok(Json(json!({
        "success": true,
        "data": {
            "garage": PublicGarage::from(&partner),
            "scanTime": now.to_rfc3339(),
        }
    })))
}

pub async fn public_profile_page(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<Html<String>> {
    let partner = garage(&state, &garage_id).await?;
    let scanned_on = Utc::now().format("%d/%m/%Y").to_string();
    Ok(Html(templates::render_public_profile(&partner, &scanned_on)))
}

// ----- Services -----

pub async fn all_services() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": catalog::service_catalog(),
    }))
}

pub async fn update_partner_services(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(payload): Json<UpdatePartnerServices>,
) -> Result<Json<Value>> {
    current.partner()?;
    let selection = payload.into_selection()?;
    let picked: usize = selection.iter().map(|c| c.sub_services.len()).sum();

    let patch = PartnerPatch {
        services: Some(selection),
        ..PartnerPatch::default()
    };
    let updated = patch_current(&state, &current, &patch).await?;
    tracing::info!("🔧 garage {:?} now offers {} services", updated.garage_id, picked);

    Ok(Json(json!({
        "success": true,
        "message": "Services updated successfully",
        "data": updated.service_menu(),
    })))
}

pub async fn selected_services(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<Json<Value>> {
    let partner = garage(&state, &garage_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": partner.services_where(true),
    })))
}

pub async fn unselected_services(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<Json<Value>> {
    let partner = garage(&state, &garage_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": partner.services_where(false),
    })))
}

pub async fn partner_service_menu(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<Json<Value>> {
    let partner = garage(&state, &garage_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": partner.service_menu(),
    })))
}

// ----- Brands -----

pub async fn brands_available() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "carBrands": CAR_BRANDS,
            "bikeBrands": BIKE_BRANDS,
        }
    }))
}

fn brand_usage(partner: &Partner) -> Value {
    let selected = partner.all_brands().len();
    let limit = partner.brand_limit();
    json!({
        "selected": selected,
        "limit": limit,
        "remaining": limit.map(|l| l.saturating_sub(selected)),
        "isPremium": partner.is_premium,
    })
}

pub async fn update_partner_brands(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(payload): Json<UpdatePartnerBrands>,
) -> Result<Json<Value>> {
    let partner = current.partner()?;
    let brands = payload.merge_into(&partner.brands, partner.brand_limit())?;

    let patch = PartnerPatch {
        brands: Some(brands),
        ..PartnerPatch::default()
    };
    let updated = patch_current(&state, &current, &patch).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Brands updated successfully",
        "data": {
            "brands": updated.brands,
            "usage": brand_usage(&updated),
        }
    })))
}

pub async fn my_brands(Extension(current): Extension<CurrentAccount>) -> Result<Json<Value>> {
    let partner = current.partner()?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "brands": partner.brands,
            "usage": brand_usage(partner),
        }
    })))
}

pub async fn check_brand_limit(Extension(current): Extension<CurrentAccount>) -> Result<Json<Value>> {
    let partner = current.partner()?;
    Ok(Json(json!({
        "success": true,
        "data": brand_usage(partner),
    })))
}

// ----- Directory -----

pub async fn count_partners(State(state): State<AppState>) -> Result<Json<Value>> {
    let total = state.profiles.count_partners().await?;
    Ok(Json(json!({
        "success": true,
        "count": total,
    })))
}

pub async fn list_partners(
    State(state): State<AppState>,
    Query(query): Query<PartnerQuery>,
) -> Result<Json<Value>> {
    let found = state.profiles.search_partners(&query).await?;
    let data: Vec<PublicGarage> = found.iter().map(PublicGarage::from).collect();

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

/// Signed-in lookup across names, address, expertise and services.
pub async fn search_partners(
    State(state): State<AppState>,
    Extension(_current): Extension<CurrentAccount>,
    Query(query): Query<PartnerQuery>,
) -> Result<Json<Value>> {
    let found = state.profiles.search_partners(&query).await?;
    let data: Vec<PublicGarage> = found.iter().map(PublicGarage::from).collect();

    Ok(Json(json!({
        "success": true,
        "page": query.page(),
        "limit": query.limit(),
        "count": data.len(),
        "data": data,
    })))
}

// Same card as the QR scan, without bumping the counter
pub async fn garage_by_id(
    State(state): State<AppState>,
    Path(garage_id): Path<String>,
) -> Result<Json<Value>> {
    let partner = garage(&state, &garage_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": PublicGarage::from(&partner),
    })))
}

// ----- KYC -----

pub async fn submit_kyc(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(payload): Json<SubmitKyc>,
) -> Result<Json<Value>> {
    let partner = current.partner()?;
    let number = payload.digits()?;
    if partner.kyc.as_ref().is_some_and(|k| k.verified) {
        return Err(AppError::invalid_data("KYC is already verified"));
    }

    let mut kyc = Kyc::aadhaar(number, Utc::now());
    kyc.full_name = partner.full_name.clone();
    let patch = PartnerPatch {
        kyc: Some(kyc),
        ..PartnerPatch::default()
    };
    let updated = patch_current(&state, &current, &patch).await?;
    tracing::info!("🪪 KYC submitted for garage {:?}", updated.garage_id);

    Ok(Json(json!({
        "success": true,
        "message": "KYC submitted for review",
        "data": KycStatus::from(&updated),
    })))
}

pub async fn kyc_status(Extension(current): Extension<CurrentAccount>) -> Result<Json<Value>> {
    let partner = current.partner()?;
    Ok(Json(json!({
        "success": true,
        "data": KycStatus::from(partner),
    })))
}
