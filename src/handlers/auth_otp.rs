use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::dtos::auth_dtos::{
    MeResponse, RequestOtpRequest, RequestOtpResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use crate::errors::Result;
use crate::middleware::auth::CurrentAccount;
use crate::models::account::AccountType;
use crate::state::AppState;

// 1. Request OTP - signup or login, account type taken from the body (default user)
pub async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>> {
    let requested = req.account_type.unwrap_or(AccountType::User);
    issue_otp(&state, req, requested).await
}

pub async fn request_user_otp(
    State(state): State<AppState>,
    Json(req): Json<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>> {
    issue_otp(&state, req, AccountType::User).await
}

pub async fn request_partner_otp(
    State(state): State<AppState>,
    Json(req): Json<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>> {
    issue_otp(&state, req, AccountType::Partner).await
}

async fn issue_otp(
    state: &AppState,
    req: RequestOtpRequest,
    requested: AccountType,
) -> Result<Json<RequestOtpResponse>> {
    let contact = req.contact()?;
    state.otp_limiter.check(&format!("request:{}", contact))?;

    let resolved = state.resolver.resolve_or_create(&contact, requested).await?;
    if resolved.created {
        tracing::info!("🆕 new {} account for {}", requested, contact);
    }

    let issued = state.otp.issue(&resolved.account, &contact).await?;

    Ok(Json(RequestOtpResponse {
        success: true,
        message: format!("OTP sent to your {}", contact.field()),
        mode: state.config.mode.as_str(),
        account_type: resolved.account.account_type(),
        is_new_account: resolved.created,
        expires_in: format!("{} minutes", issued.window_minutes),
        expires_at: issued.expires_at.to_rfc3339(),
        otp: issued.code,
    }))
}

// 2. Verify OTP - exchanges a live code for a session token
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>> {
    req.validate()?;
    let contact = req.contact()?;
    state.otp_limiter.check(&format!("verify:{}", contact))?;

    let session = state.otp.verify(&contact, &req.otp).await?;

    Ok(Json(VerifyOtpResponse {
        success: true,
        message: "OTP verified successfully".to_string(),
        mode: state.config.mode.as_str(),
        account_type: session.account_type(),
        account: session.summary(),
        token: session.token,
    }))
}

// 3. Current account from the bearer token
pub async fn me(Extension(current): Extension<CurrentAccount>) -> Result<Json<MeResponse>> {
    Ok(Json(MeResponse {
        success: true,
        account_type: current.0.account_type(),
        account: current.0.to_response(),
    }))
}
