use axum::{
    extract::{Path, State},
    Extension, Json,
};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::middleware::auth::CurrentAccount;
use crate::models::account::{Account, AccountType};
use crate::models::user::UpdateUserProfile;
use crate::services::messaging::Channel;
use crate::services::templates;
use crate::state::AppState;

pub async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(payload): Json<UpdateUserProfile>,
) -> Result<Json<Value>> {
    let user = current.user()?;
    payload.validate()?;
    if payload.is_empty() {
        return Err(AppError::invalid_data("No profile fields to update"));
    }

    let id = current.0.require_id()?;
    let updated = state
        .profiles
        .update_user(&id, &payload)
        .await?
        .ok_or(AppError::DocumentNotFound("User"))?;

    tracing::info!("✅ profile updated for user {}", user._id.map(|id| id.to_hex()).unwrap_or_default());

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": Account::User(updated).to_response(),
    })))
}

/// WhatsApp enquiry from a signed-in user to a garage owner.
pub async fn notify_garage(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Path(partner_id): Path<String>,
) -> Result<Json<Value>> {
    let user = current.user()?;
    let partner_id = ObjectId::parse_str(&partner_id)?;

    let partner = state
        .resolver
        .find_by_id(AccountType::Partner, &partner_id)
        .await?
        .and_then(|account| account.as_partner().cloned())
        .ok_or(AppError::DocumentNotFound("Partner garage"))?;

    let owner_phone = partner
        .phone
        .as_deref()
        .ok_or_else(|| AppError::invalid_data("Garage owner has no WhatsApp number"))?;

    let user_name = user.name.as_deref().unwrap_or("A customer");
    let user_phone = user.phone.as_deref().unwrap_or("N/A");

    let enquiry = templates::garage_enquiry_message(&partner, user_name, user_phone);
    let report = state
        .messenger
        .deliver(Channel::WhatsApp, owner_phone, &enquiry)
        .await;
    if !report.success {
        return Err(AppError::DeliveryFailed(
            report.error.unwrap_or_else(|| "WhatsApp delivery failed".to_string()),
        ));
    }

    if let Some(phone) = user.phone.as_deref() {
        let ack = templates::enquiry_ack_to_user(&partner, user_name, phone);
        let report = state.messenger.deliver(Channel::WhatsApp, phone, &ack).await;
        if !report.success {
            tracing::warn!("⚠️ enquiry acknowledgement to {} not delivered", phone);
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "WhatsApp enquiry sent successfully to garage and user.",
    })))
}
