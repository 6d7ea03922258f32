use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use std::str::FromStr;
use validator::Validate;

use crate::dtos::auth_dtos::{QuoteOtpRequest, VerifyQuoteOtpRequest};
use crate::errors::{AppError, Result};
use crate::middleware::auth::CurrentAccount;
use crate::models::account::ContactId;
use crate::models::lead::{
    CreateLead, Lead, LeadResponse, LeadStatus, PartnerQuote, QuoteReply, UpdateLeadStatus,
    WhatsappLog,
};
use crate::models::partner::{parse_garage_id, Partner};
use crate::services::account_store::to_bson_datetime;
use crate::services::messaging::Channel;
use crate::services::templates;
use crate::state::AppState;

async fn load_lead(state: &AppState, lead_id: &str) -> Result<Lead> {
    let id = ObjectId::parse_str(lead_id)?;
    state
        .leads
        .find_by_id(&id)
        .await?
        .ok_or(AppError::DocumentNotFound("Lead"))
}

fn ensure_owner(partner: &Partner, lead: &Lead) -> Result<()> {
    match partner.garage_id {
        Some(id) if id.to_string() == lead.garage_id => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

// 1. Create lead - public, notifies garage owner and customer on WhatsApp
pub async fn create_lead(
    State(state): State<AppState>,
    Json(payload): Json<CreateLead>,
) -> Result<Json<Value>> {
    payload.validate()?;
    let user_phone = ContactId::phone(&payload.user_phone)?;
    let garage_id = parse_garage_id(&payload.garage_id)?;

    let partner = state
        .profiles
        .partner_by_garage_id(garage_id)
        .await?
        .ok_or(AppError::DocumentNotFound("Garage"))?;

    let lead = Lead {
        _id: None,
        user_name: payload.user_name.trim().to_string(),
        user_phone: user_phone.value().to_string(),
        vehicle: payload.vehicle,
        services: payload.services,
        location: payload.location,
        pickup_drop: payload.pickup_drop,
        notes: payload.notes,
        budget: payload.budget,
        garage_id: garage_id.to_string(),
        status: LeadStatus::New,
        partner_quote: None,
        quote_otp: None,
        quote_otp_expires: None,
        quote_confirmed_at: None,
        whatsapp_logs: None,
        created_at: Utc::now(),
    };

    let mut lead = state.leads.insert(lead).await?;
    let lead_id = lead._id.ok_or(AppError::DocumentNotFound("Lead"))?;

    let partner_message = templates::lead_enquiry_to_partner(&partner, &lead);
    let user_message = templates::lead_ack_to_user(&partner, &lead);

    let partner_delivered = match partner.phone.as_deref() {
        Some(owner_phone) => {
            state
                .messenger
                .deliver(Channel::WhatsApp, owner_phone, &partner_message)
                .await
                .success
        }
        None => false,
    };
    let user_delivered = state
        .messenger
        .deliver(Channel::WhatsApp, &lead.user_phone, &user_message)
        .await
        .success;

    let delivery_status = if partner_delivered && user_delivered { "sent" } else { "failed" };
    if delivery_status == "failed" {
        tracing::warn!("⚠️ lead {} notifications not fully delivered", lead_id);
    }

    let log = WhatsappLog {
        partner_message,
        user_message,
        sent_at: to_bson_datetime(Utc::now()),
        delivery_status: delivery_status.to_string(),
    };
    state.leads.set_whatsapp_log(&lead_id, &log).await?;
    lead.whatsapp_logs = Some(log);

    tracing::info!("✅ lead {} created for garage {}", lead_id, garage_id);

    Ok(Json(json!({
        "success": true,
        "message": "Lead created & WhatsApp notifications sent!",
        "data": LeadResponse::from(&lead),
    })))
}

// 2. Leads for the signed-in partner's garage, newest first
pub async fn get_leads_by_garage(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Path(garage_id): Path<String>,
) -> Result<Json<Value>> {
    let partner = current.partner()?;
    let garage_id = parse_garage_id(&garage_id)?;
    if partner.garage_id != Some(garage_id) {
        return Err(AppError::Unauthorized);
    }

    let found = state.leads.list_by_garage(&garage_id.to_string()).await?;
    let data: Vec<LeadResponse> = found.iter().map(LeadResponse::from).collect();

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub async fn get_lead_by_id(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<Value>> {
    let lead = load_lead(&state, &lead_id).await?;
    Ok(Json(json!({
        "success": true,
        "data": LeadResponse::from(&lead),
    })))
}

// 3. Partner replies with a quote
pub async fn send_quote_reply(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Path(lead_id): Path<String>,
    Json(payload): Json<QuoteReply>,
) -> Result<Json<Value>> {
    let partner = current.partner()?;
    payload.validate()?;

    let lead = load_lead(&state, &lead_id).await?;
    ensure_owner(partner, &lead)?;
    if lead.status.is_closed() {
        return Err(AppError::invalid_data(format!("Lead is already {}", lead.status)));
    }

    let quote = PartnerQuote {
        amount: payload.amount,
        message: payload.message.clone(),
        estimated_completion_time: payload.estimated_completion_time.clone(),
        sent_at: to_bson_datetime(Utc::now()),
    };
    let lead_oid = lead._id.ok_or(AppError::DocumentNotFound("Lead"))?;
    let lead = state
        .leads
        .set_quote(&lead_oid, &quote)
        .await?
        .ok_or(AppError::DocumentNotFound("Lead"))?;

    let text = templates::quote_reply_message(
        &lead,
        payload.amount,
        payload.message.as_deref(),
        payload.estimated_completion_time.as_deref(),
    );
    let report = state
        .messenger
        .deliver(Channel::WhatsApp, &lead.user_phone, &text)
        .await;
    if !report.success {
        tracing::warn!("⚠️ quote for lead {} not delivered to customer", lead_oid);
    }

    Ok(Json(json!({
        "success": true,
        "message": "Quote sent successfully",
        "delivered": report.success,
        "data": LeadResponse::from(&lead),
    })))
}

pub async fn update_lead_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Path(lead_id): Path<String>,
    Json(payload): Json<UpdateLeadStatus>,
) -> Result<Json<Value>> {
    let partner = current.partner()?;
    let status = LeadStatus::from_str(&payload.status)?;

    let lead = load_lead(&state, &lead_id).await?;
    ensure_owner(partner, &lead)?;
    let lead_oid = lead._id.ok_or(AppError::DocumentNotFound("Lead"))?;

    let lead = state
        .leads
        .set_status(&lead_oid, status)
        .await?
        .ok_or(AppError::DocumentNotFound("Lead"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Lead status updated",
        "data": LeadResponse::from(&lead),
    })))
}

// 4. Quote confirmation OTP, sent to the customer of their latest lead
pub async fn send_quote_otp(
    State(state): State<AppState>,
    Json(payload): Json<QuoteOtpRequest>,
) -> Result<Json<Value>> {
    let phone = ContactId::phone(&payload.user_phone)?;
    state.otp_limiter.check(&format!("quote:{}", phone))?;

    let issued = state.quotes.send(&phone).await?;

    let mut response = json!({
        "success": true,
        "message": "OTP sent successfully for quote verification",
        "expiresIn": format!("{} minutes", issued.window_minutes),
    });
    if let Some(code) = issued.code {
        response["otp"] = json!(code);
    }
    Ok(Json(response))
}

pub async fn verify_quote_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyQuoteOtpRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;
    let phone = ContactId::phone(&payload.user_phone)?;
    state.otp_limiter.check(&format!("quote:{}", phone))?;

    let lead = state.quotes.verify(&phone, &payload.otp).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP verified successfully",
        "data": LeadResponse::from(&lead),
    })))
}
