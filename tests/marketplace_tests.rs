mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{
    get_json, get_with_token, login_as, patch_with_token, post_json, post_with_token, test_app,
    TestApp,
};
use garage_api::config::RunMode;
use garage_api::models::account::Account;
use garage_api::models::partner::{Partner, VehicleType};
use garage_api::services::lead_store::LeadStore;
use garage_api::services::messaging::Channel;

const OWNER: &str = "+919000000001";
const RIVAL: &str = "+919000000002";
const CUSTOMER: &str = "+919876543210";

/// Stores a garage directly, skipping the login flow.
async fn seed_garage(app: &TestApp, garage_id: i64, name: &str, phone: &str) -> Partner {
    let mut partner = Partner::with_phone(phone);
    partner.garage_id = Some(garage_id);
    partner.business_name = Some(name.to_string());
    partner.vehicle_types = vec![VehicleType::Car];
    match app.store.put(Account::Partner(partner)).await {
        Account::Partner(p) => p,
        Account::User(_) => unreachable!(),
    }
}

async fn create_lead(app: &TestApp, garage_id: i64) -> Value {
    let (status, body) = post_json(
        &app.router,
        "/api/leads/createLead",
        json!({
            "userName": "Asha",
            "userPhone": CUSTOMER,
            "vehicle": "Swift",
            "services": ["Oil Change"],
            "garageId": garage_id.to_string(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"].clone()
}

async fn last_sms_code(app: &TestApp) -> String {
    let sent = app.messenger.sent().await;
    let sms = sent
        .iter()
        .rev()
        .find(|m| m.channel == Channel::Sms && m.to == CUSTOMER)
        .unwrap();
    sms.body
        .split_whitespace()
        .map(|w| w.trim_matches('*'))
        .find(|w| w.len() == 5 && w.chars().all(|c| c.is_ascii_digit()))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn only_the_owning_garage_can_quote_or_move_a_lead() {
    let app = test_app(RunMode::Development).await;
    let (owner_token, owner) = login_as(&app.router, "/api/partners", OWNER).await;
    let (rival_token, _) = login_as(&app.router, "/api/partners", RIVAL).await;
    let garage_id = owner["garageId"].as_i64().unwrap();

    let lead = create_lead(&app, garage_id).await;
    let lead_id = lead["id"].as_str().unwrap();
    assert_eq!(lead["status"], "new");

    let quote = json!({ "amount": 1500.0, "message": "Includes oil filter" });
    let (status, body) = patch_with_token(
        &app.router,
        &format!("/api/leads/{}/sendQuoteReply", lead_id),
        quote.clone(),
        &rival_token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = patch_with_token(
        &app.router,
        &format!("/api/leads/{}/status", lead_id),
        json!({ "status": "in_progress" }),
        &rival_token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get_with_token(&app.router, &format!("/api/leads/{}", garage_id), &rival_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = patch_with_token(
        &app.router,
        &format!("/api/leads/{}/sendQuoteReply", lead_id),
        quote,
        &owner_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "quoted");
    assert_eq!(body["data"]["partnerQuote"]["amount"], 1500.0);

    let (status, body) = patch_with_token(
        &app.router,
        &format!("/api/leads/{}/status", lead_id),
        json!({ "status": "in_progress" }),
        &owner_token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, body) = get_with_token(&app.router, &format!("/api/leads/{}", garage_id), &owner_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn quote_code_confirms_once() {
    let app = test_app(RunMode::Production).await;
    seed_garage(&app, 4_821_937, "Sharma Motors", OWNER).await;
    create_lead(&app, 4_821_937).await;

    let (status, body) = post_json(&app.router, "/api/leads/send-quote-otp", json!({ "userPhone": CUSTOMER })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expiresIn"], "5 minutes");
    assert!(body.get("otp").is_none());
    let code = last_sms_code(&app).await;

    let verify = json!({ "userPhone": CUSTOMER, "otp": code });
    let (status, body) = post_json(&app.router, "/api/leads/verify-quote-otp", verify.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quoteConfirmed"], true);

    let (status, body) = post_json(&app.router, "/api/leads/verify-quote-otp", verify).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_OR_EXPIRED_OTP");
}

#[tokio::test]
async fn quote_code_lives_five_minutes() {
    let app = test_app(RunMode::Production).await;
    seed_garage(&app, 4_821_937, "Sharma Motors", OWNER).await;
    create_lead(&app, 4_821_937).await;

    let sent_at = Utc::now();
    post_json(&app.router, "/api/leads/send-quote-otp", json!({ "userPhone": CUSTOMER })).await;
    let code = last_sms_code(&app).await;

    let stored = app.leads.all().await;
    let expires = stored[0].quote_otp_expires.unwrap().to_chrono();
    assert!(expires > sent_at + Duration::minutes(4));
    assert!(expires <= Utc::now() + Duration::minutes(5));

    // same code, but the window has passed
    app.leads
        .set_quote_otp(CUSTOMER, &code, Utc::now() - Duration::seconds(1))
        .await
        .unwrap();
    let (status, _) = post_json(
        &app.router,
        "/api/leads/verify-quote-otp",
        json!({ "userPhone": CUSTOMER, "otp": code }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    post_json(&app.router, "/api/leads/send-quote-otp", json!({ "userPhone": CUSTOMER })).await;
    let fresh = last_sms_code(&app).await;
    let (status, _) = post_json(
        &app.router,
        "/api/leads/verify-quote-otp",
        json!({ "userPhone": CUSTOMER, "otp": fresh }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reviews_are_rated_by_users_and_averaged() {
    let app = test_app(RunMode::Development).await;
    seed_garage(&app, 4_821_937, "Sharma Motors", OWNER).await;
    let (user_token, _) = login_as(&app.router, "/api/users", CUSTOMER).await;
    let (partner_token, _) = login_as(&app.router, "/api/partners", RIVAL).await;

    for rating in [5, 4] {
        let (status, body) = post_with_token(
            &app.router,
            "/api/reviews",
            json!({ "garageId": "4821937", "vehicleType": "Car", "rating": rating, "tags": [" quick ", ""] }),
            &user_token,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["garageName"], "Sharma Motors");
        assert_eq!(body["data"]["tags"], json!(["quick"]));
    }

    let (status, body) = post_with_token(
        &app.router,
        "/api/reviews",
        json!({ "garageId": "4821937", "vehicleType": "Car", "rating": 6 }),
        &user_token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = post_with_token(
        &app.router,
        "/api/reviews",
        json!({ "garageId": "4821937", "vehicleType": "Car", "rating": 3 }),
        &partner_token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = get_json(&app.router, "/api/reviews/garage/4821937").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["averageRating"], 4.5);
}

#[tokio::test]
async fn every_qr_scan_is_counted() {
    let app = test_app(RunMode::Development).await;
    seed_garage(&app, 4_821_937, "Sharma Motors", OWNER).await;

    for expected in 1..=2 {
        let (status, body) = get_json(&app.router, "/api/partners/public/4821937").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["garage"]["scanCount"], expected);
    }

    // plain lookups leave the counter alone
    let (status, body) = get_json(&app.router, "/api/partners/4821937").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["scanCount"], 2);
    assert_eq!(body["data"]["name"], "Sharma Motors");

    let (status, _) = get_json(&app.router, "/api/partners/public/9999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn partner_picks_services_from_the_menu() {
    let app = test_app(RunMode::Development).await;
    let (token, partner) = login_as(&app.router, "/api/partners", OWNER).await;
    let garage_id = partner["garageId"].as_i64().unwrap();

    let (status, body) = get_json(&app.router, "/api/partners/getAllServises").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 6);

    let (status, _) = patch_with_token(
        &app.router,
        "/api/partners/updatePartnerServices",
        json!({ "services": [{
            "categoryName": "Body & Paint",
            "subServices": [{ "name": "Dent Repair", "selected": true }]
        }] }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(&app.router, &format!("/api/partners/services/selected/{}", garage_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([{
            "categoryName": "Body & Paint",
            "subServices": [{ "name": "Dent Repair", "selected": true }]
        }])
    );

    let (_, body) = get_json(&app.router, &format!("/api/partners/services/unselected/{}", garage_id)).await;
    let unselected: usize = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["subServices"].as_array().unwrap().len())
        .sum();
    let (_, menu) = get_json(&app.router, &format!("/api/partners/services/getAllPartnerServices/{}", garage_id)).await;
    let total: usize = menu["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["subServices"].as_array().unwrap().len())
        .sum();
    assert_eq!(unselected, total - 1);

    let (status, _) = patch_with_token(
        &app.router,
        "/api/partners/updatePartnerServices",
        json!({ "services": [{
            "categoryName": "Body & Paint",
            "subServices": [{ "name": "Nitrogen Fill", "selected": true }]
        }] }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn brand_selection_is_checked_against_the_free_limit() {
    let app = test_app(RunMode::Development).await;
    let (token, _) = login_as(&app.router, "/api/partners", OWNER).await;

    let (status, body) = get_json(&app.router, "/api/partners/brandsAvailable").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["carBrands"].as_array().unwrap().contains(&json!("Audi")));

    let (status, body) = patch_with_token(
        &app.router,
        "/api/partners/updatePartnerBrands",
        json!({ "carBrands": ["Audi", "BMW", "Audi"] }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["brands"]["carBrands"], json!(["Audi", "BMW"]));

    let (status, _) = patch_with_token(
        &app.router,
        "/api/partners/updatePartnerBrands",
        json!({ "bikeBrands": ["Vespa"] }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_with_token(&app.router, "/api/partners/check-limit", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["selected"], 2);
    assert_eq!(body["data"]["limit"], 50);
    assert_eq!(body["data"]["remaining"], 48);

    let (status, body) = get_with_token(&app.router, "/api/partners/my-brands", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["brands"]["bikeBrands"], json!([]));
}

#[tokio::test]
async fn quick_reviews_need_no_login() {
    let app = test_app(RunMode::Development).await;
    seed_garage(&app, 4_821_937, "Sharma Motors", OWNER).await;

    for rating in [4, 5] {
        let (status, body) = post_json(
            &app.router,
            "/api/quick-reviews/addQuickReview",
            json!({ "garageId": "4821937", "vehicle": "Activa", "rating": rating, "reviewerName": "Ravi" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["reviewType"], "quickReview");
        assert_eq!(body["data"]["garageName"], "Sharma Motors");
    }

    let (status, body) = get_json(&app.router, "/api/quick-reviews/4821937").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["garage"]["garageName"], "Sharma Motors");
    assert_eq!(body["count"], 2);
    assert_eq!(body["averageRating"], 4.5);

    let (_, body) = get_json(&app.router, "/api/quick-reviews/getAllQuickReview").await;
    assert_eq!(body["count"], 2);

    let (status, _) = post_json(
        &app.router,
        "/api/quick-reviews/addQuickReview",
        json!({ "garageId": "9999999", "vehicle": "Activa", "rating": 4 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn directory_counts_lists_and_searches_garages() {
    let app = test_app(RunMode::Development).await;
    seed_garage(&app, 4_000_001, "Speedy Car Wash", OWNER).await;
    let mut bike = seed_garage(&app, 4_000_002, "Two Wheeler Hub", RIVAL).await;
    bike.vehicle_types = vec![VehicleType::Bike];
    app.store.put(Account::Partner(bike)).await;

    let (status, body) = get_json(&app.router, "/api/partners/count").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = get_json(&app.router, "/api/partners/getAllPartners?vehicleType=Bike").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], 4_000_002);

    let (status, _) = get_json(&app.router, "/api/partners/search?query=wash").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, _) = login_as(&app.router, "/api/users", CUSTOMER).await;
    let (status, body) = get_with_token(&app.router, "/api/partners/search?query=wash&limit=5", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["data"][0]["name"], "Speedy Car Wash");
}

#[tokio::test]
async fn kyc_keeps_a_masked_aadhaar() {
    let app = test_app(RunMode::Development).await;
    let (token, _) = login_as(&app.router, "/api/partners", OWNER).await;

    let (status, body) = get_with_token(&app.router, "/api/partners/kyc-status", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "not_submitted");

    let (status, _) = patch_with_token(
        &app.router,
        "/api/partners/partnerKYC",
        json!({ "aadhaarNumber": "1234-5678" }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = patch_with_token(
        &app.router,
        "/api/partners/partnerKYC",
        json!({ "aadhaarNumber": "123456789012" }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["aadhaarMasked"], "XXXX-XXXX-9012");

    let (_, body) = get_with_token(&app.router, "/api/partners/kyc-status", &token).await;
    assert_eq!(body["data"]["status"], "pending");
    assert!(!body.to_string().contains("123456789012"));
}
