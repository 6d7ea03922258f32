mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{get_with_token, post_json, send, test_app, test_app_with, RecordingMessenger};
use garage_api::config::RunMode;
use garage_api::models::account::{AccountType, ContactId};
use garage_api::services::account_store::AccountStore;
use garage_api::services::messaging::Channel;

const PHONE: &str = "+911234567890";

async fn login(router: &axum::Router, uri_prefix: &str) -> String {
    let (status, _) = post_json(router, &format!("{}/request-otp", uri_prefix), json!({ "phone": PHONE })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        router,
        &format!("{}/verify-otp", uri_prefix),
        json!({ "phone": PHONE, "otp": "12345" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn new_phone_is_registered_as_user_and_gets_a_code() {
    let app = test_app(RunMode::Development).await;

    let (status, body) = post_json(
        &app.router,
        "/api/auth/request-otp",
        json!({ "phone": PHONE, "accountType": "user" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["accountType"], "user");
    assert_eq!(body["isNewAccount"], true);
    assert_eq!(body["mode"], "development");
    assert_eq!(body["otp"], "12345");
    assert_eq!(body["expiresIn"], "10 minutes");
    assert_eq!(app.store.count(AccountType::User).await, 1);

    let sent = app.messenger.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel, Channel::Sms);
    assert_eq!(sent[0].to, PHONE);
    assert!(sent[0].body.contains("12345"));
}

#[tokio::test]
async fn second_request_reuses_the_account() {
    let app = test_app(RunMode::Development).await;
    post_json(&app.router, "/api/auth/request-otp", json!({ "phone": PHONE })).await;

    let (status, body) = post_json(&app.router, "/api/auth/request-otp", json!({ "phone": PHONE })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isNewAccount"], false);
    assert_eq!(app.store.count(AccountType::User).await, 1);
}

#[tokio::test]
async fn partner_phone_requested_as_user_conflicts() {
    let app = test_app(RunMode::Development).await;
    app.store
        .create(AccountType::Partner, &ContactId::Phone(PHONE.into()))
        .await
        .unwrap();

    let (status, body) = post_json(
        &app.router,
        "/api/auth/request-otp",
        json!({ "phone": PHONE, "accountType": "user" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "ACCOUNT_TYPE_CONFLICT");
    assert_eq!(body["existingAccountType"], "partner");
    assert_eq!(app.store.count(AccountType::User).await, 0);
    assert!(app.messenger.sent().await.is_empty());
}

#[tokio::test]
async fn user_email_requested_through_partner_alias_conflicts() {
    let app = test_app(RunMode::Development).await;
    post_json(&app.router, "/api/users/request-otp", json!({ "email": "Ravi@Mail.com" })).await;

    let (status, body) =
        post_json(&app.router, "/api/partners/request-otp", json!({ "email": "ravi@mail.com" })).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["existingAccountType"], "user");
    assert_eq!(app.store.count(AccountType::Partner).await, 0);
}

#[tokio::test]
async fn missing_identifier_is_a_validation_error() {
    let app = test_app(RunMode::Development).await;

    let (status, body) = post_json(&app.router, "/api/auth/request-otp", json!({ "accountType": "user" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn dev_code_verifies_and_token_opens_me() {
    let app = test_app(RunMode::Development).await;
    let token = login(&app.router, "/api/auth").await;

    let (status, body) = get_with_token(&app.router, "/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accountType"], "user");
    assert_eq!(body["account"]["phone"], PHONE);
    assert_eq!(body["account"]["isVerified"], true);
}

#[tokio::test]
async fn verify_response_carries_account_summary() {
    let app = test_app(RunMode::Development).await;
    post_json(&app.router, "/api/partners/request-otp", json!({ "phone": PHONE })).await;

    let (status, body) = post_json(
        &app.router,
        "/api/auth/verify-otp",
        json!({ "phone": PHONE, "otp": "12345" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accountType"], "partner");
    assert!(body["token"].as_str().unwrap().len() > 20);
    assert!(body["account"]["garageId"].as_i64().is_some());
    assert_eq!(body["account"]["isVerified"], true);
}

#[tokio::test]
async fn production_hides_the_code_and_rejects_wrong_ones() {
    let app = test_app(RunMode::Production).await;

    let (status, body) = post_json(&app.router, "/api/auth/request-otp", json!({ "phone": PHONE })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "production");
    assert!(body.get("otp").is_none());

    let sent = app.messenger.sent().await;
    let code: String = sent[0].body.chars().filter(|c| c.is_ascii_digit()).take(5).collect();
    let wrong = if code == "99999" { "10000" } else { "99999" };

    let (status, body) = post_json(
        &app.router,
        "/api/auth/verify-otp",
        json!({ "phone": PHONE, "otp": wrong }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_OR_EXPIRED_OTP");

    // the test code means nothing in production
    if code != "12345" {
        let (status, _) = post_json(
            &app.router,
            "/api/auth/verify-otp",
            json!({ "phone": PHONE, "otp": "12345" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = post_json(
        &app.router,
        "/api/auth/verify-otp",
        json!({ "phone": PHONE, "otp": code }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn padded_code_still_verifies() {
    let app = test_app(RunMode::Development).await;
    post_json(&app.router, "/api/auth/request-otp", json!({ "phone": PHONE })).await;

    let (status, body) = post_json(
        &app.router,
        "/api/auth/verify-otp",
        json!({ "phone": PHONE, "otp": " 12345 " }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn unknown_identifier_cannot_verify() {
    let app = test_app(RunMode::Development).await;

    let (status, body) = post_json(
        &app.router,
        "/api/auth/verify-otp",
        json!({ "email": "nobody@garage.in", "otp": "12345" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ACCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn failed_delivery_reports_error_but_keeps_challenge() {
    let app = test_app_with(RunMode::Development, RecordingMessenger::failing()).await;

    let (status, body) = post_json(&app.router, "/api/auth/request-otp", json!({ "phone": PHONE })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DELIVERY_FAILED");

    let account = app
        .store
        .find_by_contact(AccountType::User, &ContactId::Phone(PHONE.into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.otp(), Some("12345"));
}

#[tokio::test]
async fn repeated_requests_are_rate_limited() {
    let app = test_app(RunMode::Development).await;

    for _ in 0..5 {
        let (status, _) = post_json(&app.router, "/api/auth/request-otp", json!({ "phone": PHONE })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = post_json(&app.router, "/api/auth/request-otp", json!({ "phone": PHONE })).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let app = test_app(RunMode::Development).await;

    let (status, _) = send(&app.router, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get_with_token(&app.router, "/api/auth/me", "not.a.token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn partner_routes_reject_user_tokens() {
    let app = test_app(RunMode::Development).await;
    let token = login(&app.router, "/api/users").await;

    let (status, body) = get_with_token(&app.router, "/api/partners/qr-code", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn partner_gets_qr_links_for_their_garage() {
    let app = test_app(RunMode::Development).await;
    let token = login(&app.router, "/api/partners").await;

    let (status, body) = get_with_token(&app.router, "/api/partners/qr-code", &token).await;
    assert_eq!(status, StatusCode::OK);

    let garage_id = body["data"]["garageId"].as_i64().unwrap();
    assert!((1_000_000..10_000_000).contains(&garage_id));
    assert_eq!(
        body["data"]["publicUrl"],
        format!("http://localhost:9002/api/partners/public/{}", garage_id)
    );
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = test_app(RunMode::Development).await;
    let (status, body) = send(&app.router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
