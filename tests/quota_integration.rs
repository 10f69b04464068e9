use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use quota_gate::api;
use quota_gate::app_state::AppState;
use quota_gate::config::{AccountingStrategy, AppConfig, StoreBackend};

fn test_config(max_member_storage: u64, strategy: AccountingStrategy) -> AppConfig {
    let mut config = AppConfig::default();
    config.store.backend = StoreBackend::Mock;
    config.quota.max_member_storage = max_member_storage;
    config.quota.strategy = strategy;
    config
}

macro_rules! test_app {
    ($config:expr) => {{
        let _ = env_logger::builder().is_test(true).try_init();
        let state = AppState::new_for_testing($config);
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(api::configure),
        )
        .await
    }};
}

fn create_request(id: &str, user: &str, size: Option<i64>) -> test::TestRequest {
    let metadata = match size {
        Some(size) => json!({ "file": { "size": size } }),
        None => json!({ "file": {} }),
    };
    test::TestRequest::post()
        .uri("/records")
        .insert_header(("User", user))
        .set_json(json!({ "id": id, "type": "file", "metadata": metadata }))
}

fn storage_request(user: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri("/members/current/storage")
        .insert_header(("User", user))
}

#[actix_web::test]
async fn test_create_within_limit_is_admitted() {
    let app = test_app!(test_config(100, AccountingStrategy::Derived));

    let resp = test::call_service(&app, create_request("r1", "alice", Some(50)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 50);
    assert_eq!(body["max_member_storage"], 100);
}

#[actix_web::test]
async fn test_create_over_limit_is_rejected_before_any_write() {
    let app = test_app!(test_config(100, AccountingStrategy::Derived));

    let resp = test::call_service(&app, create_request("r1", "alice", Some(90)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, create_request("r2", "alice", Some(20)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INSUFFICIENT_STORAGE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "STORAGE_EXCEEDED");

    // The rejected record was never stored and the total is unchanged
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/records/r2")
            .insert_header(("User", "alice"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 90);
}

#[actix_web::test]
async fn test_copy_over_limit_is_rejected() {
    let app = test_app!(test_config(100, AccountingStrategy::Derived));

    let resp = test::call_service(&app, create_request("r1", "alice", Some(90)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = test::call_service(&app, create_request("small", "bob", Some(20)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Alice holds 90 of 100; copying Bob's 20-byte record must fail for her
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/records/small/copy")
            .insert_header(("User", "alice"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INSUFFICIENT_STORAGE);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 90);
}

#[actix_web::test]
async fn test_copy_within_limit_charges_the_acting_member() {
    let app = test_app!(test_config(100, AccountingStrategy::Derived));

    let resp = test::call_service(&app, create_request("small", "bob", Some(20)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/records/small/copy")
            .insert_header(("User", "alice"))
            .set_json(json!({ "id": "alice-copy" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["owner_id"], "alice");

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 20);
}

#[actix_web::test]
async fn test_pending_upload_admitted_then_sized_by_update() {
    let app = test_app!(test_config(100, AccountingStrategy::Derived));

    let resp = test::call_service(&app, create_request("r1", "alice", Some(90)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // No size yet: admitted even at 90 of 100
    let resp = test::call_service(&app, create_request("pending", "alice", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 90);

    // Upload completion patches the size in
    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri("/records/pending")
            .insert_header(("User", "alice"))
            .set_json(json!({ "file": { "size": 5 } }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["metadata"]["file"]["size"], 5);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 95);
}

#[actix_web::test]
async fn test_delete_releases_storage() {
    let app = test_app!(test_config(100, AccountingStrategy::Derived));

    let resp = test::call_service(&app, create_request("r1", "alice", Some(50)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/records/r1")
            .insert_header(("User", "alice"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 0);

    // Deleting the same record again is a 404, not an underflow
    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/records/r1")
            .insert_header(("User", "alice"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn test_non_target_types_bypass_the_quota() {
    let app = test_app!(test_config(100, AccountingStrategy::Derived));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/records")
            .insert_header(("User", "alice"))
            .set_json(json!({
                "id": "big-folder",
                "type": "folder",
                "metadata": { "file": { "size": 5000 } }
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 0);
}

#[actix_web::test]
async fn test_counter_strategy_tracks_the_full_lifecycle() {
    let app = test_app!(test_config(100, AccountingStrategy::Counter));

    let resp = test::call_service(&app, create_request("r1", "alice", Some(40)).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = test::call_service(&app, create_request("r2", "alice", None).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri("/records/r2")
            .insert_header(("User", "alice"))
            .set_json(json!({ "file": { "size": 30 } }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 70);

    // An ordinary edit of the already-sized record must not double-count
    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri("/records/r2")
            .insert_header(("User", "alice"))
            .set_json(json!({ "file": { "size": 30, "name": "renamed.bin" } }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 70);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/records/r1")
            .insert_header(("User", "alice"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, storage_request("alice").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 30);
}

#[actix_web::test]
async fn test_missing_user_header_is_a_bad_request() {
    let app = test_app!(test_config(100, AccountingStrategy::Derived));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/records")
            .set_json(json!({ "id": "r1", "type": "file" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
