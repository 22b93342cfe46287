#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};

use common::{TestContext, get, post};
use intern_portal::model::role::Role;

#[actix_web::test]
async fn clock_in_and_out_computes_hours_and_status() {
    let ctx = TestContext::new();
    let app = portal_app!(ctx);
    let token = ctx.token(7, Role::Intern);

    let req = post("/api/attendance/login", &token)
        .set_json(json!({ "userId": 7, "clientTime": "1767258000000" }))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(session["userId"], 7);
    assert_eq!(session["loginTime"], "1767258000000");
    assert!(session["logoutTime"].is_null());
    let id = session["id"].as_u64().unwrap();

    let req = post("/api/attendance/logout", &token)
        .set_json(json!({ "attendanceId": id, "clientTime": "1767272400000" }))
        .to_request();
    let closed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(closed["logoutTime"], "1767272400000");
    assert_eq!(closed["workingHours"], "4.00");
    assert_eq!(closed["status"], "present");

    // a shorter session the same day is a half day
    let req = post("/api/attendance/login", &token)
        .set_json(json!({ "userId": 7, "clientTime": "2026-01-01T14:00:00Z" }))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    let req = post("/api/attendance/logout", &token)
        .set_json(json!({
            "attendanceId": session["id"],
            "clientTime": "2026-01-01T15:30:00Z"
        }))
        .to_request();
    let closed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(closed["workingHours"], "1.50");
    assert_eq!(closed["status"], "half-day");
}

#[actix_web::test]
async fn logout_is_idempotent() {
    let ctx = TestContext::new();
    let app = portal_app!(ctx);
    let token = ctx.token(7, Role::Intern);

    let req = post("/api/attendance/login", &token)
        .set_json(json!({ "userId": 7, "clientTime": "1767258000000" }))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;

    let logout = |time: &str| {
        post("/api/attendance/logout", &token)
            .set_json(json!({ "attendanceId": session["id"], "clientTime": time }))
            .to_request()
    };
    let first: Value = test::call_and_read_body_json(&app, logout("1767265200000")).await;
    let second: Value = test::call_and_read_body_json(&app, logout("1767290000000")).await;
    assert_eq!(first, second);
    assert_eq!(second["workingHours"], "2.00");
}

#[actix_web::test]
async fn missing_ids_are_bad_requests() {
    let ctx = TestContext::new();
    let app = portal_app!(ctx);
    let token = ctx.token(7, Role::Intern);

    let req = post("/api/attendance/login", &token)
        .set_json(json!({ "clientTime": "1767258000000" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "userId is required");

    let req = post("/api/attendance/logout", &token)
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "attendanceId is required");
}

#[actix_web::test]
async fn logout_of_unknown_session_is_a_server_error() {
    let ctx = TestContext::new();
    let app = portal_app!(ctx);
    let token = ctx.token(7, Role::Intern);

    let req = post("/api/attendance/logout", &token)
        .set_json(json!({ "attendanceId": 999 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("999"));
}

#[actix_web::test]
async fn second_login_closes_the_first_session() {
    let ctx = TestContext::new();
    let app = portal_app!(ctx);
    let token = ctx.token(7, Role::Intern);

    for time in ["1767258000000", "1767265200000"] {
        let req = post("/api/attendance/login", &token)
            .set_json(json!({ "userId": 7, "clientTime": time }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let history: Value =
        test::call_and_read_body_json(&app, get("/api/attendance/7", &token).to_request()).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    let open: Vec<_> = history.iter().filter(|s| s["logoutTime"].is_null()).collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["loginTime"], "1767265200000");

    let closed = history.iter().find(|s| !s["logoutTime"].is_null()).unwrap();
    assert_eq!(closed["logoutTime"], "1767265200000");
    assert_eq!(closed["workingHours"], "2.00");

    let active: Value = test::call_and_read_body_json(
        &app,
        get("/api/attendance/7/active", &token).to_request(),
    )
    .await;
    assert_eq!(active["loginTime"], "1767265200000");
}

#[actix_web::test]
async fn interns_cannot_act_for_others() {
    let ctx = TestContext::new();
    let app = portal_app!(ctx);
    let intern = ctx.token(7, Role::Intern);
    let admin = ctx.token(1, Role::Admin);

    let req = post("/api/attendance/login", &intern)
        .set_json(json!({ "userId": 8 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = get("/api/attendance/8", &intern).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    // admins may clock anyone in, and the owner cannot be impersonated on logout
    let req = post("/api/attendance/login", &admin)
        .set_json(json!({ "userId": 8, "clientTime": "1767258000000" }))
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;

    let req = post("/api/attendance/logout", &intern)
        .set_json(json!({ "attendanceId": session["id"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn requests_without_token_are_rejected() {
    let ctx = TestContext::new();
    let app = portal_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/attendance/login")
        .peer_addr(common::peer())
        .set_json(json!({ "userId": 7 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = post("/api/attendance/login", "not-a-jwt")
        .set_json(json!({ "userId": 7 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_views_grouped_and_detailed_attendance() {
    let ctx = TestContext::new();
    let app = portal_app!(ctx);
    let admin = ctx.token(1, Role::Admin);
    let intern = ctx.token(7, Role::Intern);

    for (login, logout) in [
        ("1767258000000", "1767265200000"),
        ("1767268800000", "1767276000000"),
    ] {
        let req = post("/api/attendance/login", &intern)
            .set_json(json!({ "userId": 7, "clientTime": login }))
            .to_request();
        let session: Value = test::call_and_read_body_json(&app, req).await;
        let req = post("/api/attendance/logout", &intern)
            .set_json(json!({ "attendanceId": session["id"], "clientTime": logout }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = get("/api/admin/attendance/grouped", &intern).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let grouped: Value = test::call_and_read_body_json(
        &app,
        get("/api/admin/attendance/grouped", &admin).to_request(),
    )
    .await;
    let rows = grouped.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["sessionCount"], 2);
    assert_eq!(rows[0]["status"], "present");
    let date = rows[0]["date"].as_str().unwrap().to_string();

    let details: Value = test::call_and_read_body_json(
        &app,
        get(
            &format!("/api/admin/attendance/details?userId=7&date={date}"),
            &admin,
        )
        .to_request(),
    )
    .await;
    let sessions = details.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["loginTime"], "1767258000000");

    let req = get("/api/admin/attendance/details?userId=7", &admin).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
