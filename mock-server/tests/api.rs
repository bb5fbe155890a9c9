use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with_store, Client, Enrollment, Envelope, Program, Store};
use serde_json::{json, Value};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<String> {
    json_request(method, uri, Some(token), "")
}

fn client_body(first_name: &str, date_of_birth: &str) -> String {
    json!({
        "first_name": first_name,
        "last_name": "Doe",
        "date_of_birth": date_of_birth,
        "gender": "Female"
    })
    .to_string()
}

fn seeded() -> Router {
    let mut store = Store::default();
    store.seed_demo().unwrap();
    app_with_store(store)
}

type App = axum::routing::RouterIntoService<String>;

async fn call(app: &mut App, req: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(req).await.unwrap()
}

async fn login(app: &mut App) -> String {
    let resp = call(
        app,
        json_request(
            "POST",
            "/api/doctors/login",
            None,
            r#"{"username":"doc1","password":"password123"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "Login successful");
    body["data"]["token"].as_str().unwrap().to_string()
}

// --- auth ---

#[tokio::test]
async fn login_with_wrong_password_returns_401() {
    let resp = seeded()
        .oneshot(json_request(
            "POST",
            "/api/doctors/login",
            None,
            r#"{"username":"doc1","password":"wrongpass"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "Invalid username or password"}));
}

#[tokio::test]
async fn signup_returns_201_with_profile() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/doctors",
            None,
            r#"{"username":"doc9","password":"pw","email":"doc9@example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["data"]["username"], "doc9");
    assert_eq!(body["data"]["role"], "doctor");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn signup_missing_email_returns_400() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/doctors",
            None,
            r#"{"username":"doc9","password":"pw"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "email is required");
}

#[tokio::test]
async fn missing_token_returns_401_error() {
    let resp = app()
        .oneshot(json_request("GET", "/api/clients", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "Authorization token is missing"}));
}

#[tokio::test]
async fn unknown_token_returns_401_message() {
    let resp = app()
        .oneshot(authed("GET", "/api/programs", "not-a-session"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"message": "Invalid token"}));
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let mut app = seeded().into_service();
    let token = login(&mut app).await;

    let resp = call(&mut app, authed("POST", "/api/doctors/logout", &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, authed("GET", "/api/programs", &token)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- validation ---

#[tokio::test]
async fn create_client_bad_date_returns_400() {
    let mut app = seeded().into_service();
    let token = login(&mut app).await;

    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/clients",
            Some(&token),
            &client_body("Jane", "1990/01/01"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "Invalid date format. Use YYYY-MM-DD");
}

#[tokio::test]
async fn malformed_json_returns_400_error_envelope() {
    let mut app = seeded().into_service();
    let token = login(&mut app).await;

    let resp = call(
        &mut app,
        json_request("POST", "/api/programs", Some(&token), "{not json"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn duplicate_program_returns_409() {
    let mut app = seeded().into_service();
    let token = login(&mut app).await;

    let resp = call(
        &mut app,
        json_request("POST", "/api/programs", Some(&token), r#"{"name":"HIV Care"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "Program with this name already exists");
}

#[tokio::test]
async fn get_client_not_found() {
    let mut app = seeded().into_service();
    let token = login(&mut app).await;

    let resp = call(&mut app, authed("GET", "/api/clients/42", &token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "Client not found");
}

// --- full lifecycle ---

#[tokio::test]
async fn enrollment_lifecycle() {
    let mut app = seeded().into_service();
    let token = login(&mut app).await;

    // create client
    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/clients",
            Some(&token),
            &client_body("Jane", "1990-01-01"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Envelope<Client> = body_json(resp).await;
    let client_id = created.data.id;

    // programs come from the seed
    let resp = call(&mut app, authed("GET", "/api/programs", &token)).await;
    let programs: Envelope<Vec<Program>> = body_json(resp).await;
    assert_eq!(programs.data.len(), 2);
    let program_ids: Vec<u64> = programs.data.iter().map(|p| p.id).collect();

    // enroll in both
    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/enrollments",
            Some(&token),
            &json!({"client_id": client_id, "program_ids": program_ids}).to_string(),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let enrolled: Envelope<Vec<Enrollment>> = body_json(resp).await;
    assert_eq!(enrolled.data.len(), 2);
    assert!(enrolled.data.iter().all(|e| e.status == "active"));

    // profile lists both programs
    let resp = call(&mut app, authed("GET", &format!("/api/clients/{client_id}"), &token)).await;
    let profile: Envelope<Client> = body_json(resp).await;
    assert_eq!(profile.data.programs.len(), 2);

    // unenroll from the first
    let uri = format!("/api/enrollments/{client_id}/{}", program_ids[0]);
    let resp = call(&mut app, authed("DELETE", &uri, &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // again: gone
    let resp = call(&mut app, authed("DELETE", &uri, &token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "Enrollment not found");

    let resp = call(&mut app, authed("GET", "/api/enrollments", &token)).await;
    let remaining: Envelope<Vec<Enrollment>> = body_json(resp).await;
    assert_eq!(remaining.data.len(), 1);
    assert_eq!(remaining.data[0].program_id, program_ids[1]);

    // deleting the client removes its enrollments
    let uri = format!("/api/clients/{client_id}");
    let resp = call(&mut app, authed("DELETE", &uri, &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = call(&mut app, authed("GET", "/api/enrollments", &token)).await;
    let remaining: Envelope<Vec<Enrollment>> = body_json(resp).await;
    assert!(remaining.data.is_empty());
}

#[tokio::test]
async fn search_returns_a_page() {
    let mut app = seeded().into_service();
    let token = login(&mut app).await;

    for first in ["Amina", "Aminata", "Baraka"] {
        let body = json!({
            "first_name": first,
            "last_name": "Otieno",
            "date_of_birth": "2001-05-06",
            "gender": "Female"
        });
        let resp = call(
            &mut app,
            json_request("POST", "/api/clients", Some(&token), &body.to_string()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = call(
        &mut app,
        authed("GET", "/api/clients/search?query=amin&per_page=1", &token),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["pages"], 2);
    assert_eq!(body["data"]["current_page"], 1);
    assert_eq!(body["data"]["items"][0]["first_name"], "Amina");
}
