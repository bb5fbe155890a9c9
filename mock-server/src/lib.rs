pub mod store;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use store::{
    Client, ClientPage, DoctorProfile, Enrollment, Id, Program, Store, StoreError,
};
use store::{ClientInput, EnrollmentInput, LoginInput, ProgramInput, SignupInput};

pub const LOGIN_SUCCESS: &str = "Login successful";

pub type Db = Arc<RwLock<Store>>;

/// Successful response body: `{"message": .., "data": ..}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

fn ok<T: Serialize>(
    status: StatusCode,
    message: &str,
    data: T,
) -> (StatusCode, Json<Envelope<T>>) {
    (
        status,
        Json(Envelope {
            message: message.to_string(),
            data,
        }),
    )
}

/// Failure response. Most routes answer `{"error": ..}`; token checks answer
/// `{"message": ..}` the way the real backend's auth decorator does.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    field: &'static str,
    text: String,
}

impl ApiFailure {
    pub fn error(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status,
            field: "error",
            text: text.into(),
        }
    }

    pub fn message(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status,
            field: "message",
            text: text.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.field.to_string(), json!(self.text));
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiFailure {
    fn from(err: StoreError) -> Self {
        ApiFailure::error(err.status(), err.to_string())
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        ApiFailure::error(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

type ApiResult<T> = Result<T, ApiFailure>;

/// The doctor owning the request's bearer token.
pub struct CurrentDoctor {
    pub profile: DoctorProfile,
    pub token: String,
}

impl FromRequestParts<Db> for CurrentDoctor {
    type Rejection = ApiFailure;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ApiFailure::error(StatusCode::UNAUTHORIZED, "Authorization token is missing")
            })?;

        let store = db.read().await;
        let profile = store
            .doctor_for_token(token)
            .cloned()
            .ok_or_else(|| ApiFailure::message(StatusCode::UNAUTHORIZED, "Invalid token"))?;
        Ok(CurrentDoctor {
            profile,
            token: token.to_string(),
        })
    }
}

pub fn app() -> Router {
    app_with_store(Store::default())
}

pub fn app_with_store(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    let api = Router::new()
        .route("/doctors", post(signup))
        .route("/doctors/login", post(login))
        .route("/doctors/logout", post(logout))
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/search", get(search_clients))
        .route(
            "/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/programs", get(list_programs).post(create_program))
        .route(
            "/programs/{id}",
            get(get_program).put(update_program).delete(delete_program),
        )
        .route("/enrollments", get(list_enrollments).post(create_enrollment))
        .route(
            "/enrollments/{client_id}/{program_id}",
            delete(delete_enrollment),
        );
    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn serve(listener: TcpListener, store: Store) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock AfyaLink backend listening");
    }
    axum::serve(listener, app_with_store(store)).await
}

// --- doctors ---

async fn signup(
    State(db): State<Db>,
    input: Result<Json<SignupInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = input?;
    let profile = db.write().await.signup(input)?;
    info!(username = %profile.username, "doctor registered");
    Ok(ok(
        StatusCode::CREATED,
        "System user registered successfully",
        profile,
    ))
}

#[derive(Serialize)]
struct LoginData {
    token: String,
    user: DoctorProfile,
}

async fn login(
    State(db): State<Db>,
    input: Result<Json<LoginInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = input?;
    let (token, user) = db.write().await.login(input)?;
    info!(username = %user.username, "doctor logged in");
    Ok(ok(StatusCode::OK, LOGIN_SUCCESS, LoginData { token, user }))
}

async fn logout(State(db): State<Db>, doctor: CurrentDoctor) -> impl IntoResponse {
    db.write().await.logout(&doctor.token);
    info!(username = %doctor.profile.username, "doctor logged out");
    (
        StatusCode::OK,
        Json(json!({"message": "Logout successful"})),
    )
}

// --- clients ---

async fn list_clients(State(db): State<Db>, _: CurrentDoctor) -> impl IntoResponse {
    ok(StatusCode::OK, "Success", db.read().await.list_clients())
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

async fn search_clients(
    State(db): State<Db>,
    _: CurrentDoctor,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let page = db.read().await.search_clients(
        &params.query,
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(10),
    );
    ok(StatusCode::OK, "Success", page)
}

async fn get_client(
    State(db): State<Db>,
    _: CurrentDoctor,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let client = db.read().await.get_client(id)?;
    Ok(ok(StatusCode::OK, "Success", client))
}

async fn create_client(
    State(db): State<Db>,
    _: CurrentDoctor,
    input: Result<Json<ClientInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = input?;
    let client = db.write().await.create_client(input)?;
    info!(client_id = client.id, "client registered");
    Ok(ok(
        StatusCode::CREATED,
        "Client registered successfully",
        client,
    ))
}

async fn update_client(
    State(db): State<Db>,
    _: CurrentDoctor,
    Path(id): Path<Id>,
    input: Result<Json<ClientInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = input?;
    let client = db.write().await.update_client(id, input)?;
    Ok(ok(StatusCode::OK, "Client updated successfully", client))
}

async fn delete_client(
    State(db): State<Db>,
    _: CurrentDoctor,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    db.write().await.delete_client(id)?;
    info!(client_id = id, "client deleted");
    Ok(ok(StatusCode::OK, "Client deleted successfully", json!(null)))
}

// --- programs ---

async fn list_programs(State(db): State<Db>, _: CurrentDoctor) -> impl IntoResponse {
    ok(StatusCode::OK, "Success", db.read().await.list_programs())
}

async fn get_program(
    State(db): State<Db>,
    _: CurrentDoctor,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let program = db.read().await.get_program(id)?;
    Ok(ok(StatusCode::OK, "Success", program))
}

async fn create_program(
    State(db): State<Db>,
    _: CurrentDoctor,
    input: Result<Json<ProgramInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = input?;
    let program = db.write().await.create_program(input)?;
    info!(program_id = program.id, name = %program.name, "program created");
    Ok(ok(
        StatusCode::CREATED,
        "Program created successfully",
        program,
    ))
}

async fn update_program(
    State(db): State<Db>,
    _: CurrentDoctor,
    Path(id): Path<Id>,
    input: Result<Json<ProgramInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = input?;
    let program = db.write().await.update_program(id, input)?;
    Ok(ok(StatusCode::OK, "Program updated successfully", program))
}

async fn delete_program(
    State(db): State<Db>,
    _: CurrentDoctor,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    db.write().await.delete_program(id)?;
    info!(program_id = id, "program deleted");
    Ok(ok(StatusCode::OK, "Program deleted successfully", json!(null)))
}

// --- enrollments ---

async fn list_enrollments(State(db): State<Db>, _: CurrentDoctor) -> impl IntoResponse {
    ok(StatusCode::OK, "Success", db.read().await.list_enrollments())
}

async fn create_enrollment(
    State(db): State<Db>,
    _: CurrentDoctor,
    input: Result<Json<EnrollmentInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = input?;
    let enrollments = db.write().await.enroll(input)?;
    info!(count = enrollments.len(), "client enrolled");
    Ok(ok(
        StatusCode::CREATED,
        "Client enrolled successfully",
        enrollments,
    ))
}

async fn delete_enrollment(
    State(db): State<Db>,
    _: CurrentDoctor,
    Path((client_id, program_id)): Path<(Id, Id)>,
) -> ApiResult<impl IntoResponse> {
    db.write().await.unenroll(client_id, program_id)?;
    info!(client_id, program_id, "client unenrolled");
    Ok((
        StatusCode::OK,
        Json(json!({"message": "Client unenrolled successfully"})),
    ))
}
