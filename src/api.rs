use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::app::{App, AppError, CurrentCard, DeckListing, GradeReport, RatingReport, SessionProgress};
use crate::error::StudyError;
use crate::models::Outcome;

#[derive(Clone)]
pub struct ApiState {
    pub app: Arc<Mutex<App>>,
}

impl ApiState {
    pub fn new(app: App) -> Self {
        Self {
            app: Arc::new(Mutex::new(app)),
        }
    }
}

/// JSON body extractor whose rejections answer with the API's error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
struct ApiJson<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
struct ApiPath<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
struct ApiQuery<T>(T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

pub fn app_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/decks", get(list_decks))
        .route("/api/decks/:deck_id/sessions", post(start_session))
        .route("/api/decks/:deck_id/rating", post(rate_deck))
        .route("/api/sessions/:id", get(session_progress).delete(end_session))
        .route("/api/sessions/:id/current", get(current_card))
        .route("/api/sessions/:id/grade", post(grade))
        .route("/api/sessions/:id/advance", post(advance))
        .route("/api/sessions/:id/retreat", post(retreat))
        .route("/api/sessions/:id/remediation", post(start_remediation))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Study(err) => {
                let status = match err {
                    StudyError::EmptyDeck | StudyError::InvalidRating(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    StudyError::SessionComplete | StudyError::NoMissedCards => StatusCode::CONFLICT,
                };
                (status, err.kind())
            }
            AppError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            AppError::DeckNotFound(_) => (StatusCode::NOT_FOUND, "deck_not_found"),
            AppError::InvalidRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_request"),
            AppError::Store(err) => {
                log::error!("Store error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
        };

        let body = json!({ "error": kind, "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct DeckQuery {
    owner: Option<Uuid>,
}

async fn list_decks(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<DeckQuery>,
) -> Result<Json<Vec<DeckListing>>, AppError> {
    let app = state.app.lock().await;
    Ok(Json(app.deck_summaries(query.owner).await?))
}

async fn start_session(
    State(state): State<ApiState>,
    ApiPath(deck_id): ApiPath<Uuid>,
) -> Result<(StatusCode, Json<SessionProgress>), AppError> {
    let mut app = state.app.lock().await;
    let progress = app.start_session(deck_id).await?;
    Ok((StatusCode::CREATED, Json(progress)))
}

#[derive(Deserialize)]
struct RateRequest {
    user_id: Uuid,
    rating: i64,
    comment: Option<String>,
}

async fn rate_deck(
    State(state): State<ApiState>,
    ApiPath(deck_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<RateRequest>,
) -> Result<Json<RatingReport>, AppError> {
    let app = state.app.lock().await;
    let report = app
        .rate_deck(payload.user_id, deck_id, payload.rating, payload.comment)
        .await?;
    Ok(Json(report))
}

async fn session_progress(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SessionProgress>, AppError> {
    let mut app = state.app.lock().await;
    Ok(Json(app.progress(id)?))
}

async fn end_session(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SessionProgress>, AppError> {
    let mut app = state.app.lock().await;
    Ok(Json(app.end_session(id)?))
}

async fn current_card(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CurrentCard>, AppError> {
    let mut app = state.app.lock().await;
    Ok(Json(app.current_card(id)?))
}

#[derive(Deserialize)]
struct GradeRequest {
    outcome: Outcome,
}

async fn grade(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<GradeRequest>,
) -> Result<Json<GradeReport>, AppError> {
    let mut app = state.app.lock().await;
    Ok(Json(app.grade(id, payload.outcome).await?))
}

async fn advance(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SessionProgress>, AppError> {
    let mut app = state.app.lock().await;
    Ok(Json(app.advance(id)?))
}

async fn retreat(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SessionProgress>, AppError> {
    let mut app = state.app.lock().await;
    Ok(Json(app.retreat(id)?))
}

async fn start_remediation(
    State(state): State<ApiState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<(StatusCode, Json<SessionProgress>), AppError> {
    let mut app = state.app.lock().await;
    let progress = app.start_remediation(id)?;
    Ok((StatusCode::CREATED, Json(progress)))
}
