use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fintrack_core::{
    models::{Ledger, LedgerDetail, LedgerError},
    storage::{StorageError, UserRepository},
};

use crate::{
    auth::{self, CurrentUser},
    session::{LedgerCache, SessionStore},
};

/// Everything the handlers need, owned by the serving process and
/// injected through axum state rather than ambient globals.
pub struct AppState {
    pub repository: Arc<dyn UserRepository>,
    pub sessions: SessionStore,
    pub ledgers: LedgerCache,
    pub cookie_name: String,
}

/// Suggested entry concepts. Advisory only: the ledger accepts any
/// free-text concept, these just seed the dashboard pickers.
pub const INCOME_CONCEPTS: &[&str] = &[
    "Salario",
    "Negocio",
    "Bonos",
    "Regalos",
    "Inversiones",
    "Venta de cosas",
    "Devoluciones",
    "Subsidios",
    "Otros",
];

pub const EXPENSE_CONCEPTS: &[&str] = &[
    "Comida",
    "Transporte",
    "Educación",
    "Salud",
    "Hogar",
    "Entretenimiento",
    "Ropa",
    "Viajes",
    "Mascotas",
    "Regalos",
    "Deudas",
    "Impuestos",
    "Servicios",
    "Tecnología",
    "Otros",
];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("please fill in every field")]
    IncompleteForm,
    #[error("amount must be a number greater than zero")]
    InvalidAmount,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidAmount => ApiError::InvalidAmount,
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::IncompleteForm | ApiError::InvalidAmount => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(StorageError::UserExists(_)) => StatusCode::CONFLICT,
            ApiError::Storage(StorageError::UnknownUser(_))
            | ApiError::Storage(StorageError::BadCredential) => StatusCode::UNAUTHORIZED,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                success: false,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

#[derive(Serialize)]
struct SessionBody {
    success: bool,
    username: String,
    detail: LedgerDetail,
}

#[derive(Serialize)]
struct ConceptsBody {
    #[serde(rename = "conceptos_ingreso")]
    income_concepts: &'static [&'static str],
    #[serde(rename = "conceptos_gasto")]
    expense_concepts: &'static [&'static str],
}

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EntryForm {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub concept: String,
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/dashboard", get(dashboard).post(add_entry))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/concepts", get(concepts))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn concepts() -> impl IntoResponse {
    Json(ConceptsBody {
        income_concepts: INCOME_CONCEPTS,
        expense_concepts: EXPENSE_CONCEPTS,
    })
}

async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let username = form.username.trim();
    let password = form.password.trim();
    if username.is_empty() || password.is_empty() {
        return ApiError::IncompleteForm.into_response();
    }
    match state.repository.register(username, password) {
        Ok(ledger) => establish_session(&state, username, ledger),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn login(State(state): State<Arc<AppState>>, Form(form): Form<CredentialsForm>) -> Response {
    let username = form.username.trim();
    let password = form.password.trim();
    if username.is_empty() || password.is_empty() {
        return ApiError::IncompleteForm.into_response();
    }
    match state.repository.authenticate(username, password) {
        Ok(ledger) => establish_session(&state, username, ledger),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| auth::cookie_value(cookies, &state.cookie_name))
    {
        state.sessions.close(&token);
    }
    // Expire the cookie client-side as well.
    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", state.cookie_name);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    match current_ledger(&state, &user.username) {
        Ok(ledger) => Json(SessionBody {
            success: true,
            username: user.username,
            detail: ledger.detail(),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn add_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<EntryForm>,
) -> Response {
    match apply_entry(&state, &user.username, form) {
        Ok(detail) => Json(SessionBody {
            success: true,
            username: user.username,
            detail,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

fn establish_session(state: &AppState, username: &str, ledger: Ledger) -> Response {
    let detail = ledger.detail();
    state.ledgers.put(username, ledger);
    let token = state.sessions.open(username);
    tracing::debug!(user = %username, "Session established");
    // No Max-Age: the cookie dies with the browser.
    let cookie = format!("{}={}; Path=/; HttpOnly", state.cookie_name, token);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SessionBody {
            success: true,
            username: username.to_string(),
            detail,
        }),
    )
        .into_response()
}

/// Live ledger for a username: cache hit, or re-hydrate from the backing
/// document (empty if the record is gone) and remember it.
fn current_ledger(state: &AppState, username: &str) -> Result<Ledger, ApiError> {
    if let Some(ledger) = state.ledgers.get(username) {
        return Ok(ledger);
    }
    let users = state.repository.load()?;
    let ledger = users
        .get(username)
        .map(|record| record.movements.clone())
        .unwrap_or_default();
    state.ledgers.put(username, ledger.clone());
    Ok(ledger)
}

/// Append one entry and flush. The mutation happens on a clone of the
/// cached ledger; the cache is only updated after the flush succeeds, so
/// a failed write leaves both cache and document at the prior state.
fn apply_entry(state: &AppState, username: &str, form: EntryForm) -> Result<LedgerDetail, ApiError> {
    let amount: Decimal = form
        .amount
        .trim()
        .parse()
        .map_err(|_| ApiError::InvalidAmount)?;

    let mut ledger = current_ledger(state, username)?;
    match form.kind {
        EntryKind::Income => ledger.add_income(amount, form.concept.trim())?,
        EntryKind::Expense => ledger.add_expense(amount, form.concept.trim())?,
    }

    state.repository.update_ledger(username, &ledger)?;
    let detail = ledger.detail();
    state.ledgers.put(username, ledger);
    Ok(detail)
}
