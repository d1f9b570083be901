//! HTTP API for issuing, listing and verifying license keys.

mod error;
mod schedule;

pub use error::{ApiError, ErrorBody, Violation};
pub use schedule::spawn_sweep;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use licensekey_engine::{LicenseAttributes, LicenseIssuer, LicenseVerifier, VerificationReport};
use licensekey_store::{LicenseRecord, LicenseStore, StoreResult};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::info;
use uuid::Uuid;

/// Shared state behind every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub issuer: LicenseIssuer,
    pub verifier: LicenseVerifier,
    pub store: LicenseStore,
    /// Verify every token right after issuing it and log the outcome.
    pub self_check: bool,
    /// Bounds concurrent key derivations; each one holds the full Argon2
    /// memory cost on a blocking thread.
    crypto_permits: Arc<Semaphore>,
}

/// Default number of issue/verify operations allowed to run at once.
pub const DEFAULT_CRYPTO_CONCURRENCY: usize = 8;

impl AppState {
    pub fn new(issuer: LicenseIssuer, store: LicenseStore) -> Self {
        Self {
            verifier: issuer.verifier(),
            issuer,
            store,
            self_check: false,
            crypto_permits: Arc::new(Semaphore::new(DEFAULT_CRYPTO_CONCURRENCY)),
        }
    }

    /// Replaces the issue/verify concurrency limit. A limit of zero is
    /// raised to one.
    pub fn with_crypto_limit(mut self, limit: usize) -> Self {
        self.crypto_permits = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    /// Number of issue/verify operations that could start right now.
    pub fn available_crypto_permits(&self) -> usize {
        self.crypto_permits.available_permits()
    }
}

/// A stored license key as returned to clients.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyResponse {
    pub id: Uuid,
    pub license_key: String,
}

impl From<LicenseRecord> for KeyResponse {
    fn from(record: LicenseRecord) -> Self {
        Self {
            id: record.id,
            license_key: record.license_key,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub product_id: String,
    pub license_key: String,
}

/// Runs a store operation on the blocking pool.
async fn with_store<T, F>(store: &LicenseStore, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&LicenseStore) -> StoreResult<T> + Send + 'static,
{
    let store = store.clone();
    let result = tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(ApiError::internal)?;
    Ok(result?)
}

/// Runs issue/verify work on the blocking pool once a permit is free. The
/// permit moves into the task, so it is held until the work finishes even if
/// the client disconnects.
async fn with_crypto_permit<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let permit = state
        .crypto_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(ApiError::internal)?;
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        op()
    })
    .await
    .map_err(ApiError::internal)
}

async fn list_keys(State(state): State<Arc<AppState>>) -> Result<Json<Vec<KeyResponse>>, ApiError> {
    let records = with_store(&state.store, |store| store.list()).await?;
    Ok(Json(records.into_iter().map(KeyResponse::from).collect()))
}

async fn create_key(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LicenseAttributes>, JsonRejection>,
) -> Result<(StatusCode, Json<KeyResponse>), ApiError> {
    let Json(attrs) = payload?;
    attrs.validate()?;

    let issuer = state.issuer.clone();
    let verifier = state.verifier.clone();
    let self_check = state.self_check;
    let to_issue = attrs.clone();
    let token = with_crypto_permit(&state, move || {
        if self_check {
            issuer
                .issue_with_self_check_blocking(&to_issue, &verifier)
                .map(|(token, _)| token)
        } else {
            issuer.issue_blocking(&to_issue)
        }
    })
    .await??;

    let expiry = attrs.expiry_date;
    let record = with_store(&state.store, move |store| store.insert(token.as_str(), expiry)).await?;
    info!("Issued license key {} for product {}", record.id, attrs.product_id);

    Ok((StatusCode::CREATED, Json(record.into())))
}

async fn get_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<KeyResponse>, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::bad_request("id", "Validation failed (uuid is expected)"))?;

    with_store(&state.store, move |store| store.get(id))
        .await?
        .map(|record| Json(record.into()))
        .ok_or_else(|| ApiError::not_found(format!("License key {id} not found")))
}

async fn verify_key(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerificationReport>, ApiError> {
    let Json(request) = payload?;
    let verifier = state.verifier.clone();
    let verification = with_crypto_permit(&state, move || {
        verifier.verify_blocking(&request.product_id, &request.license_key)
    })
    .await?;
    Ok(Json(verification.report()))
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/license-keys", get(list_keys).post(create_key))
        .route("/license-keys/verify", post(verify_key))
        .route("/license-keys/{id}", get(get_key))
        .with_state(state)
}
