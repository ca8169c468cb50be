//! Purpose: Provide the HTTP resource API for phone-to-address records.
//! Exports: `ServeConfig`, `Backend`, `AppState`, `serve`.
//! Role: Axum server composing validation, preconditions, and DAO calls.
//! Invariants: Preconditions run strictly before any mutating DAO call.
//! Invariants: Store failures surface only as status codes, never as panics.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use addrbook::api::{
    Error, ErrorKind, KvClient, MemoryStore, RecordDao, Store, StoreConn, StoreSettings,
    validate_address, validate_phone,
};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub backend: Backend,
    pub default_ttl_secs: u64,
    pub refresh_ttl_on_update: bool,
}

#[derive(Clone, Debug)]
pub enum Backend {
    Redis(StoreSettings),
    Memory,
}

pub struct AppState {
    dao: RecordDao,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let store = match &config.backend {
        Backend::Redis(settings) => Store::Redis(StoreConn::connect(settings).await),
        Backend::Memory => Store::Memory(MemoryStore::new()),
    };
    if !store.is_available() {
        tracing::warn!("key-value store is unavailable; requests will degrade to misses");
    }
    let client = KvClient::new(store, config.default_ttl_secs);
    let dao = RecordDao::new(client, config.refresh_ttl_on_update);
    let state = Arc::new(AppState { dao });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    tracing::info!(bind = %config.bind, "address-book service listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if config.default_ttl_secs == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("default TTL must be greater than zero")
            .with_hint("Use a positive number of seconds like 3600."));
    }
    if let Backend::Redis(settings) = &config.backend {
        if settings.host.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("store host must not be empty"));
        }
    }
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/address-book/health", get(health))
        .route("/address-book/get-address/:phone", get(get_address))
        .route("/address-book/create-address", post(create_address))
        .route("/address-book/update-address/:phone", patch(update_address))
        .route("/address-book/delete-address/:phone", delete(delete_address))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

#[derive(Debug, Deserialize)]
struct CreateAddressRequest {
    phone: String,
    address: String,
}

#[derive(Debug, Default, Deserialize)]
struct UpdateAddressRequest {
    address: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

async fn health() -> Response {
    (StatusCode::OK, "Okay").into_response()
}

async fn get_address(
    State(state): State<Arc<AppState>>,
    AxumPath(phone): AxumPath<String>,
) -> Response {
    if let Err(err) = validate_phone(&phone) {
        return error_response(err);
    }
    if !state.dao.exists(&phone).await {
        return error_response(not_found(&phone));
    }
    match state.dao.fetch(&phone).await {
        Some(record) => json_response(record),
        // The record can expire between the existence probe and the read.
        None => error_response(not_found(&phone)),
    }
}

async fn create_address(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAddressRequest>,
) -> Response {
    if let Err(err) = validate_phone(&payload.phone) {
        return error_response(err);
    }
    if let Err(err) = validate_address(&payload.address) {
        return error_response(err);
    }
    if state.dao.exists(&payload.phone).await {
        return error_response(
            Error::new(ErrorKind::AlreadyExists)
                .with_message("phone already exists")
                .with_key(payload.phone.as_str()),
        );
    }
    let record = json!({ "phone": payload.phone, "address": payload.address });
    if !state.dao.create(&payload.phone, &record, None).await {
        return error_response(store_failure("failed to create record", &payload.phone));
    }
    (StatusCode::CREATED, Json(json!({ "message": "Created" }))).into_response()
}

async fn update_address(
    State(state): State<Arc<AppState>>,
    AxumPath(phone): AxumPath<String>,
    Json(payload): Json<UpdateAddressRequest>,
) -> Response {
    if let Err(err) = validate_phone(&phone) {
        return error_response(err);
    }
    let mut patch = Map::new();
    if let Some(address) = payload.address {
        if let Err(err) = validate_address(&address) {
            return error_response(err);
        }
        patch.insert("address".to_string(), Value::String(address));
    }
    if patch.is_empty() {
        return error_response(
            Error::new(ErrorKind::Usage).with_message("update body contains no fields to change"),
        );
    }
    if !state.dao.exists(&phone).await {
        return error_response(not_found(&phone));
    }
    if !state.dao.update(&phone, &patch, None).await {
        return error_response(store_failure("failed to update record", &phone));
    }
    match state.dao.fetch(&phone).await {
        Some(record) => json_response(record),
        None => error_response(store_failure("updated record could not be read back", &phone)),
    }
}

async fn delete_address(
    State(state): State<Arc<AppState>>,
    AxumPath(phone): AxumPath<String>,
) -> Response {
    if let Err(err) = validate_phone(&phone) {
        return error_response(err);
    }
    if !state.dao.exists(&phone).await {
        return error_response(not_found(&phone));
    }
    if !state.dao.delete(&phone).await {
        return error_response(store_failure("failed to delete record", &phone));
    }
    StatusCode::NO_CONTENT.into_response()
}

fn not_found(phone: &str) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("phone not found")
        .with_key(phone)
}

fn store_failure(message: &str, phone: &str) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message(message)
        .with_key(phone)
        .with_hint("Check store availability in the service logs.")
}

fn json_response(payload: Value) -> Response {
    Json(payload).into_response()
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Internal
        | ErrorKind::Unavailable
        | ErrorKind::Serialization
        | ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            key: err.key().map(str::to_string),
            hint: err.hint().map(str::to_string),
        },
    };
    (status, Json(body)).into_response()
}
