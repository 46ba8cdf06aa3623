//! HTTP surface of the tang server.
//!
//! Two endpoints: `GET /adv[/{thp}]` serves signed advertisements and
//! `POST /rec/{thp}` performs the ECMR recovery. Handlers only do read-only
//! lookups against the shared [`KeySet`], so steady-state serving needs no
//! synchronization.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::jose::KeyUse;
use crate::keys::KeySet;
use crate::{Error, Result};

/// Largest request body accepted on `/rec/{thp}`; anything bigger is
/// answered with `413 Payload Too Large` before the recoverer runs.
pub const MAX_RECOVERY_BODY: usize = 64 * 1024;

const ADVERTISEMENT_CONTENT_TYPE: &str = "application/jose+json";
const RECOVERY_CONTENT_TYPE: &str = "application/jwk+json";

/// Everything the server needs, passed explicitly rather than read from the
/// environment.
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub keys: KeySet,
}

/// Bind and serve until interrupted; in-flight requests drain on shutdown.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let app = router(Arc::new(config.keys));
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    log::info!("tang server listening on {}", config.addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn router(keys: Arc<KeySet>) -> Router {
    Router::new()
        .route("/adv", get(default_advertisement).fallback(not_found))
        .route("/adv/", get(default_advertisement).fallback(not_found))
        .route("/adv/:thp", get(key_advertisement).fallback(not_found))
        .route("/rec/:thp", post(recover).fallback(not_found))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_RECOVERY_BODY))
        .with_state(keys)
}

async fn default_advertisement(State(keys): State<Arc<KeySet>>) -> Response {
    advertisement_response(keys.default_advertisement().to_vec())
}

/// `GET /adv/{thp}`: only signing keys are reachable here; exchange keys and
/// unknown thumbprints are indistinguishable 404s.
async fn key_advertisement(Path(thp): Path<String>, State(keys): State<Arc<KeySet>>) -> Response {
    let advertisement = keys
        .lookup(&thp)
        .filter(|key| key.key_use() == KeyUse::Sign)
        .and_then(|key| key.advertisement());
    match advertisement {
        Some(advertisement) => advertisement_response(advertisement.to_vec()),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn recover(
    Path(thp): Path<String>,
    State(keys): State<Arc<KeySet>>,
    body: Bytes,
) -> Response {
    match keys.recover(&thp, &body) {
        Ok(out) => ([(header::CONTENT_TYPE, RECOVERY_CONTENT_TYPE)], out).into_response(),
        Err(Error::KeyNotFound(thp)) => {
            log::debug!("recovery key '{thp}' not available");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            log::debug!("rejecting recovery request: {err}");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn advertisement_response(advertisement: Vec<u8>) -> Response {
    (
        [(header::CONTENT_TYPE, ADVERTISEMENT_CONTENT_TYPE)],
        advertisement,
    )
        .into_response()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available; serve until the task is dropped
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
