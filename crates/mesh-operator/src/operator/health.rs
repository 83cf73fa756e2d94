use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::MeshOperatorResult;

/// Set once the Mesh watch has completed its initial list, and cleared again
/// when leadership is lost.
#[derive(Debug, Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn set_ready(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn set_not_ready(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Marks `readiness` once `started` resolves successfully.
pub async fn mark_ready_when<F, E>(readiness: Readiness, started: F)
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match started.await {
        Ok(()) => {
            readiness.set_ready();
            info!("controller watch established, ready");
        }
        Err(e) => warn!(error = %e, "controller stopped before becoming ready"),
    }
}

pub fn routes(readiness: Readiness) -> Router {
    Router::new()
        .route("/healthz", get(health_check_handler))
        .route("/readyz", get(ready_check_handler))
        .with_state(readiness)
}

pub async fn serve(address: &str, readiness: Readiness) -> MeshOperatorResult<()> {
    let listener = TcpListener::bind(address).await?;
    info!(address, "serving health probes");
    axum::serve(listener, routes(readiness)).await?;
    Ok(())
}

async fn health_check_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ready_check_handler(State(readiness): State<Readiness>) -> impl IntoResponse {
    if readiness.is_ready() {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "starting" })),
        )
    }
}
