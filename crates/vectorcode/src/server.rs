//! HTTP tool server.
//!
//! Exposes the action set to editor integrations as small JSON endpoints:
//! `GET /health`, `GET /tools/list`, and `POST /tools/{name}` with the
//! action's parameters as the request body. Responses are the same JSON
//! the CLI prints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use vectorcode_core::error::VcError;

use crate::actions::{Action, AppContext, DispatchError};

struct AppError(DispatchError);

impl From<VcError> for AppError {
    fn from(err: VcError) -> Self {
        Self(DispatchError::Action(err))
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        Self(err)
    }
}

fn status_for(err: &VcError) -> StatusCode {
    match err {
        VcError::Config(_) => StatusCode::BAD_REQUEST,
        VcError::UnsupportedAction(_) => StatusCode::BAD_REQUEST,
        VcError::InvalidProjectRoot(_) => StatusCode::BAD_REQUEST,
        VcError::CollectionAccess { .. } => StatusCode::NOT_FOUND,
        VcError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        VcError::FileRead { .. } | VcError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.cause());
        let mut body = json!({ "error": self.0.to_string() });
        if let Some(partial) = self.0.partial() {
            body["partial"] = json!(partial);
        }
        (status, Json(body)).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_tools() -> Json<serde_json::Value> {
    Json(json!({ "tools": Action::NAMES }))
}

async fn run_tool(
    State(app): State<Arc<AppContext>>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let action = Action::from_name(&name, params)?;
    let output = app.dispatch(action, &CancellationToken::new()).await?;
    let value =
        serde_json::to_value(&output).map_err(|e| AppError::from(VcError::Store(e.to_string())))?;
    Ok(Json(value))
}

pub fn router(app: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools/list", get(list_tools))
        .route("/tools/{name}", post(run_tool))
        .layer(CorsLayer::permissive())
        .with_state(app)
}

pub async fn serve(app: Arc<AppContext>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "tool server listening");
    axum::serve(listener, router(app)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn errors_map_to_stable_status_codes() {
        assert_eq!(
            status_for(&VcError::Config("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&VcError::UnsupportedAction("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&VcError::CollectionAccess {
                project_root: PathBuf::from("/p"),
                reason: "missing".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&VcError::StoreUnavailable {
                host: "h".into(),
                port: 1
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&VcError::Store("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
