//! Snapshot and connection-editing endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use wordcloud_core::Error;
use wordcloud_storage::CloudState;

use crate::AppState;

/// An error returned to the browser as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = if err.is_state_conflict() || matches!(err, Error::InvalidInput(_)) {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        } else {
            tracing::debug!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Body of `POST /api/connect` and `POST /api/disconnect`.
#[derive(Debug, Deserialize)]
struct ConnectionRequest {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

impl ConnectionRequest {
    /// Decode a request body; both endpoints must be present and non-empty.
    fn parse(body: &[u8]) -> Result<(String, String, Option<String>), ApiError> {
        let request: ConnectionRequest = serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;

        let source = request.source.unwrap_or_default();
        let target = request.target.unwrap_or_default();
        if source.trim().is_empty() || target.trim().is_empty() {
            return Err(ApiError::bad_request("Missing source or target"));
        }

        Ok((
            source.trim().to_string(),
            target.trim().to_string(),
            request.label,
        ))
    }
}

fn success() -> Json<serde_json::Value> {
    Json(json!({ "status": "success" }))
}

/// Run `f` against the cloud on the blocking pool.
///
/// Writes hold the state lock across disk I/O, so they stay off the async
/// workers.
pub(crate) async fn on_cloud<T, F>(cloud: &CloudState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(CloudState) -> wordcloud_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let cloud = cloud.clone();
    tokio::task::spawn_blocking(move || f(cloud))
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("state task failed: {}", e),
        })?
        .map_err(ApiError::from)
}

pub(crate) async fn index(State(app): State<AppState>) -> Result<Response, ApiError> {
    let Some(path) = app.options.index_path.as_ref() else {
        return Err(ApiError::not_found("index.html not found"));
    };

    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Html(content).into_response()),
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Viewer page unavailable");
            Err(ApiError::not_found("index.html not found"))
        }
    }
}

pub(crate) async fn words(State(app): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = on_cloud(&app.cloud, |cloud| Ok(cloud.snapshot())).await?;
    Ok((
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(snapshot),
    ))
}

/// Connect two existing words. An existing connection keeps its label unless
/// the request carries a new one.
pub(crate) async fn connect(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (source, target, label) = ConnectionRequest::parse(&body)?;

    let (from, to) = (source.clone(), target.clone());
    on_cloud(&app.cloud, move |state| {
        state.apply(|cloud| {
            let label = label
                .or_else(|| cloud.find_connection(&from, &to).map(|c| c.label.clone()))
                .unwrap_or_default();
            cloud.add_connection(&from, &to, &label)
        })
    })
    .await?;

    tracing::info!(%source, %target, "Connection added from viewer");
    Ok(success())
}

/// Remove a connection. Removing one that does not exist still succeeds,
/// without touching the stored file or waking viewers.
pub(crate) async fn disconnect(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (source, target, _) = ConnectionRequest::parse(&body)?;

    let (from, to) = (source.clone(), target.clone());
    let removed = on_cloud(&app.cloud, move |state| {
        state.apply(|cloud| match cloud.remove_connection(&from, &to) {
            Ok(()) => Ok(true),
            Err(Error::ConnectionNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        })
    })
    .await?;

    tracing::info!(%source, %target, removed, "Connection removed from viewer");
    Ok(success())
}
