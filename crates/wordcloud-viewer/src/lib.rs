//! HTTP front for the live word cloud viewer.
//!
//! Routes:
//! - `GET /`: the static viewer page, when one is configured
//! - `GET /api/words`: the current snapshot
//! - `GET /api/events`: server-sent events, one full snapshot per change
//! - `POST /api/connect`, `POST /api/disconnect`: edit connections
//!
//! Handlers share the same [`CloudState`] as the stdio server, so a change
//! made by either side reaches every open event stream.

mod api;
mod events;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use wordcloud_core::config::ViewerConfig;
use wordcloud_storage::CloudState;

pub use api::ApiError;

/// Viewer settings that matter once the listener is bound.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// Page served at `/`
    pub index_path: Option<PathBuf>,
    /// How long an event stream sits idle before it sends a keep-alive
    pub idle_timeout: Duration,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            index_path: None,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&ViewerConfig> for ViewerOptions {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            index_path: config.index_path.clone(),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs.max(1)),
        }
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub cloud: CloudState,
    pub options: Arc<ViewerOptions>,
}

/// Build the viewer router.
pub fn router(cloud: CloudState, options: ViewerOptions) -> Router {
    let state = AppState {
        cloud,
        options: Arc::new(options),
    };

    Router::new()
        .route("/", get(api::index))
        .route("/api/words", get(api::words))
        .route("/api/events", get(events::stream))
        .route("/api/connect", post(api::connect))
        .route("/api/disconnect", post(api::disconnect))
        .with_state(state)
}

/// Serve the viewer on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    cloud: CloudState,
    options: ViewerOptions,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "Word cloud viewer listening at http://{addr}/");

    axum::serve(listener, router(cloud, options))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Word cloud viewer stopped");
    Ok(())
}
