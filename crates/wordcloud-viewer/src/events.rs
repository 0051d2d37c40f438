//! Server-sent event stream of snapshots.
//!
//! Each connection becomes one subscription. It gets the current snapshot
//! right away, then one full snapshot per committed change. Between changes
//! the stream is parked on the subscription; when it has been idle for the
//! configured timeout a keep-alive comment goes out, which is also how a
//! vanished browser is eventually noticed.

use std::convert::Infallible;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures_util::stream::{self, Stream};
use wordcloud_core::Snapshot;
use wordcloud_storage::{Subscription, Wake};

use crate::api::on_cloud;
use crate::AppState;

pub(crate) async fn stream(State(app): State<AppState>) -> impl IntoResponse {
    let subscription = app.cloud.subscribe();
    tracing::debug!(subscription = subscription.id(), "Viewer connected");

    let keep_alive = KeepAlive::new().interval(app.options.idle_timeout);
    (
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Sse::new(snapshots(app, subscription)).keep_alive(keep_alive),
    )
}

/// The initial snapshot, then a snapshot after every change.
fn snapshots(
    app: AppState,
    subscription: Subscription,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (app, subscription, true),
        |(app, subscription, first)| async move {
            if !first {
                loop {
                    match subscription.wait(app.options.idle_timeout).await {
                        Wake::Changed => break,
                        Wake::Idle => continue,
                    }
                }
            }

            match on_cloud(&app.cloud, |cloud| Ok(cloud.snapshot())).await {
                Ok(snapshot) => {
                    let event = snapshot_event(&snapshot);
                    Some((Ok(event), (app, subscription, false)))
                }
                Err(e) => {
                    tracing::warn!(
                        subscription = subscription.id(),
                        error = ?e,
                        "Closing event stream"
                    );
                    None
                }
            }
        },
    )
}

/// `data: <snapshot json>`
fn snapshot_event(snapshot: &Snapshot) -> Event {
    match serde_json::to_string(snapshot) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode snapshot");
            Event::default().comment("snapshot unavailable")
        }
    }
}
