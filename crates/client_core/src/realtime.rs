use std::sync::Arc;

use futures::StreamExt;
use shared::protocol::ServerEvent;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;

use crate::{
    error::ClientError,
    snapshot::{Origin, SnapshotStore},
};

/// Rewrites an `http(s)` server URL into the websocket URL for `path`.
pub fn websocket_url(server_url: &Url, path: &str) -> Result<Url, ClientError> {
    let scheme = match server_url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(ClientError::InvalidUrl(format!(
                "server_url must start with http:// or https://, got {other}://"
            )))
        }
    };
    let mut url = server_url.join(path.trim_start_matches('/'))?;
    url.set_scheme(scheme)
        .map_err(|_| ClientError::InvalidUrl(format!("cannot use {scheme} with {server_url}")))?;
    Ok(url)
}

/// Connects to the push channel and feeds every update into `store`.
///
/// Returns once the socket is open; frames are handled on a spawned task that
/// ends when the server closes the connection.
pub async fn spawn_realtime(
    ws_url: Url,
    store: Arc<SnapshotStore>,
) -> Result<JoinHandle<()>, ClientError> {
    let (ws_stream, _) = connect_async(ws_url.as_str())
        .await
        .map_err(|err| ClientError::Realtime(format!("failed to connect {ws_url}: {err}")))?;
    info!(url = %ws_url, "realtime channel connected");
    let (_, mut ws_reader) = ws_stream.split();

    Ok(tokio::spawn(async move {
        while let Some(msg) = ws_reader.next().await {
            match msg {
                Ok(Message::Text(text)) => handle_frame(&store, &text).await,
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    store.report_error(format!("realtime receive failed: {err}"));
                    break;
                }
            }
        }
        info!(url = %ws_url, "realtime channel closed");
        store.report_disconnected();
    }))
}

async fn handle_frame(store: &SnapshotStore, text: &str) {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::Error(err)) => store.report_error(err.message),
        Ok(event) => {
            if let Some(patch) = event.into_patch() {
                if patch.is_empty() {
                    return;
                }
                store.apply_patch(patch, Origin::Realtime).await;
            }
        }
        Err(err) => {
            warn!(error = %err, "skipping realtime frame");
            store.report_error(format!("invalid realtime frame: {err}"));
        }
    }
}
