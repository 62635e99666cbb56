//! OBS WebSocket (protocol v5) client.
//!
//! # Protocol Flow
//!
//! ```text
//! client                              OBS
//!   │ ──────── connect ─────────────▶ │
//!   │ ◀─────── Hello (op 0) ───────── │  salt + challenge if a password is set
//!   │ ──────── Identify (op 1) ─────▶ │  rpcVersion, authentication
//!   │ ◀─────── Identified (op 2) ──── │
//!   │ ──────── Request (op 6) ──────▶ │  requestType, requestId, requestData
//!   │ ◀─────── RequestResponse (op 7)  │  matched back by requestId
//! ```
//!
//! After the handshake a background task owns the socket. Each request
//! registers a one-shot channel under a fresh `requestId` before it is sent;
//! the task resolves it when the matching response arrives.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use kiwicast_core::{ObsConfig, SceneControl, SceneControlError, SceneControlResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type PendingRequests = Arc<Mutex<HashMap<String, oneshot::Sender<RequestResponse>>>>;

/// RPC version negotiated with the server.
pub const RPC_VERSION: u32 = 1;

const OP_HELLO: u8 = 0;
const OP_IDENTIFY: u8 = 1;
const OP_IDENTIFIED: u8 = 2;
const OP_EVENT: u8 = 5;
const OP_REQUEST: u8 = 6;
const OP_REQUEST_RESPONSE: u8 = 7;

/// Close code OBS uses when authentication fails.
const CLOSE_AUTHENTICATION_FAILED: u16 = 4009;

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Frame {
    op: u8,
    #[serde(default)]
    d: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Hello {
    #[serde(default)]
    obs_web_socket_version: String,
    rpc_version: u32,
    authentication: Option<AuthChallenge>,
}

#[derive(Debug, Deserialize)]
struct AuthChallenge {
    challenge: String,
    salt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestResponse {
    request_id: String,
    request_status: RequestStatus,
    #[serde(default)]
    response_data: Value,
}

#[derive(Debug, Deserialize)]
struct RequestStatus {
    result: bool,
    code: i64,
    #[serde(default)]
    comment: Option<String>,
}

impl RequestResponse {
    fn into_result(self) -> SceneControlResult<Value> {
        if self.request_status.result {
            Ok(self.response_data)
        } else {
            Err(SceneControlError::Request {
                code: self.request_status.code,
                comment: self.request_status.comment.unwrap_or_default(),
            })
        }
    }
}

/// Computes the `authentication` string of the Identify message.
///
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`
pub fn authentication_string(password: &str, salt: &str, challenge: &str) -> String {
    let secret = BASE64.encode(Sha256::digest(format!("{password}{salt}").as_bytes()));
    BASE64.encode(Sha256::digest(format!("{secret}{challenge}").as_bytes()))
}

/// Builds the Identify message answering `hello`.
fn identify_message(hello: &Hello, password: Option<&str>) -> SceneControlResult<Value> {
    let mut d = json!({
        "rpcVersion": RPC_VERSION,
        "eventSubscriptions": 0,
    });

    if let Some(auth) = &hello.authentication {
        let password = password.ok_or_else(|| {
            SceneControlError::Authentication(
                "OBS requires a password but none is configured".into(),
            )
        })?;
        d["authentication"] = Value::String(authentication_string(
            password,
            &auth.salt,
            &auth.challenge,
        ));
    }

    Ok(json!({ "op": OP_IDENTIFY, "d": d }))
}

// =============================================================================
// ObsClient
// =============================================================================

/// A connected obs-websocket client.
pub struct ObsClient {
    outgoing: mpsc::Sender<Message>,
    pending: PendingRequests,
    connected: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    request_timeout: Duration,
}

impl ObsClient {
    /// Connects using the `obs` configuration section.
    pub async fn connect_with_config(
        config: &ObsConfig,
        password: Option<&str>,
    ) -> SceneControlResult<Self> {
        Self::connect(
            &config.websocket_url(),
            password,
            Duration::from_secs(config.request_timeout_secs),
        )
        .await
    }

    /// Connects to `url` and completes the handshake.
    ///
    /// `request_timeout` bounds the handshake and every later request.
    pub async fn connect(
        url: &str,
        password: Option<&str>,
        request_timeout: Duration,
    ) -> SceneControlResult<Self> {
        let (ws_stream, _response) = timeout(request_timeout, connect_async(url))
            .await
            .map_err(|_| SceneControlError::Timeout(request_timeout))?
            .map_err(|e| {
                SceneControlError::Transport(format!("failed to connect to {url}: {e}"))
            })?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        timeout(request_timeout, handshake(&mut ws_tx, &mut ws_rx, password))
            .await
            .map_err(|_| SceneControlError::Timeout(request_timeout))??;

        let (outgoing, outgoing_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(run_connection(
            ws_tx,
            ws_rx,
            outgoing_rx,
            shutdown_rx,
            Arc::clone(&pending),
            Arc::clone(&connected),
        ));

        Ok(Self {
            outgoing,
            pending,
            connected,
            shutdown_tx,
            task: Mutex::new(Some(task)),
            request_timeout,
        })
    }

    /// Returns true while the connection is open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns the names of all scenes.
    pub async fn scene_names(&self) -> SceneControlResult<Vec<String>> {
        let data = self.request("GetSceneList", None).await?;
        let scenes = data
            .get("scenes")
            .and_then(Value::as_array)
            .ok_or_else(|| SceneControlError::Protocol("GetSceneList returned no scenes".into()))?;

        Ok(scenes
            .iter()
            .filter_map(|scene| scene.get("sceneName").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Sends a request and waits for its response data.
    pub async fn request(
        &self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> SceneControlResult<Value> {
        if !self.is_connected() {
            return Err(SceneControlError::NotConnected);
        }

        let request_id = Uuid::new_v4().to_string();

        // Register before sending so a fast response is never missed.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id.clone(), tx);

        let frame = json!({
            "op": OP_REQUEST,
            "d": {
                "requestType": request_type,
                "requestId": request_id,
                "requestData": request_data.unwrap_or_else(|| json!({})),
            }
        });

        debug!(request_type, request_id = %request_id, "Sending OBS request");

        if self
            .outgoing
            .send(Message::Text(frame.to_string().into()))
            .await
            .is_err()
        {
            self.pending.lock().remove(&request_id);
            return Err(SceneControlError::NotConnected);
        }

        match timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(_)) => Err(SceneControlError::NotConnected),
            Err(_) => {
                self.pending.lock().remove(&request_id);
                Err(SceneControlError::Timeout(self.request_timeout))
            }
        }
    }

    /// Closes the connection and waits for the background task to finish.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl std::fmt::Debug for ObsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsClient")
            .field("connected", &self.is_connected())
            .field("pending", &self.pending.lock().len())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[async_trait]
impl SceneControl for ObsClient {
    async fn stop_stream(&self) -> SceneControlResult<()> {
        self.request("StopStream", None).await.map(drop)
    }

    async fn set_active_scene(&self, name: &str) -> SceneControlResult<()> {
        self.request("SetCurrentProgramScene", Some(json!({ "sceneName": name })))
            .await
            .map(drop)
    }
}

// =============================================================================
// Connection Task
// =============================================================================

/// Reads Hello, sends Identify and waits for Identified.
async fn handshake(
    ws_tx: &mut WsSink,
    ws_rx: &mut WsSource,
    password: Option<&str>,
) -> SceneControlResult<()> {
    let frame = next_frame(ws_rx).await?;
    if frame.op != OP_HELLO {
        return Err(SceneControlError::Protocol(format!(
            "expected Hello, got op {}",
            frame.op
        )));
    }
    let hello: Hello = serde_json::from_value(frame.d)?;
    debug!(
        obs_websocket_version = %hello.obs_web_socket_version,
        rpc_version = hello.rpc_version,
        authentication = hello.authentication.is_some(),
        "Received Hello"
    );

    let identify = identify_message(&hello, password)?;
    ws_tx
        .send(Message::Text(identify.to_string().into()))
        .await
        .map_err(|e| SceneControlError::Transport(e.to_string()))?;

    loop {
        let frame = next_frame(ws_rx).await?;
        if frame.op == OP_IDENTIFIED {
            info!(
                obs_websocket_version = %hello.obs_web_socket_version,
                "Identified with OBS"
            );
            return Ok(());
        }
        trace!(op = frame.op, "Ignoring message before Identified");
    }
}

/// Waits for the next text frame and decodes it.
async fn next_frame(ws_rx: &mut WsSource) -> SceneControlResult<Frame> {
    loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(Message::Close(frame))) => return Err(close_error(frame)),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(SceneControlError::Transport(e.to_string())),
            None => return Err(SceneControlError::NotConnected),
        }
    }
}

fn close_error(frame: Option<CloseFrame>) -> SceneControlError {
    match frame {
        Some(frame) => {
            let code = u16::from(frame.code);
            let reason: &str = &frame.reason;
            if code == CLOSE_AUTHENTICATION_FAILED {
                SceneControlError::Authentication(reason.to_string())
            } else {
                SceneControlError::Transport(format!("connection closed ({code}): {reason}"))
            }
        }
        None => SceneControlError::NotConnected,
    }
}

/// Owns the socket after the handshake.
async fn run_connection(
    mut ws_tx: WsSink,
    mut ws_rx: WsSource,
    mut outgoing_rx: mpsc::Receiver<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
    pending: PendingRequests,
    connected: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("Closing OBS connection");
                    let _ = ws_tx.close().await;
                    break;
                }
            }

            Some(msg) = outgoing_rx.recv() => {
                if let Err(e) = ws_tx.send(msg).await {
                    warn!(error = %e, "Failed to send OBS request");
                    break;
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => route_message(&pending, &text),
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        warn!(error = %close_error(frame), "OBS closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "OBS WebSocket error");
                        break;
                    }
                    None => {
                        warn!("OBS WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);

    // Dropping the senders fails every waiting request with NotConnected.
    let mut pending = pending.lock();
    if !pending.is_empty() {
        debug!(count = pending.len(), "Clearing pending OBS requests");
        pending.clear();
    }
}

/// Hands a request response to its waiter.
fn route_message(pending: &PendingRequests, text: &str) {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Malformed message from OBS");
            return;
        }
    };

    match frame.op {
        OP_REQUEST_RESPONSE => {
            let response: RequestResponse = match serde_json::from_value(frame.d) {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "Malformed request response from OBS");
                    return;
                }
            };

            let waiter = pending.lock().remove(&response.request_id);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(response);
                }
                None => warn!(
                    request_id = %response.request_id,
                    "Received OBS response for unknown request (timed out?)"
                ),
            }
        }
        OP_EVENT => trace!("Ignoring OBS event"),
        op => debug!(op, "Ignoring OBS message"),
    }
}

// =============================================================================
// Tests
// =============================================================================
