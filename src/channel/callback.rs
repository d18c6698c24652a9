//! HTTP callback server through which authorization windows report completion.
//!
//! The provider (or the backend's OAuth callback page) redirects the window to
//! this server once the handshake finishes. Every recognised report is published
//! on the flow's [`MessageBus`].
//!
//! ## Endpoints
//!
//! | Route              | Purpose                                                   |
//! |--------------------|-----------------------------------------------------------|
//! | `GET /health`      | liveness, returns `ok`                                    |
//! | `POST /message`    | JSON completion message; `202` if the shape is not one   |
//! | `GET /complete`    | redirect target; query `type`, `service`, `error`        |
//!
//! ## Usage
//!
//! ```no_run
//! use authflow::channel::{CallbackServer, MessageBus};
//!
//! # async fn example() -> Result<(), authflow::errors::FlowError> {
//! let bus = MessageBus::new();
//! let mut server = CallbackServer::new(bus.clone());
//! let url = server.start(0).await?;
//! println!("Point provider redirects at {url}/complete");
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, oneshot};
use tracing::{debug, error, info};

use super::{CompletionKind, CompletionMessage, MessageBus};
use crate::errors::FlowError;
use crate::service::ServiceId;

/// State shared between handlers.
#[derive(Debug)]
pub(crate) struct ServerState {
    pub(crate) bus: MessageBus,
    pub(crate) running: bool,
    /// Recognised completion messages received so far.
    pub(crate) accepted: u64,
}

impl ServerState {
    fn new(bus: MessageBus) -> Self {
        Self {
            bus,
            running: false,
            accepted: 0,
        }
    }

    fn accept(&mut self, message: CompletionMessage) {
        self.accepted += 1;
        let listeners = self.bus.publish(message);
        debug!(listeners, "Published completion message");
    }
}

type SharedState = Arc<RwLock<ServerState>>;

/// Local HTTP server bound to `127.0.0.1`.
pub struct CallbackServer {
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    addr: Option<SocketAddr>,
}

impl CallbackServer {
    pub fn new(bus: MessageBus) -> Self {
        Self {
            state: Arc::new(RwLock::new(ServerState::new(bus))),
            shutdown_tx: None,
            addr: None,
        }
    }

    /// Start serving on `port` (0 picks a free port). Returns the base URL.
    pub async fn start(&mut self, port: u16) -> Result<String, FlowError> {
        let bind_addr = format!("127.0.0.1:{}", port);
        let listener =
            TcpListener::bind(&bind_addr)
                .await
                .map_err(|source| FlowError::CallbackBind {
                    addr: bind_addr.clone(),
                    source,
                })?;
        let addr = listener
            .local_addr()
            .map_err(|source| FlowError::CallbackBind {
                addr: bind_addr,
                source,
            })?;
        self.addr = Some(addr);

        self.state.write().await.running = true;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let app = build_router(self.state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %e, "Callback server error");
            }
        });

        let url = format!("http://{}", addr);
        info!(url = %url, "Callback server listening");
        Ok(url)
    }

    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.state.write().await.running = false;
        self.addr = None;
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }

    pub fn callback_url(&self) -> Option<String> {
        self.addr.map(|addr| format!("http://{}", addr))
    }

    /// Count of recognised completion messages received.
    pub async fn accepted(&self) -> u64 {
        self.state.read().await.accepted
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/message", post(message_handler))
        .route("/complete", get(complete_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn message_handler(
    State(state): State<SharedState>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    match CompletionMessage::from_json(payload) {
        Some(message) => {
            state.write().await.accept(message);
            StatusCode::OK
        }
        None => StatusCode::ACCEPTED,
    }
}

#[derive(Debug, Deserialize)]
struct CompleteQuery {
    #[serde(rename = "type")]
    kind: String,
    service: String,
    #[serde(default)]
    error: Option<String>,
}

async fn complete_handler(
    State(state): State<SharedState>,
    Query(query): Query<CompleteQuery>,
) -> (StatusCode, Html<String>) {
    let kind = match query.kind.as_str() {
        "oauth_success" | "success" => CompletionKind::Success,
        "oauth_error" | "error" => CompletionKind::Error,
        other => {
            debug!(kind = other, "Ignoring completion redirect of unknown type");
            return (
                StatusCode::BAD_REQUEST,
                Html(render_page("Unrecognised response", "You can close this window.")),
            );
        }
    };

    let message = CompletionMessage {
        kind,
        service_id: ServiceId::from(query.service.clone()),
        error: query.error.clone(),
    };
    state.write().await.accept(message);

    let page = match kind {
        CompletionKind::Success => render_page(
            &format!("{} connected", query.service),
            "This window can be closed.",
        ),
        CompletionKind::Error => render_page(
            &format!("{} authorization failed", query.service),
            &format!(
                "Error: {}",
                query.error.as_deref().unwrap_or("authorization_failed")
            ),
        ),
    };
    (StatusCode::OK, Html(page))
}

fn render_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n<h2>{title}</h2>\n<p>{body}</p>\n</body>\n</html>\n",
        title = escape_html(title),
        body = escape_html(body),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
