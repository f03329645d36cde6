use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response as HttpResponse},
    routing::post,
};
use axum_server::tls_rustls::RustlsConfig;
use base64::{Engine, engine::general_purpose::STANDARD};
use fleet_model::{Request, Topic};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    bus_url::{BusUrl, Credentials, TlsFiles},
    error::TransportError,
    handler::DispatchHandler,
    transport::Transport,
};

/// The only path the agent serves.
pub const AGENT_PATH: &str = "/agent";

/// Polling-only transport: the director POSTs requests over TLS and reads the
/// response from the HTTP body.
pub struct HttpTransport {
    addr: SocketAddr,
    credentials: Credentials,
    tls: TlsFiles,
    shutdown: CancellationToken,
}

#[derive(Clone)]
struct AppState {
    handler: Arc<dyn DispatchHandler>,
    credentials: Arc<Credentials>,
}

impl HttpTransport {
    pub fn new(url: &BusUrl, tls: TlsFiles) -> Result<Self, TransportError> {
        Ok(Self {
            addr: url.socket_addr()?,
            credentials: url.credentials(),
            tls,
            shutdown: CancellationToken::new(),
        })
    }

    /// Build the router with mounted endpoint.
    ///
    /// Routes:
    /// - POST /agent - dispatch one request
    ///
    /// Anything else, including other methods on `/agent`, is 404.
    pub fn router(handler: Arc<dyn DispatchHandler>, credentials: Credentials) -> Router {
        let state = AppState {
            handler,
            credentials: Arc::new(credentials),
        };
        Router::new()
            .route(AGENT_PATH, post(handle_agent).fallback(not_found))
            .fallback(not_found)
            .with_state(state)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(&self, handler: Arc<dyn DispatchHandler>) -> Result<(), TransportError> {
        // Another component may have installed the provider already.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let tls = RustlsConfig::from_pem_file(&self.tls.cert, &self.tls.key)
            .await
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        let app = Self::router(handler, self.credentials.clone());
        info!(addr = %self.addr, path = AGENT_PATH, "https transport listening");

        let server = axum_server::bind_rustls(self.addr, tls).serve(app.into_make_service());
        tokio::select! {
            res = server => res.map_err(TransportError::from),
            _ = self.shutdown.cancelled() => {
                info!("https transport stopped");
                Ok(())
            }
        }
    }

    fn stop(&self) {
        self.shutdown.cancel();
    }

    async fn send_to_health_manager(&self, topic: Topic, _payload: &Value) -> Result<(), TransportError> {
        debug!(%topic, "https transport has no push channel; dropping health payload");
        Ok(())
    }
}

async fn handle_agent(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> HttpResponse {
    if !authorized(&headers, &state.credentials) {
        warn!("rejecting request with bad credentials");
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"agent\"")],
        )
            .into_response();
    }

    let request = match Request::decode(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "rejecting malformed request body");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let response = state.handler.handle(request).await;
    match response.encode() {
        Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn authorized(headers: &HeaderMap, expected: &Credentials) -> bool {
    let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(pair) = String::from_utf8(decoded) else {
        return false;
    };
    match pair.split_once(':') {
        Some((user, password)) => user == expected.user && password == expected.password,
        None => false,
    }
}
