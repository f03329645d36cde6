use std::sync::Arc;

use tracing::info;

use crate::{
    bus_url::{BusUrl, TlsFiles, TransportKind},
    error::TransportError,
    retry::RetryPolicy,
    transport::Transport,
};

/// Build the transport selected by the connection URL's scheme.
///
/// `retry` governs broker reconnects; the https listener does not use it.
pub fn build_transport(
    url: BusUrl,
    agent_id: &str,
    tls: Option<TlsFiles>,
    retry: RetryPolicy,
) -> Result<Arc<dyn Transport>, TransportError> {
    match url.kind() {
        TransportKind::PubSub => {
            #[cfg(feature = "pubsub")]
            {
                info!(?url, "using pubsub transport");
                let _ = tls;
                let transport = crate::pubsub::PubSubTransport::new(url, agent_id)?.with_retry(retry);
                Ok(Arc::new(transport))
            }
            #[cfg(not(feature = "pubsub"))]
            {
                let _ = (agent_id, tls, retry);
                Err(TransportError::UnsupportedScheme(url.scheme().to_string()))
            }
        }
        TransportKind::Http => {
            #[cfg(feature = "http")]
            {
                let _ = retry;
                let tls = tls.ok_or(TransportError::MissingTls)?;
                info!(?url, "using https transport");
                Ok(Arc::new(crate::http::HttpTransport::new(&url, tls)?))
            }
            #[cfg(not(feature = "http"))]
            {
                let _ = (agent_id, tls, retry);
                Err(TransportError::UnsupportedScheme(url.scheme().to_string()))
            }
        }
    }
}
