use std::sync::Arc;

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands, aio::PubSub};
use deadpool_redis::{Config, Pool, Runtime};
use fleet_model::{Request, Response, Topic};
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    bus_url::BusUrl,
    error::TransportError,
    handler::DispatchHandler,
    retry::RetryPolicy,
    transport::{Subjects, Transport},
};

/// Largest response the broker is asked to carry.
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

const OVERSIZED_MESSAGE: &str = "message > max payload size";

/// Broker-backed transport: requests arrive on `agent.<id>`, responses go to
/// each request's `reply_to` subject.
pub struct PubSubTransport {
    url: BusUrl,
    subjects: Subjects,
    pool: Pool,
    retry: RetryPolicy,
    shutdown: CancellationToken,
}

/// Encoded reply ready to publish.
#[derive(Debug, PartialEq)]
pub(crate) struct Reply {
    pub subject: String,
    pub body: Vec<u8>,
}

impl PubSubTransport {
    /// Build the transport. No connection is made until `start` or the first publish.
    pub fn new(url: BusUrl, agent_id: &str) -> Result<Self, TransportError> {
        let pool = Config::from_url(url.as_str())
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            url,
            subjects: Subjects::for_agent(agent_id),
            pool,
            retry: RetryPolicy::default(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Replace the reconnect schedule used by `start`.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }

    async fn subscribe(&self) -> Result<PubSub, TransportError> {
        let client = redis::Client::open(self.url.as_str())
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        pubsub
            .subscribe(&self.subjects.inbox)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!(subject = %self.subjects.inbox, "subscribed to agent subject");
        Ok(pubsub)
    }

    /// Pump messages until shutdown (`Ok`) or until the broker drops the subscription.
    async fn serve(&self, pubsub: PubSub, handler: &Arc<dyn DispatchHandler>) -> Result<(), TransportError> {
        let mut messages = pubsub.into_on_message();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("pubsub transport stopped");
                    return Ok(());
                }
                msg = messages.next() => {
                    let Some(msg) = msg else {
                        return Err(TransportError::Disconnected);
                    };
                    let body = msg.get_payload_bytes().to_vec();
                    let handler = Arc::clone(handler);
                    let pool = self.pool.clone();

                    tokio::spawn(async move {
                        let Some(reply) = process_message(&body, handler.as_ref()).await else {
                            return;
                        };
                        if let Err(e) = Self::publish(&pool, &reply.subject, &reply.body).await {
                            error!(error = %e, "failed to send response");
                        }
                    });
                }
            }
        }
    }

    async fn publish(pool: &Pool, subject: &str, body: &[u8]) -> Result<(), TransportError> {
        let publish_err = |reason: String| TransportError::Publish {
            subject: subject.to_string(),
            reason,
        };
        let mut conn = pool.get().await.map_err(|e| publish_err(e.to_string()))?;
        conn.publish::<_, _, ()>(subject, body)
            .await
            .map_err(|e| publish_err(e.to_string()))
    }
}

#[async_trait]
impl Transport for PubSubTransport {
    async fn start(&self, handler: Arc<dyn DispatchHandler>) -> Result<(), TransportError> {
        loop {
            let pubsub = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                subscribed = self.retry.run("subscribe", || self.subscribe()) => subscribed?,
            };
            match self.serve(pubsub, &handler).await {
                Err(TransportError::Disconnected) => {
                    warn!(subject = %self.subjects.inbox, "lost broker connection, reconnecting");
                }
                other => return other,
            }
        }
    }

    fn stop(&self) {
        self.shutdown.cancel();
    }

    async fn send_to_health_manager(&self, topic: Topic, payload: &Value) -> Result<(), TransportError> {
        let subject = self.subjects.health(topic);
        let body = serde_json::to_vec(payload).map_err(|e| TransportError::Publish {
            subject: subject.to_string(),
            reason: e.to_string(),
        })?;
        trace!(%topic, subject, bytes = body.len(), "publishing to health manager");
        Self::publish(&self.pool, subject, &body).await
    }
}

/// Decode one inbound message, dispatch it and encode the reply.
///
/// Returns `None` when the message must be dropped: undecodable envelopes and
/// requests without a reply subject never reach the handler.
pub(crate) async fn process_message(body: &[u8], handler: &dyn DispatchHandler) -> Option<Reply> {
    let request = match Request::decode(body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "dropping malformed message");
            return None;
        }
    };
    let subject = match request.reply_target() {
        Ok(s) => s.to_string(),
        Err(_) => {
            warn!(method = %request.method, "dropping message without reply_to");
            return None;
        }
    };

    debug!(method = %request.method, reply_to = %subject, "received request");
    let response = handler.handle(request).await;

    match encode_bounded(&response) {
        Ok(body) => Some(Reply { subject, body }),
        Err(e) => {
            error!(error = %e, reply_to = %subject, "failed to encode response");
            None
        }
    }
}

fn encode_bounded(response: &Response) -> Result<Vec<u8>, TransportError> {
    let body = response.encode()?;
    if body.len() < MAX_PAYLOAD_BYTES {
        return Ok(body);
    }
    warn!(bytes = body.len(), "response exceeds max payload size");
    Ok(Response::exception(OVERSIZED_MESSAGE).encode()?)
}
