use async_trait::async_trait;
use fleet_model::{Request, Response};

/// Callback a transport invokes once per inbound request.
///
/// Implementations are total: every failure is expressed as an exception response.
#[async_trait]
pub trait DispatchHandler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Response;
}
