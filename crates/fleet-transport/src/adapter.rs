use std::sync::Arc;

use async_trait::async_trait;
use fleet_core::Dispatcher;
use fleet_model::{Request, Response};
use tracing::trace;

use crate::handler::DispatchHandler;

/// Routes transport requests into a shared [`Dispatcher`].
#[derive(Clone)]
pub struct DispatcherAdapter {
    dispatcher: Arc<Dispatcher>,
}

impl DispatcherAdapter {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl DispatchHandler for DispatcherAdapter {
    async fn handle(&self, request: Request) -> Response {
        trace!(method = %request.method, "dispatching request");
        self.dispatcher.dispatch(request).await
    }
}
