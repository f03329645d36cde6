//! Message transports that carry director requests into the dispatcher and
//! health reports out to the health manager.

mod error;
pub use error::TransportError;

mod handler;
pub use handler::DispatchHandler;

mod adapter;
pub use adapter::DispatcherAdapter;

mod transport;
pub use transport::{Subjects, Transport};

mod bus_url;
pub use bus_url::{BusUrl, Credentials, TlsFiles, TransportKind};

mod retry;
pub use retry::RetryPolicy;

mod select;
pub use select::build_transport;

#[cfg(feature = "pubsub")]
mod pubsub;

#[cfg(feature = "pubsub")]
pub use pubsub::{MAX_PAYLOAD_BYTES, PubSubTransport};

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{AGENT_PATH, HttpTransport};
