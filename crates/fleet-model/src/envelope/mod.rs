mod error;
pub use error::ProtocolError;

mod request;
pub use request::{GET_STATE_ALIAS, Request};

mod response;
pub use response::{RemoteException, Response, TaskValue};
