//! Serializing owner for shared mutable state.
//!
//! An [`Arbiter`] owns a value on a dedicated thread and applies closures sent to it one at a
//! time, in FIFO order. Callers await the closure's result; nobody else ever touches the value.
//! Blocking work inside a closure (file I/O) delays only the callers queued on the same arbiter.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    thread,
};

use tokio::sync::{mpsc, oneshot};
use tracing::{error, trace};

use crate::error::{ArbiterClosed, CoreError};

type Op<S> = Box<dyn FnOnce(&mut S) + Send>;

pub struct Arbiter<S> {
    name: &'static str,
    tx: mpsc::UnboundedSender<Op<S>>,
}

impl<S> Clone for Arbiter<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<S> Arbiter<S>
where
    S: Send + 'static,
{
    /// Move `state` onto a new arbiter thread.
    ///
    /// The thread exits once every handle has been dropped.
    pub fn spawn(name: &'static str, state: S) -> Result<Self, CoreError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Op<S>>();

        thread::Builder::new()
            .name(format!("arbiter-{name}"))
            .spawn(move || {
                let mut state = state;
                while let Some(op) = rx.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(|| op(&mut state))).is_err() {
                        error!(arbiter = name, "operation panicked; state kept as-is");
                    }
                }
                trace!(arbiter = name, "arbiter stopped");
            })
            .map_err(CoreError::Spawn)?;

        Ok(Self { name, tx })
    }

    /// Run `f` against the owned state and wait for its result.
    pub async fn call<R, F>(&self, f: F) -> Result<R, ArbiterClosed>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Box::new(move |state: &mut S| {
                let _ = reply_tx.send(f(state));
            }))
            .map_err(|_| ArbiterClosed(self.name))?;

        reply_rx.await.map_err(|_| ArbiterClosed(self.name))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
