//! Handles to best-effort remote writes

use tokio::task::JoinHandle;

use crate::remote::RemoteError;

/// A remote write running in the background
///
/// The local change it mirrors is already applied. Dropping the handle
/// detaches the write; awaiting [`PendingWrite::settled`] reports how it
/// went.
#[derive(Debug)]
pub struct PendingWrite<T = ()> {
    handle: Option<JoinHandle<Result<T, RemoteError>>>,
}

impl<T> PendingWrite<T> {
    pub(crate) fn spawned(handle: JoinHandle<Result<T, RemoteError>>) -> Self {
        Self { handle: Some(handle) }
    }

    /// A write that was never sent because the session is closed
    pub(crate) fn skipped() -> Self {
        Self { handle: None }
    }

    /// Whether a request was actually sent
    pub fn was_sent(&self) -> bool {
        self.handle.is_some()
    }

    /// Wait for the remote outcome
    pub async fn settled(self) -> Result<T, RemoteError> {
        match self.handle {
            Some(handle) => handle.await.map_err(|e| RemoteError::Unavailable(e.to_string()))?,
            None => Err(RemoteError::Unavailable("session closed".to_string())),
        }
    }
}
