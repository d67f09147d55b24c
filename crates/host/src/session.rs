use relay_core::SessionId;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{HostError, Result};
use crate::host::{SessionSummary, StrategyHost};

/// Handle to a session running on its own task
pub struct SessionHandle {
    session_id: SessionId,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<Result<SessionSummary>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Request shutdown and wait for the session to finish
    pub async fn stop(mut self) -> Result<SessionSummary> {
        if let Some(tx) = self.shutdown.take() {
            // The session may already have exited on its own
            let _ = tx.send(());
        }
        self.join.await.map_err(|e| HostError::Join(e.to_string()))?
    }

    /// Like [`SessionHandle::stop`], aborting the task if it overruns `timeout`
    pub async fn stop_within(mut self, timeout: Duration) -> Result<SessionSummary> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let joined = tokio::time::timeout(timeout, &mut self.join).await;
        match joined {
            Ok(joined) => joined.map_err(|e| HostError::Join(e.to_string()))?,
            Err(_) => {
                self.abort();
                Err(HostError::Join(format!(
                    "{} did not stop within {:?}",
                    self.session_id, timeout
                )))
            }
        }
    }

    /// Kill the session without running its shutdown hook
    pub fn abort(&self) {
        log::warn!("[{}] aborting session", self.session_id);
        self.join.abort();
    }
}

/// Start a loaded host on a dedicated task
///
/// The task bootstraps, announces readiness and streams until stopped. A
/// startup failure ends the task with that error.
pub fn spawn_session(mut host: StrategyHost) -> SessionHandle {
    let session_id = host.session_id().clone();
    let (tx, rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        if let Err(e) = host.start().await {
            log::error!("[{}] startup failed: {}", host.session_id(), e);
            host.stop();
            return Err(e);
        }
        host.run(rx).await
    });

    SessionHandle {
        session_id,
        shutdown: Some(tx),
        join,
    }
}
