//! Seams to the remote desktop collaborators: the live view that shows the
//! session and the provider that owns its lifetime.

use anyhow::Result;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// A remote desktop session announced by the agent stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub session_id: String,
    pub view_url: String,
}

/// Receives the identifier and viewing URL of a newly available session.
pub trait DesktopView: Send + Sync {
    fn session_ready(&self, session: &RemoteSession);
}

pub trait DesktopProvider: Send + Sync {
    fn extend_lifetime(
        &self,
        session_id: &str,
        budget: Duration,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn terminate(&self, session_id: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Provider for a locally running desktop container, whose lifetime is not
/// managed by this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDesktopProvider;

impl DesktopProvider for LocalDesktopProvider {
    async fn extend_lifetime(&self, session_id: &str, budget: Duration) -> Result<bool> {
        info!(
            session_id,
            budget_ms = budget.as_millis() as u64,
            "local desktop: lifetime is unmanaged, nothing to extend"
        );
        Ok(true)
    }

    async fn terminate(&self, session_id: &str) -> Result<bool> {
        info!(session_id, "local desktop: container left running for reuse");
        Ok(true)
    }
}
