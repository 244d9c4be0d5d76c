use async_trait::async_trait;

use crate::error::FetchError;
use crate::state::RawPayload;

/// Where the poller gets balancer state from.
#[async_trait]
pub trait StateSource: Send + Sync {
    /// One request. Implementations must not retry; the next tick is the retry.
    async fn fetch(&self) -> Result<RawPayload, FetchError>;

    // Shown in logs and the view header
    fn describe(&self) -> String {
        "<unnamed source>".to_string()
    }
}
