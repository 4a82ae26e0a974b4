use async_trait::async_trait;
use bridgesync_model::BoxError;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// A cancellable unit of remote work (an API call, a page fetch...).
///
/// The operation is handed back to the caller once it has run, inside the
/// request result, so it can carry whatever the caller wants to inspect
/// afterwards.
#[async_trait]
pub trait RemoteOperation: Send + fmt::Debug + 'static {
    /// Raw remote records, handed to the bridge for translation.
    type Output: Send + 'static;

    /// Runs the operation. Should return promptly once `cancel` fires.
    async fn run(&mut self, cancel: CancellationToken) -> Result<Self::Output, BoxError>;
}
