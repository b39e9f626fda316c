use tokio_util::sync::CancellationToken as Token;

/// Cooperative stop flag shared between the signal handler and the batch loop.
///
/// Clones share the same flag. Requesting a kill more than once is harmless.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Token,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_kill(&self) {
        self.inner.cancel();
    }

    pub fn kill_requested(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once a kill was requested.
    pub async fn killed(&self) {
        self.inner.cancelled().await;
    }
}
