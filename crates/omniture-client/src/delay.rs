use std::time::Duration;

use async_trait::async_trait;

/// Pause between two status polls.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<T: Delay + ?Sized> Delay for std::sync::Arc<T> {
    async fn wait(&self, duration: Duration) {
        (**self).wait(duration).await;
    }
}
