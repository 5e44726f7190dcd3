use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use super::PasswordResetService;
use crate::utils::errors::RecoveryError;

pub async fn purge_inert(svc: &PasswordResetService, now: DateTime<Utc>) -> Result<u64, RecoveryError> {
    svc.tokens.purge_inert(now).await
}

///
/// Periodically delete expired tokens until shutdown fires (or its sender is dropped).
///
pub async fn run_sweeper(service: Arc<PasswordResetService>, every: Duration, mut shutdown: oneshot::Receiver<()>) {
    // tokio's interval panics on a zero period.
    let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));

    info!("Expired token sweeper running every {}s", every.as_secs());

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Expired token sweeper stopped");
                break
            },
            _ = interval.tick() => {
                match service.purge_inert(Utc::now()).await {
                    Ok(0)       => debug!("No expired reset tokens to purge"),
                    Ok(deleted) => info!("Purged {} expired reset tokens", deleted),
                    Err(err)    => warn!("Expired token purge failed: {}", err),
                }
            },
        }
    }
}
