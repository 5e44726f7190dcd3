#[cfg(feature = "kafka")]
pub mod kafka;

use tracing::info;
use serde_json::Value;
use async_trait::async_trait;
use crate::utils::errors::RecoveryError;

///
/// Outbound, templated mail. Rendering and delivery belong to whatever sits behind the gateway.
///
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_template(
        &self,
        to: &str,
        subject_key: &str,
        template_name: &str,
        variables: &Value,
        locale: &str) -> Result<(), RecoveryError>;
}

///
/// Records the send in the log and nothing else. Used when no mailer is wired in.
///
/// The variables are never logged as they carry the reset link.
///
#[derive(Default)]
pub struct TracingGateway;

#[async_trait]
impl NotificationGateway for TracingGateway {
    async fn send_template(
        &self,
        to: &str,
        subject_key: &str,
        template_name: &str,
        _variables: &Value,
        locale: &str) -> Result<(), RecoveryError> {

        info!(to = %to, subject_key = %subject_key, template_name = %template_name, locale = %locale, "Email requested");
        Ok(())
    }
}
