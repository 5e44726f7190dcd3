use serde_json::json;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use super::PasswordResetService;
use crate::model::{token::{RawToken, ResetToken}, user::User};
use crate::utils::errors::{ErrorCode, RecoveryError};

pub async fn request_reset(
    svc: &PasswordResetService,
    email: &str,
    request_ip: Option<&str>,
    request_agent: Option<&str>,
    now: DateTime<Utc>) -> Result<(), RecoveryError> {

    if email.trim().is_empty() {
        return Err(ErrorCode::EmailNotSpecified.with_msg("An email address is required"))
    }

    // An unknown email looks exactly like a known one to the caller.
    let user = match svc.credentials.find_user_by_email(email).await? {
        Some(user) => user,
        None => {
            debug!("Reset requested for an unregistered email");
            return Ok(())
        },
    };

    let raw = svc.codec.generate_raw_token();
    let token = ResetToken::new(
        &user.user_id,
        svc.codec.digest(&raw),
        now,
        svc.settings.token_ttl,
        request_ip,
        request_agent);

    // Storage failures here must surface - otherwise an older token could stay live.
    svc.tokens.replace_live_for_user(&token, now).await?;

    info!(user_id = %user.user_id, token_id = %token.token_id, "Reset token issued");

    if let Err(err) = send_link(svc, &user, &raw).await {
        warn!(user_id = %user.user_id, token_id = %token.token_id, "Reset link could not be sent: {}", err);
    }

    Ok(())
}

async fn send_link(svc: &PasswordResetService, user: &User, raw: &RawToken) -> Result<(), RecoveryError> {
    let reset_url = svc.urls.build_reset_url(raw)?;

    let variables = json!({
        "resetUrl": reset_url,
        "ttlMinutes": svc.settings.token_ttl.num_minutes(),
    });

    svc.notifier
        .send_template(
            &user.email,
            &svc.settings.subject_key,
            &svc.settings.template_name,
            &variables,
            &svc.settings.locale)
        .await
        .map_err(|err| ErrorCode::NotificationFailed.with_msg(&format!("Notification gateway failed: {}", err)))
}
