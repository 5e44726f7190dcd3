use chrono::{DateTime, Utc};
use tracing::{error, info};
use super::PasswordResetService;
use crate::model::{algorithm::PasswordAlgorithm, form, token::{RawToken, ResetToken, TokenState}};
use crate::utils::errors::{ErrorCode, RecoveryError};

pub async fn redeem_reset(
    svc: &PasswordResetService,
    raw_token: &str,
    new_password: &str,
    now: DateTime<Utc>) -> Result<(), RecoveryError> {

    if new_password.trim().is_empty() {
        return Err(ErrorCode::PasswordNotSpecified.with_msg("A new password is required"))
    }

    form::check_max_bytes(new_password)?;

    let digest = svc.codec.digest(&RawToken::from(raw_token));

    let token = svc.tokens.find_by_digest(&digest)
        .await?
        .ok_or_else(|| ErrorCode::TokenNotFound.with_msg("No reset token has the presented digest"))?;

    check_live(&token, now)?;

    let mut user = svc.credentials.find_user_by_id(&token.user_id)
        .await?
        .ok_or_else(|| ErrorCode::TokenOwnerMissing
            .with_msg(&format!("Reset token {} belongs to missing user {}", token.token_id, token.user_id)))?;

    // Hash before claiming so a slow hash can't leave a consumed token with no new password.
    let phc = hash_into_phc(&svc.hasher, new_password).await?;

    // The claim is the replay guard - only one redemption gets past it.
    if !svc.tokens.mark_used(&token.token_id, now).await? {
        return Err(ErrorCode::TokenClaimLost
            .with_msg(&format!("Reset token {} was redeemed concurrently", token.token_id)))
    }

    user.apply_new_credential(phc, now, svc.settings.password_expiry);

    // The token is burnt from here on. If the write fails the user needs a fresh link.
    if let Err(err) = svc.credentials.update_credential(&user).await {
        error!(user_id = %user.user_id, token_id = %token.token_id, "Reset token consumed but the new password was not stored: {}", err);
        return Err(ErrorCode::CredentialUpdateFailed
            .with_msg(&format!("Credential update for user {} failed after token {} was consumed", user.user_id, token.token_id)))
    }

    info!(user_id = %user.user_id, token_id = %token.token_id, "Password reset");
    Ok(())
}

fn check_live(token: &ResetToken, now: DateTime<Utc>) -> Result<(), RecoveryError> {
    match token.state(now) {
        TokenState::Live    => Ok(()),
        TokenState::Used    => Err(ErrorCode::TokenAlreadyUsed
            .with_msg(&format!("Reset token {} was already used", token.token_id))),
        TokenState::Expired => Err(ErrorCode::TokenExpired
            .with_msg(&format!("Reset token {} expired at {}", token.token_id, token.expires_at))),
    }
}

///
/// Hashing is CPU-bound so it runs in the blocking thread pool, not on the event loop.
///
async fn hash_into_phc(hasher: &PasswordAlgorithm, plain_text_password: &str) -> Result<String, RecoveryError> {
    let hasher = hasher.clone();
    let plain_text_password = plain_text_password.to_string();

    tokio::task::spawn_blocking(move || hasher.hash_into_phc(&plain_text_password))
        .await
        .map_err(RecoveryError::from)?
}
