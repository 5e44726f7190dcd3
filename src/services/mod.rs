mod complete_reset;
mod purge;
mod start_reset;

pub use purge::run_sweeper;

use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument};
use crate::db::{CredentialStore, TokenStore};
use crate::model::{algorithm::PasswordAlgorithm, form::{ForgotForm, ResetForm}};
use crate::notify::NotificationGateway;
use crate::utils::{config::Configuration, errors::{RecoveryError, ResetError}, token_codec::TokenCodec, urls::ResetUrlBuilder};

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 45;
pub const DEFAULT_PASSWORD_EXPIRY_DAYS: i64 = 90;
pub const SUBJECT_KEY: &str = "mail.passwordreset.subject";
pub const TEMPLATE_NAME: &str = "mail/password-reset";
pub const DEFAULT_LOCALE: &str = "es";

///
/// The tunables of the reset flow.
///
#[derive(Clone, Debug)]
pub struct ResetSettings {
    pub token_ttl: Duration,       // How long a minted token stays live.
    pub password_expiry: Duration, // Added to the change time to give the new password's expiry.
    pub subject_key: String,
    pub template_name: String,
    pub locale: String,
}

impl Default for ResetSettings {
    fn default() -> Self {
        ResetSettings {
            token_ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
            password_expiry: Duration::days(DEFAULT_PASSWORD_EXPIRY_DAYS),
            subject_key: SUBJECT_KEY.to_string(),
            template_name: TEMPLATE_NAME.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl From<&Configuration> for ResetSettings {
    fn from(config: &Configuration) -> Self {
        ResetSettings {
            token_ttl: Duration::minutes(config.token_ttl_minutes as i64),
            password_expiry: Duration::days(config.password_expiry_days as i64),
            locale: config.mail_locale.clone(),
            ..ResetSettings::default()
        }
    }
}

///
/// Issues and redeems password reset tokens.
///
/// Every collaborator is handed in by the caller. The public methods only ever return a
/// ResetError - the detailed RecoveryError behind it is logged first and then erased so a
/// caller can't tell a missing token from a used or expired one.
///
pub struct PasswordResetService {
    codec: TokenCodec,
    tokens: Arc<dyn TokenStore>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn NotificationGateway>,
    urls: Arc<dyn ResetUrlBuilder>,
    hasher: PasswordAlgorithm,
    settings: ResetSettings,
}

impl PasswordResetService {
    pub fn new(
        codec: TokenCodec,
        tokens: Arc<dyn TokenStore>,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn NotificationGateway>,
        urls: Arc<dyn ResetUrlBuilder>,
        hasher: PasswordAlgorithm,
        settings: ResetSettings) -> Self {

        PasswordResetService { codec, tokens, credentials, notifier, urls, hasher, settings }
    }

    ///
    /// Mint a fresh token for the account with this email and mail the link. Returns Ok whether
    /// or not the email is known, and whether or not the mail went out.
    ///
    #[instrument(name = "reset:request", skip(self, email, request_ip, request_agent))]
    pub async fn request_reset(
        &self,
        email: &str,
        request_ip: Option<&str>,
        request_agent: Option<&str>,
        now: DateTime<Utc>) -> Result<(), ResetError> {

        start_reset::request_reset(self, email, request_ip, request_agent, now)
            .await
            .map_err(|err| to_public("request", err))
    }

    /// As request_reset, after checking the email is shaped like one.
    pub async fn request_form(
        &self,
        form: &ForgotForm,
        request_ip: Option<&str>,
        request_agent: Option<&str>,
        now: DateTime<Utc>) -> Result<(), ResetError> {

        form.validate().map_err(|err| to_public("request", err))?;
        self.request_reset(&form.email, request_ip, request_agent, now).await
    }

    ///
    /// Set a new password for the owner of raw_token and consume the token. Exactly one of any
    /// number of concurrent redemptions of the same token can succeed.
    ///
    #[instrument(name = "reset:redeem", skip(self, raw_token, new_password))]
    pub async fn redeem_reset(&self, raw_token: &str, new_password: &str, now: DateTime<Utc>) -> Result<(), ResetError> {
        complete_reset::redeem_reset(self, raw_token, new_password, now)
            .await
            .map_err(|err| to_public("redeem", err))
    }

    /// As redeem_reset, after applying the length and confirmation rules of the form.
    pub async fn redeem_form(&self, form: &ResetForm, now: DateTime<Utc>) -> Result<(), ResetError> {
        form.validate().map_err(|err| to_public("redeem", err))?;
        self.redeem_reset(&form.token, &form.new_password, now).await
    }

    ///
    /// Delete every token that expired at or before now. Storage hygiene only - expiry is always
    /// checked at redemption.
    ///
    #[instrument(name = "reset:purge", skip(self))]
    pub async fn purge_inert(&self, now: DateTime<Utc>) -> Result<u64, ResetError> {
        purge::purge_inert(self, now)
            .await
            .map_err(|err| to_public("purge", err))
    }
}

///
/// Log the detail then collapse it into what a caller is allowed to see.
///
fn to_public(operation: &str, err: RecoveryError) -> ResetError {
    let code = err.error_code();

    if code.is_token_state() {
        info!("Reset {} rejected: {}", operation, err);
    } else if code.is_validation() {
        debug!("Reset {} invalid: {}", operation, err);
    } else {
        error!("Reset {} failed: {}", operation, err);
    }

    ResetError::from(err)
}
