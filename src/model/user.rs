use mongodb::bson;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

///
/// The slice of an account the reset flow reads and writes. Everything else about a user is owned
/// by the admin app.
///
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub phc: String,
    pub active: bool,
    pub account_non_locked: bool,
    pub last_password_change: Option<DateTime<Utc>>,
    pub password_expires_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: u32,
    pub email_verified: bool,
    pub must_change_password: bool,
}

impl User {
    ///
    /// Install a freshly hashed password and clear any lock-out state.
    ///
    pub fn apply_new_credential(&mut self, phc: String, now: DateTime<Utc>, password_expiry: Duration) {
        self.phc = phc;
        self.last_password_change = Some(now);
        self.password_expires_at = Some(now + password_expiry);
        self.must_change_password = false;
        self.failed_login_attempts = 0;
        self.account_non_locked = true;
    }
}

///
/// Emails are matched case-insensitively, so they are stored and queried in this form.
///
pub fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserDB {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub phc: String,
    pub active: bool,
    pub account_non_locked: bool,
    pub last_password_change: Option<bson::DateTime>,
    pub password_expires_at: Option<bson::DateTime>,
    pub failed_login_attempts: i64,
    pub email_verified: bool,
    pub must_change_password: bool,
}

impl From<&User> for UserDB {
    fn from(user: &User) -> Self {
        UserDB {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            email: normalise_email(&user.email),
            phc: user.phc.clone(),
            active: user.active,
            account_non_locked: user.account_non_locked,
            last_password_change: user.last_password_change.map(bson::DateTime::from_chrono),
            password_expires_at: user.password_expires_at.map(bson::DateTime::from_chrono),
            failed_login_attempts: user.failed_login_attempts as i64,
            email_verified: user.email_verified,
            must_change_password: user.must_change_password,
        }
    }
}

impl From<UserDB> for User {
    fn from(user: UserDB) -> Self {
        User {
            user_id: user.user_id,
            username: user.username,
            email: user.email,
            phc: user.phc,
            active: user.active,
            account_non_locked: user.account_non_locked,
            last_password_change: user.last_password_change.map(Into::into),
            password_expires_at: user.password_expires_at.map(Into::into),
            failed_login_attempts: user.failed_login_attempts.max(0) as u32,
            email_verified: user.email_verified,
            must_change_password: user.must_change_password,
        }
    }
}
