use tracing::instrument;
use async_trait::async_trait;
use super::{prelude::*, CredentialStore};
use mongodb::{Collection, Database, bson::{self, doc}};
use crate::{model::user::{normalise_email, User, UserDB}, utils::errors::{ErrorCode, RecoveryError}};

///
/// User accounts in the Users collection.
///
pub struct MongoCredentialStore {
    db: Database,
}

impl MongoCredentialStore {
    pub fn new(db: Database) -> Self {
        MongoCredentialStore { db }
    }

    fn users(&self) -> Collection<UserDB> {
        self.db.collection::<UserDB>(USERS)
    }
}

#[async_trait]
impl CredentialStore for MongoCredentialStore {
    #[instrument(name = "users:find_by_email", skip(self, email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RecoveryError> {
        let user = self.users()
            .find_one(doc!{ EMAIL: normalise_email(email) }, None)
            .await?;

        Ok(user.map(User::from))
    }

    #[instrument(name = "users:find_by_id", skip(self))]
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RecoveryError> {
        let user = self.users()
            .find_one(doc!{ USER_ID: user_id }, None)
            .await?;

        Ok(user.map(User::from))
    }

    #[instrument(name = "users:update_credential", skip(self, user), fields(user_id = %user.user_id))]
    async fn update_credential(&self, user: &User) -> Result<(), RecoveryError> {
        let result = self.users()
            .update_one(
                doc!{ USER_ID: user.user_id.as_str() },
                doc!{ "$set": {
                    PHC: user.phc.as_str(),
                    LAST_PASSWORD_CHANGE: user.last_password_change.map(bson::DateTime::from_chrono),
                    PASSWORD_EXPIRES_AT: user.password_expires_at.map(bson::DateTime::from_chrono),
                    MUST_CHANGE_PASSWORD: user.must_change_password,
                    FAILED_LOGIN_ATTEMPTS: user.failed_login_attempts as i64,
                    ACCOUNT_NON_LOCKED: user.account_non_locked,
                }},
                None)
            .await?;

        match result.matched_count {
            0 => Err(ErrorCode::CredentialUpdateFailed.with_msg(&format!("User {} no longer exists", user.user_id))),
            _ => Ok(()),
        }
    }
}
