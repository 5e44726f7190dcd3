use tracing::instrument;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use super::{prelude::*, TokenStore};
use mongodb::{Client, ClientSession, Collection, Database, bson::{self, doc}};
use crate::{model::token::{ResetToken, ResetTokenDB, TokenDigest}, utils::{errors::{ErrorCode, RecoveryError}, mongo::{self, Persistable}}};

///
/// Reset tokens in the ResetTokens collection.
///
pub struct MongoTokenStore {
    client: Client,
    db: Database,
    transactions: bool,
}

impl MongoTokenStore {
    ///
    /// Transactions need a replica set or mongos - pass false for a standalone server and
    /// invalidate-then-save falls back to two separate writes.
    ///
    pub fn new(client: Client, db_name: &str, transactions: bool) -> Self {
        let db = client.database(db_name);
        MongoTokenStore { client, db, transactions }
    }

    fn tokens(&self) -> Collection<ResetTokenDB> {
        self.db.collection::<ResetTokenDB>(RESET_TOKENS)
    }

    async fn replace_in_session(&self, session: &mut ClientSession, token: &ResetToken, now: DateTime<Utc>) -> Result<(), RecoveryError> {
        self.tokens().update_many_with_session(
                live_for_user(&token.user_id, now),
                doc!{ "$set": { USED_AT: bson::DateTime::from_chrono(now) } },
                None,
                session)
            .await?;

        let fields = ResetTokenDB::from(token).to_doc()?;
        self.tokens().update_one_with_session(
                doc!{ TOKEN_ID: token.token_id.as_str() },
                doc!{ "$set": fields },
                mongo::upsert(),
                session)
            .await
            .map_err(duplicate_digest)?;

        Ok(())
    }
}

///
/// Unused tokens for the user that are still inside their TTL.
///
fn live_for_user(user_id: &str, now: DateTime<Utc>) -> bson::Document {
    doc!{
        USER_ID: user_id,
        USED_AT: bson::Bson::Null,
        EXPIRES_AT: { "$gt": bson::DateTime::from_chrono(now) },
    }
}

fn duplicate_digest(err: mongodb::error::Error) -> RecoveryError {
    match mongo::is_duplicate_err(&err) {
        true  => ErrorCode::DuplicateTokenDigest.with_msg("A reset token with the same digest already exists"),
        false => RecoveryError::from(err),
    }
}

#[async_trait]
impl TokenStore for MongoTokenStore {
    #[instrument(name = "tokens:save", skip(self, token), fields(token_id = %token.token_id))]
    async fn save(&self, token: &ResetToken) -> Result<(), RecoveryError> {
        let fields = ResetTokenDB::from(token).to_doc()?;
        self.tokens().update_one(
                doc!{ TOKEN_ID: token.token_id.as_str() },
                doc!{ "$set": fields },
                mongo::upsert())
            .await
            .map_err(duplicate_digest)?;

        Ok(())
    }

    #[instrument(name = "tokens:find_by_digest", skip(self, digest))]
    async fn find_by_digest(&self, digest: &TokenDigest) -> Result<Option<ResetToken>, RecoveryError> {
        let token = self.tokens()
            .find_one(doc!{ TOKEN_DIGEST: digest.as_str() }, None)
            .await?;

        Ok(token.map(ResetToken::from))
    }

    #[instrument(name = "tokens:invalidate", skip(self))]
    async fn invalidate_all_live_for_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64, RecoveryError> {
        let result = self.tokens()
            .update_many(
                live_for_user(user_id, now),
                doc!{ "$set": { USED_AT: bson::DateTime::from_chrono(now) } },
                None)
            .await?;

        Ok(result.modified_count)
    }

    #[instrument(name = "tokens:replace", skip(self, token), fields(token_id = %token.token_id))]
    async fn replace_live_for_user(&self, token: &ResetToken, now: DateTime<Utc>) -> Result<(), RecoveryError> {
        if !self.transactions {
            self.invalidate_all_live_for_user(&token.user_id, now).await?;
            return self.save(token).await
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.replace_in_session(&mut session, token, now).await {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            },
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!("Unable to abort reset token transaction: {}", abort_err);
                }
                Err(err)
            },
        }
    }

    #[instrument(name = "tokens:mark_used", skip(self))]
    async fn mark_used(&self, token_id: &str, now: DateTime<Utc>) -> Result<bool, RecoveryError> {
        // Conditional on used_at still being null - a concurrent redemption matches nothing.
        let result = self.tokens()
            .update_one(
                doc!{ TOKEN_ID: token_id, USED_AT: bson::Bson::Null },
                doc!{ "$set": { USED_AT: bson::DateTime::from_chrono(now) } },
                None)
            .await?;

        Ok(result.modified_count == 1)
    }

    #[instrument(name = "tokens:purge", skip(self))]
    async fn purge_inert(&self, now: DateTime<Utc>) -> Result<u64, RecoveryError> {
        let result = self.tokens()
            .delete_many(doc!{ EXPIRES_AT: { "$lte": bson::DateTime::from_chrono(now) } }, None)
            .await?;

        Ok(result.deleted_count)
    }
}
