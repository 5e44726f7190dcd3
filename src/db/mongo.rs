use std::fs;
use tracing::{debug, info};
use crate::db::prelude::*;
use crate::utils::errors::ErrorCode;
use crate::utils::errors::RecoveryError;
use crate::utils::config::Configuration;
use mongodb::{Client, Database, bson::{Document, doc}, options::ClientOptions};

///
/// Run any schema-like updates against MongoDB that haven't been run yet.
///
pub async fn update_mongo(db: &Database) -> Result<(), RecoveryError> {
    create_init_indexes(db).await?;
    Ok(())
}

async fn create_init_indexes(db: &Database) -> Result<(), RecoveryError> {
    // Note: the current driver doesn't yet support creating indexes on collections, so the dbcommand must be used instead.
    // https://docs.mongodb.com/manual/reference/command/createIndexes/#createindexes

    db.run_command(doc! { "createIndexes": RESET_TOKENS, "indexes": [
        { "key": { TOKEN_ID: 1 },     "name": "idx_token_id",     "unique": true },
        { "key": { TOKEN_DIGEST: 1 }, "name": "idx_token_digest", "unique": true },
        { "key": { USER_ID: 1 },      "name": "idx_user_id",      "unique": false }] }, None).await?;

    db.run_command(doc! { "createIndexes": USERS, "indexes": [
        { "key": { USER_ID: 1 }, "name": "idx_user_id", "unique": true },
        { "key": { EMAIL: 1 },   "name": "idx_email",   "unique": true }] }, None).await?;

    Ok(())
}

///
/// Connect to MongoDB. The client, not just the database, is returned as sessions (transactions)
/// are started from it.
///
pub async fn get_mongo_client(app_name: &str, config: &Configuration) -> Result<Client, RecoveryError> {

    let uri = match &config.mongo_credentials {
        Some(filename) => {
            debug!("Loading MongoDB credentials from secrets file {}", filename);

            // Read username and password from a secrets file.
            let credentials = fs::read_to_string(filename)
                .map_err(|err| ErrorCode::UnableToReadCredentials
                    .with_msg(&format!("Unable to read credentials from {}: {}", filename, err)))?;
            let mut credentials = credentials.lines();
            let uri = config.mongo_uri.replace("$USERNAME", credentials.next().unwrap_or_default());
            uri.replace("$PASSWORD", credentials.next().unwrap_or_default())
        },
        None => config.mongo_uri.clone(),
    };

    // Parse the uri now.
    let mut client_options = ClientOptions::parse(&uri).await?;

    // Manually set an option.
    client_options.app_name = Some(app_name.to_string());

    // Get a handle to the deployment.
    let client = Client::with_options(client_options)?;

    info!("Connecting to MongoDB...");

    ping(&client.database(&config.db_name)).await?;

    info!("Connected to MongoDB");
    Ok(client)
}

pub async fn ping(db: &Database) -> Result<Document, RecoveryError> {
    Ok(db.run_command(doc! { "ping": 1 }, None).await?)
}
