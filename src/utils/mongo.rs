use serde::Serialize;
use super::errors::RecoveryError;
use mongodb::error::ErrorKind;
use crate::utils::errors::ErrorCode;
use mongodb::{bson::{self, Document}, options::UpdateOptions};

///
/// Indicates if the MongoDB error is from a duplicate key violation.
///
pub fn is_duplicate_err(err: &mongodb::error::Error) -> bool {
    match &*err.kind {
        ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) => we.code == 11000 /* Duplicate insert */,
        _ => false,
    }
}

pub trait Persistable<T: Serialize> {
    ///
    /// Convert into a MongoDB BSON document.
    ///
    fn to_doc(&self) -> Result<Document, RecoveryError>;
}

impl<T: Serialize> Persistable<T> for T {
    fn to_doc(&self) -> Result<Document, RecoveryError> {
        let bson = bson::to_bson(self)?;

        match bson.as_document() {
            Some(doc) => Ok(doc.to_owned()),
            None => Err(ErrorCode::InvalidBSON.with_msg("Result is empty Document"))
        }
    }
}

pub fn upsert() -> UpdateOptions {
    UpdateOptions::builder().upsert(true).build()
}
