use std::fmt;
use mongodb::bson;
use bcrypt::BcryptError;
use derive_more::Display;
use tokio::task::JoinError;

#[cfg(feature = "kafka")]
use rdkafka::{error::KafkaError, message::{Message, OwnedMessage}};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorCode {
    HashThreadingIssue              = 0401,
    UnableToReadCredentials         = 0500,
    InvalidConfiguration            = 0501,
    MongoDBError                    = 0503,
    InvalidBSON                     = 0504,
    InvalidJSON                     = 0505,
    KafkaSendError                  = 0506,
    InvalidAlgorthimConfig          = 0508,
    HashingError                    = 0509,
    InvalidPHCFormat                = 0510,
    UnknownAlgorithmVariant         = 0511,
    InvalidUrl                      = 0512,
    DuplicateTokenDigest            = 0514,
    CredentialUpdateFailed          = 0515,
    NotificationFailed              = 0516,
    EmailNotSpecified               = 2000,
    InvalidEmail                    = 2001,
    PasswordTooShort                = 2002,
    PasswordTooLong                 = 2003,
    PasswordMismatch                = 2004,
    TokenNotSpecified               = 2005,
    TokenNotFound                   = 2200,
    TokenAlreadyUsed                = 2201,
    TokenExpired                    = 2202,
    TokenOwnerMissing               = 2203,
    TokenClaimLost                  = 2204,
    PasswordNotSpecified            = 2301,
}

impl ErrorCode {
    pub fn with_msg(&self, message: &str) -> RecoveryError {
        RecoveryError::new(*self, message)
    }

    ///
    /// The token is absent, used, expired or otherwise unusable. These must all look the same to a caller.
    ///
    pub fn is_token_state(&self) -> bool {
        use ErrorCode::*;
        matches!(self, TokenNotFound | TokenAlreadyUsed | TokenExpired | TokenOwnerMissing | TokenClaimLost)
    }

    pub fn is_validation(&self) -> bool {
        use ErrorCode::*;
        matches!(self,
            EmailNotSpecified    |
            InvalidEmail         |
            PasswordTooShort     |
            PasswordTooLong      |
            PasswordMismatch     |
            TokenNotSpecified    |
            PasswordNotSpecified)
    }
}

///
/// The detailed, internal error. Never handed to a caller of the reset service as-is, see ResetError.
///
#[derive(Clone, Debug, PartialEq)]
pub struct RecoveryError {
    error_code: ErrorCode,
    message: String,
}

impl RecoveryError {
    pub fn new(error_code: ErrorCode, message: &str) -> Self {
        RecoveryError { error_code, message: message.to_string() }
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code as u32, self.message)
    }
}

impl std::error::Error for RecoveryError {}

///
/// The only errors the reset service lets out. Whether a token was missing, used or expired is
/// deliberately collapsed into InvalidToken.
///
#[derive(Clone, Debug, Display, PartialEq)]
pub enum ResetError {
    #[display(fmt = "The reset link is invalid or has expired")]
    InvalidToken,

    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "The service is temporarily unavailable, please try again later")]
    Unavailable,
}

impl std::error::Error for ResetError {}

impl From<RecoveryError> for ResetError {
    fn from(error: RecoveryError) -> Self {
        let code = error.error_code();

        if code.is_token_state() {
            ResetError::InvalidToken
        } else if code.is_validation() {
            ResetError::Validation(error.message)
        } else {
            ResetError::Unavailable
        }
    }
}

impl From<config::ConfigError> for RecoveryError {
    fn from(error: config::ConfigError) -> Self {
        ErrorCode::InvalidConfiguration.with_msg(&format!("The service configuration is not correct: {}", error))
    }
}

impl From<argon2::Error> for RecoveryError {
    fn from(error: argon2::Error) -> Self {
        ErrorCode::InvalidAlgorthimConfig.with_msg(&format!("Invalid configuration for algorithm: {}", error))
    }
}

impl From<password_hash::Error> for RecoveryError {
    fn from(error: password_hash::Error) -> Self {
        ErrorCode::HashingError.with_msg(&format!("Unable to hash password: {}", error))
    }
}

impl From<BcryptError> for RecoveryError {
    fn from(error: BcryptError) -> Self {
        ErrorCode::HashingError.with_msg(&format!("Unable to hash or verify with bcrypt: {}", error))
    }
}

impl From<serde_json::Error> for RecoveryError {
    fn from(error: serde_json::Error) -> Self {
        ErrorCode::InvalidJSON.with_msg(&format!("Unable to convert to json: {}", error))
    }
}

impl From<url::ParseError> for RecoveryError {
    fn from(error: url::ParseError) -> Self {
        ErrorCode::InvalidUrl.with_msg(&format!("Unable to build url: {}", error))
    }
}

impl From<mongodb::error::Error> for RecoveryError {
    fn from(error: mongodb::error::Error) -> Self {
        ErrorCode::MongoDBError.with_msg(&format!("MongoDB error: {}", error))
    }
}

impl From<bson::ser::Error> for RecoveryError {
    fn from(error: bson::ser::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to serialise BSON: {}", error))
    }
}

impl From<bson::de::Error> for RecoveryError {
    fn from(error: bson::de::Error) -> Self {
        ErrorCode::InvalidBSON.with_msg(&format!("Unable to deserialise BSON: {}", error))
    }
}

impl From<JoinError> for RecoveryError {
    fn from(error: JoinError) -> Self {
        ErrorCode::HashThreadingIssue.with_msg(&format!("Unable to hash: {}", error))
    }
}

#[cfg(feature = "kafka")]
impl From<KafkaError> for RecoveryError {
    fn from(error: KafkaError) -> Self {
        ErrorCode::KafkaSendError.with_msg(&format!("Kafka error: {}", error))
    }
}

#[cfg(feature = "kafka")]
impl From<(KafkaError, OwnedMessage)> for RecoveryError {
    fn from((error, message): (KafkaError, OwnedMessage)) -> Self {
        // The payload can carry a reset link so only the topic is reported.
        ErrorCode::KafkaSendError.with_msg(&format!("Kafka error: {}, topic: {}", error, message.topic()))
    }
}
