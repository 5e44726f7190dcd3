pub mod argon;
pub mod bcrypt;

use std::str::FromStr;
use serde::{Deserialize, Serialize};
use self::{argon::ArgonPolicy, bcrypt::BCryptPolicy};
use crate::utils::{config::Configuration, errors::{ErrorCode, RecoveryError}};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Algorithm {
    Argon,
    BCrypt,
}

///
/// How new passwords are hashed. Existing hashes of either kind always validate, see validate.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum PasswordAlgorithm {
    Argon(ArgonPolicy),
    BCrypt(BCryptPolicy),
}

impl Default for PasswordAlgorithm {
    fn default() -> Self {
        PasswordAlgorithm::BCrypt(BCryptPolicy::default())
    }
}

impl PasswordAlgorithm {
    pub fn from_config(config: &Configuration) -> Result<Self, RecoveryError> {
        match config.password_algorithm.to_lowercase().as_str() {
            "bcrypt" => Ok(PasswordAlgorithm::BCrypt(BCryptPolicy::with_cost(config.bcrypt_cost)?)),
            "argon"  => Ok(PasswordAlgorithm::Argon(ArgonPolicy::default())),
            other    => Err(ErrorCode::UnknownAlgorithmVariant
                .with_msg(&format!("Unknown password_algorithm {}, expected bcrypt or argon", other))),
        }
    }

    ///
    /// CPU-bound - callers on the async runtime should run this in the blocking thread pool.
    ///
    pub fn hash_into_phc(&self, plain_text_password: &str) -> Result<String, RecoveryError> {
        match self {
            PasswordAlgorithm::Argon(policy)  => policy.hash_into_phc(plain_text_password),
            PasswordAlgorithm::BCrypt(policy) => policy.hash_into_phc(plain_text_password),
        }
    }
}

///
/// Validate if the plain_text_password matches the hashed password provided.
///
/// The algorithm is constructed and used from the PHC string provided.
///
pub fn validate(plain_text_password: &str, phc: &str) -> Result<bool, RecoveryError> {
    match select(phc)? {
        Algorithm::Argon  => argon::validate(phc, plain_text_password),
        Algorithm::BCrypt => self::bcrypt::validate(phc, plain_text_password),
    }
}

///
/// Parse the first part of the phc string and return the algorithm.
///
fn select(phc: &str) -> Result<Algorithm, RecoveryError> {
    let mut split = phc.split('$');
    split.next(); /* Skip first it's blank */

    match split.next() {
        Some(algorithm) => Algorithm::from_str(algorithm),
        None => Err(ErrorCode::InvalidPHCFormat.with_msg("The PHC is invalid, there's no algorithm")),
    }
}

impl FromStr for Algorithm {
    type Err = RecoveryError;

    fn from_str(input: &str) -> Result<Algorithm, Self::Err> {
        match input {
            "argon2i"  |
            "argon2d"  |
            "argon2id" => Ok(Algorithm::Argon),
            "2a"       |
            "2b"       |
            "2x"       |
            "2y"       => Ok(Algorithm::BCrypt),
            _          => Err(ErrorCode::InvalidPHCFormat.with_msg(&format!("algorithm {} is un-handled", input))),
        }
    }
}
