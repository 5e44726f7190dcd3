use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use crate::utils::errors::RecoveryError;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ArgonPolicy {
    pub parallelism: u32,
    pub memory_size_kb: u32,
    pub iterations: u32,
}

pub fn validate(phc: &str, plain_text_password: &str) -> Result<bool, RecoveryError> {
    let parsed_hash = PasswordHash::new(phc)?;
    match argon2::Argon2::default().verify_password(plain_text_password.as_bytes(), &parsed_hash) {
        Ok(_)  => Ok(true),
        Err(_) => Ok(false),
    }
}

impl Default for ArgonPolicy {
    fn default() -> Self {
        ArgonPolicy {
            parallelism: 1,
            memory_size_kb: 1024 * 16,
            iterations: 2,
        }
    }
}

impl ArgonPolicy {
    pub fn hash_into_phc(&self, plain_text_password: &str) -> Result<String, RecoveryError> {
        let salt = SaltString::generate(&mut OsRng);

        let params = argon2::Params::new(self.memory_size_kb, self.iterations, self.parallelism, None)?;
        let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        // Hash password to PHC string ($argon2id$v=19$...)
        Ok(argon2.hash_password(plain_text_password.as_bytes(), &salt)?.to_string())
    }
}
