use serde::{Deserialize, Serialize};
use crate::utils::errors::{ErrorCode, RecoveryError};

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BCryptPolicy {
    pub cost: u32
}

pub fn validate(phc: &str, plain_text_password: &str) -> Result<bool, RecoveryError> {
    Ok(bcrypt::verify(plain_text_password, phc)?)
}

impl Default for BCryptPolicy {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST
        }
    }
}

impl BCryptPolicy {
    ///
    /// The bcrypt crate refuses any other cost, but only when the first password is hashed.
    ///
    pub fn with_cost(cost: u32) -> Result<Self, RecoveryError> {
        match (MIN_COST..=MAX_COST).contains(&cost) {
            true  => Ok(Self { cost }),
            false => Err(ErrorCode::InvalidAlgorthimConfig
                .with_msg(&format!("bcrypt_cost {} is outside {}..={}", cost, MIN_COST, MAX_COST))),
        }
    }

    ///
    /// Produces a $2b$ hash. bcrypt only looks at the first 72 bytes of the password.
    ///
    pub fn hash_into_phc(&self, plain_text_password: &str) -> Result<String, RecoveryError> {
        Ok(bcrypt::hash(plain_text_password, self.cost)?)
    }
}
