use crate::error::AppError;
use actix_web::web;
use bcrypt::{hash, verify};

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

/// Salted bcrypt hashing at a fixed cost.
///
/// The async methods run bcrypt on actix's blocking pool so request workers are not
/// stalled by the hash work.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let cost = self.cost;
        web::block(move || hash_password(&password, cost)).await?
    }

    /// bcrypt's own verification does the comparison.
    pub async fn verify(&self, password: String, hashed_password: String) -> Result<bool, AppError> {
        web::block(move || verify_password(&password, &hashed_password)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_password_hashing_and_verification() {
        let password = "test_password123";
        let hashed = hash_password(password, TEST_COST).unwrap();

        assert_ne!(hashed, password);
        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("same", TEST_COST).unwrap();
        let second = hash_password("same", TEST_COST).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        match verify_password("test_password123", "invalidhashformat") {
            Err(AppError::InternalServerError(msg)) => {
                assert!(msg.contains("Failed to verify password"));
            }
            Ok(false) => {}
            Ok(true) => panic!("Password verification should fail for invalid hash format"),
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    #[actix_rt::test]
    async fn test_hasher_runs_on_blocking_pool() {
        let hasher = PasswordHasher::new(TEST_COST);
        let hashed = hasher.hash("hunter22".into()).await.unwrap();
        assert!(hasher.verify("hunter22".into(), hashed.clone()).await.unwrap());
        assert!(!hasher.verify("hunter23".into(), hashed).await.unwrap());
    }
}
