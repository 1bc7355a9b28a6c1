use std::sync::Arc;

use bcrypt::{hash, verify, BcryptError};

use crate::TgDiskError;

/// bcrypt cost for the access password hash
pub const DEFAULT_HASH_COST: u32 = 10;

/// Shared upload password, kept only as a bcrypt hash
#[derive(Clone)]
pub struct AccessGuard {
    hashed: Arc<str>,
}

impl AccessGuard {
    pub fn new(password: &str) -> Result<Self, BcryptError> {
        Self::with_cost(password, DEFAULT_HASH_COST)
    }

    pub fn with_cost(password: &str, cost: u32) -> Result<Self, BcryptError> {
        Ok(Self {
            hashed: hash(password, cost)?.into(),
        })
    }

    pub fn matches(&self, candidate: &str) -> bool {
        verify(candidate, &self.hashed).unwrap_or(false)
    }

    /// Check a request's password; verification runs on the blocking pool.
    pub async fn check(&self, candidate: Option<&str>) -> Result<(), TgDiskError> {
        let Some(candidate) = candidate else {
            return Err(TgDiskError::not_authenticated("Password required"));
        };

        let guard = self.clone();
        let candidate = candidate.to_string();
        let matched = tokio::task::spawn_blocking(move || guard.matches(&candidate))
            .await
            .map_err(|e| TgDiskError::general_error(format!("password check failed: {}", e)))?;

        if matched {
            Ok(())
        } else {
            Err(TgDiskError::not_authenticated("Incorrect password"))
        }
    }
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessGuard(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(password: &str) -> AccessGuard {
        AccessGuard::with_cost(password, 4).unwrap()
    }

    #[test]
    fn accepts_only_exact_password() {
        let guard = guard("s3cret");
        assert!(guard.matches("s3cret"));
        assert!(!guard.matches("s3cre"));
        assert!(!guard.matches("s3cret!"));
        assert!(!guard.matches("S3cret"));
        assert!(!guard.matches("x"));
        assert!(!guard.matches(""));
    }

    #[test]
    fn keeps_no_plaintext() {
        let guard = guard("s3cret");
        assert!(guard.hashed.starts_with("$2"));
        assert!(!guard.hashed.contains("s3cret"));
    }

    #[tokio::test]
    async fn check_maps_to_not_authenticated() {
        let guard = guard("pw");
        assert!(guard.check(Some("pw")).await.is_ok());

        let missing = guard.check(None).await.unwrap_err();
        assert_eq!(missing.code(), 401);
        let wrong = guard.check(Some("nope")).await.unwrap_err();
        assert_eq!(wrong.code(), 401);
    }

    #[test]
    fn debug_hides_password() {
        assert_eq!(format!("{:?}", guard("pw")), "AccessGuard(..)");
    }
}
