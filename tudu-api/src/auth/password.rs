use crate::domain::AuthError;

/// bcrypt is deliberately slow; call these through `spawn_blocking` from
/// async contexts.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost)
        .map_err(|err| AuthError::Internal(format!("failed to hash password: {err}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash)
        .map_err(|err| AuthError::Internal(format!("failed to verify password: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn hash_verifies_against_the_original_password() {
        let hash = hash_password("correct horse battery", TEST_COST).unwrap();

        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn hash_is_not_the_clear_password() {
        let hash = hash_password("hunter2hunter2", TEST_COST).unwrap();

        assert_ne!(hash, "hunter2hunter2");
        assert!(hash.starts_with("$2"));
    }
}
