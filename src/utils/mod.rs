use bcrypt::{DEFAULT_COST, hash, verify};

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_succeeds_only_for_original_plaintext() {
        let hashed = hash_password("pw1").unwrap();
        assert_ne!(hashed, "pw1");
        assert!(verify_password("pw1", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
        // 大小写敏感
        assert!(!verify_password("PW1", &hashed).unwrap());
    }
}
