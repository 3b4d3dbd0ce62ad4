pub mod extractor;
pub mod jwt;
pub mod password;

/// Canonical form of an email: stored, looked up and rate limited under this key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
