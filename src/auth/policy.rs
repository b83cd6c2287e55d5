use std::sync::LazyLock;

use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// A password passes when it is at least `MIN_PASSWORD_LEN` characters long
/// and mixes lowercase, uppercase and digits.
pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Lowercased, trimmed address, or `None` when it does not look like one.
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    EMAIL_RE.is_match(&email).then_some(email)
}
