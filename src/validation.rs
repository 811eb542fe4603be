//! Input rules for credentials and profile fields.

use regex::Regex;
use std::sync::LazyLock;

pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 20;

/// Symbols that satisfy the "special character" password rule.
const PASSWORD_SYMBOLS: &str = "@#$%^&+=";

// Anything before the @, no whitespace after it.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)@(\S+)$").expect("valid regex"));

/// Trim and lowercase an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Loose shape check on the email as submitted, before normalization.
/// Trailing whitespace fails the `\S+` domain part.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// 8-20 characters with a digit, a lowercase letter, an uppercase letter and
/// one of `@#$%^&+=`. Whitespace anywhere is rejected.
pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len) {
        return false;
    }
    if password.chars().any(char::is_whitespace) {
        return false;
    }

    password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}
