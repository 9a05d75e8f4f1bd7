//! Field rules for account forms.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{ApiError, ApiResult};

pub const EMAIL_MAX: usize = 255;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").expect("valid regex"));

fn invalid(msg: impl Into<String>) -> ApiError { ApiError::Validation(msg.into()) }

/// Trimmed, non-empty name.
pub fn name(raw: &str) -> ApiResult<String> {
    let v = raw.trim();
    if v.is_empty() { return Err(invalid("Name cannot be empty.")); }
    Ok(v.to_string())
}

/// Trimmed, lowercased email of at most 255 characters.
pub fn email(raw: &str) -> ApiResult<String> {
    let v = raw.trim();
    if v.is_empty() { return Err(invalid("Email cannot be empty.")); }
    if v.chars().count() > EMAIL_MAX {
        return Err(invalid(format!("Email is too long. Maximum {EMAIL_MAX} characters allowed.")));
    }
    if !EMAIL.is_match(v) { return Err(invalid("Please enter a valid email address.")); }
    Ok(v.to_lowercase())
}

/// Trimmed password between 8 and 128 characters.
pub fn password(raw: &str) -> ApiResult<String> {
    let v = raw.trim();
    let n = v.chars().count();
    if n == 0 { return Err(invalid("Password cannot be empty.")); }
    if n < PASSWORD_MIN {
        return Err(invalid(format!("Password must be at least {PASSWORD_MIN} characters long.")));
    }
    if n > PASSWORD_MAX {
        return Err(invalid(format!("Password is too long. Maximum {PASSWORD_MAX} characters allowed.")));
    }
    Ok(v.to_string())
}

pub fn confirmed(password: &str, confirm: &str) -> ApiResult<()> {
    if confirm.is_empty() { return Err(invalid("Confirm password cannot be empty.")); }
    if password.trim() != confirm.trim() { return Err(invalid("Passwords do not match.")); }
    Ok(())
}

pub fn agreed(is_agree: bool) -> ApiResult<()> {
    if !is_agree { return Err(invalid("You must agree to the Terms of Service and Privacy Policy.")); }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        assert_eq!(name("  Rose ").unwrap(), "Rose");
        assert!(name("   ").is_err());
    }

    #[test]
    fn emails() {
        assert_eq!(email(" Rose@Example.com ").unwrap(), "rose@example.com");
        assert!(email("rose@").is_err());
        assert!(email("").is_err());
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(email(&long), Err(ApiError::Validation(m)) if m.contains("too long")));
    }

    #[test]
    fn password_length_bounds() {
        assert!(password("1234567").is_err());
        assert!(password("12345678").is_ok());
        assert!(password(&"x".repeat(128)).is_ok());
        assert!(password(&"x".repeat(129)).is_err());
        assert!(password("  1234567  ").is_err());
    }

    #[test]
    fn confirmation_and_agreement() {
        assert!(confirmed("secret123", "secret123").is_ok());
        assert_eq!(confirmed("secret123", "secret124").unwrap_err(), ApiError::Validation("Passwords do not match.".into()));
        assert!(agreed(true).is_ok());
        assert!(agreed(false).is_err());
    }
}
