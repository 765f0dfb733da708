// =====================================================================================
// VALIDATION SERVICE - REQUEST FIELD CHECKS
// =====================================================================================

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;
use uuid::Uuid;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,15}$").expect("phone pattern compiles"));

const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Stateless field validators. Each `check_*` returns the client-facing
/// message of the first rule that fails.
pub struct ValidationService;

impl ValidationService {
    pub fn validate_email(email: &str) -> bool {
        EMAIL_REGEX.is_match(email) && email.len() <= MAX_EMAIL_LENGTH
    }

    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn check_email(email: &str) -> Result<String, String> {
        let normalized = Self::normalize_email(email);
        if Self::validate_email(&normalized) {
            Ok(normalized)
        } else {
            Err("Please enter a valid email".to_string())
        }
    }

    pub fn check_password_length(password: &str) -> Result<(), String> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err("Password must be at least 8 characters".to_string());
        }
        Ok(())
    }

    pub fn check_password_strength(password: &str) -> Result<(), String> {
        Self::check_password_length(password)?;

        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());

        if !(has_lower && has_upper && has_digit) {
            return Err(
                "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                    .to_string(),
            );
        }
        Ok(())
    }

    pub fn validate_phone(phone: &str) -> bool {
        PHONE_REGEX.is_match(phone)
    }

    pub fn check_phone(phone: &str) -> Result<(), String> {
        if Self::validate_phone(phone) {
            Ok(())
        } else {
            Err("Please enter a valid phone number".to_string())
        }
    }

    /// Trimmed name with a length in `min..=max` characters.
    pub fn check_name(name: &str, min: usize, max: usize) -> Result<String, String> {
        let trimmed = name.trim();
        let length = trimmed.chars().count();
        if length < min || length > max {
            return Err(format!("Name must be between {} and {} characters", min, max));
        }
        Ok(trimmed.to_string())
    }

    pub fn validate_uuid(value: &str) -> bool {
        Uuid::parse_str(value).is_ok()
    }

    pub fn validate_text_length(text: &str, max: usize) -> bool {
        text.chars().count() <= max
    }

    /// `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
    pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
    }

    /// `HH:MM`, `HH:MM:SS` or `h:mm AM/PM`.
    pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
        let value = value.trim();
        let upper = value.to_ascii_uppercase();

        ["%H:%M:%S", "%H:%M"]
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
            .or_else(|| {
                ["%I:%M %p", "%I:%M%p", "%I:%M:%S %p"]
                    .iter()
                    .find_map(|format| NaiveTime::parse_from_str(&upper, format).ok())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized_and_checked() {
        assert_eq!(ValidationService::check_email("  Jane.Doe@Example.COM ").unwrap(), "jane.doe@example.com");
        assert_eq!(ValidationService::check_email("jane@").unwrap_err(), "Please enter a valid email");
        assert!(!ValidationService::validate_email(&format!("{}@example.com", "a".repeat(250))));
    }

    #[test]
    fn password_rules() {
        assert!(ValidationService::check_password_strength("Secret123").is_ok());
        assert_eq!(
            ValidationService::check_password_strength("Sec1").unwrap_err(),
            "Password must be at least 8 characters"
        );
        assert!(ValidationService::check_password_strength("alllowercase1").is_err());
        assert!(ValidationService::check_password_strength("NoDigitsHere").is_err());
    }

    #[test]
    fn phone_numbers_are_digits_only() {
        assert!(ValidationService::validate_phone("9876543210"));
        assert!(ValidationService::validate_phone("441234567890123"));
        assert!(!ValidationService::validate_phone("+919876543210"));
        assert!(!ValidationService::validate_phone("12345"));
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(ValidationService::check_name("  Al ", 2, 50).unwrap(), "Al");
        assert_eq!(
            ValidationService::check_name("A", 2, 50).unwrap_err(),
            "Name must be between 2 and 50 characters"
        );
        assert!(ValidationService::check_name(&"x".repeat(101), 2, 100).is_err());
    }

    #[test]
    fn dates_accept_plain_and_rfc3339() {
        let expected = NaiveDate::from_ymd_opt(2030, 1, 15);
        assert_eq!(ValidationService::parse_iso_date("2030-01-15"), expected);
        assert_eq!(ValidationService::parse_iso_date("2030-01-15T09:30:00Z"), expected);
        assert_eq!(ValidationService::parse_iso_date("15_1_2030"), None);
        assert_eq!(ValidationService::parse_iso_date("2030-02-30"), None);
    }

    #[test]
    fn times_accept_24h_and_12h() {
        let ten_thirty = NaiveTime::from_hms_opt(10, 30, 0);
        assert_eq!(ValidationService::parse_time_of_day("10:30"), ten_thirty);
        assert_eq!(ValidationService::parse_time_of_day("10:30:00"), ten_thirty);
        assert_eq!(ValidationService::parse_time_of_day("10:30 AM"), ten_thirty);
        assert_eq!(ValidationService::parse_time_of_day("02:15 pm"), NaiveTime::from_hms_opt(14, 15, 0));
        assert_eq!(ValidationService::parse_time_of_day("25:00"), None);
        assert_eq!(ValidationService::parse_time_of_day("noon"), None);
    }

    #[test]
    fn uuid_and_text_length() {
        assert!(ValidationService::validate_uuid("3f1c7a7e-8f7e-4d3e-9a55-0c8f1b5d1a11"));
        assert!(!ValidationService::validate_uuid("64b7f0c2e1d3a4b5c6d7e8f9"));
        assert!(ValidationService::validate_text_length("short", 10));
        assert!(!ValidationService::validate_text_length(&"x".repeat(1001), 1000));
    }
}
