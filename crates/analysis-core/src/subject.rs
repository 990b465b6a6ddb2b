use crate::ThesisError;

const MAX_SUBJECT_LEN: usize = 64;

/// Validate a subject identifier and return its trimmed form.
///
/// Accepted: 1-64 characters of ASCII letters, digits and `. _ - : /`
/// (covers tickers like `BTC`, `BRK.B`, `BTC-USD`, `ETH/USDT`, `bitcoin`).
pub fn validate_subject(subject: &str) -> Result<String, ThesisError> {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        return Err(ThesisError::InvalidSubject("subject is empty".to_string()));
    }
    if trimmed.len() > MAX_SUBJECT_LEN {
        return Err(ThesisError::InvalidSubject(format!(
            "subject is longer than {} characters",
            MAX_SUBJECT_LEN
        )));
    }
    if let Some(bad) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '/')))
    {
        return Err(ThesisError::InvalidSubject(format!(
            "subject '{}' contains invalid character {:?}",
            trimmed, bad
        )));
    }
    if !trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(ThesisError::InvalidSubject(format!(
            "subject '{}' has no alphanumeric characters",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_identifiers() {
        for s in ["BTC", "bitcoin", "BRK.B", "BTC-USD", "ETH/USDT", "  AAPL  "] {
            assert!(validate_subject(s).is_ok(), "{} should be valid", s);
        }
        assert_eq!(validate_subject("  AAPL ").unwrap(), "AAPL");
    }

    #[test]
    fn test_rejects_empty_and_malformed() {
        assert!(matches!(validate_subject(""), Err(ThesisError::InvalidSubject(_))));
        assert!(matches!(validate_subject("   "), Err(ThesisError::InvalidSubject(_))));
        assert!(matches!(validate_subject("BTC USD"), Err(ThesisError::InvalidSubject(_))));
        assert!(matches!(validate_subject("$BTC"), Err(ThesisError::InvalidSubject(_))));
        assert!(matches!(validate_subject("---"), Err(ThesisError::InvalidSubject(_))));
        assert!(matches!(
            validate_subject(&"A".repeat(65)),
            Err(ThesisError::InvalidSubject(_))
        ));
    }
}
