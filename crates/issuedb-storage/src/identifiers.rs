//! Validators for identifiers interpolated directly into SQL.
//!
//! Ordinary values always go through parameter binding. These validators
//! gate the handful of places — table names, refs, database names — where
//! the backend requires the identifier to be part of the SQL text itself.

/// Errors produced by the identifier validators.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier is too long: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("identifier contains disallowed character {ch:?}")]
    DisallowedChar { ch: char },

    #[error("identifier must start with a letter or underscore, got {ch:?}")]
    InvalidStart { ch: char },
}

const REF_MAX_LEN: usize = 120;
const NAME_MAX_LEN: usize = 64;

/// Validates a branch/ref-style identifier.
///
/// Non-empty, at most 120 characters, charset `[A-Za-z0-9_/.-]`. No quotes,
/// semicolons, or spaces.
pub fn validate_ref(s: &str) -> Result<(), IdentifierError> {
    if s.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if s.len() > REF_MAX_LEN {
        return Err(IdentifierError::TooLong {
            len: s.len(),
            max: REF_MAX_LEN,
        });
    }
    for ch in s.chars() {
        if !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '/' | '.' | '-')) {
            return Err(IdentifierError::DisallowedChar { ch });
        }
    }
    Ok(())
}

/// Validates a SQL table name.
///
/// Non-empty, at most 64 characters, first character alphabetic or
/// underscore, charset `[A-Za-z0-9_]`.
pub fn validate_table_name(s: &str) -> Result<(), IdentifierError> {
    if s.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if s.len() > NAME_MAX_LEN {
        return Err(IdentifierError::TooLong {
            len: s.len(),
            max: NAME_MAX_LEN,
        });
    }
    let first = s.chars().next().expect("non-empty checked above");
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(IdentifierError::InvalidStart { ch: first });
    }
    for ch in s.chars() {
        if !(ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(IdentifierError::DisallowedChar { ch });
        }
    }
    Ok(())
}

/// Validates a database name: as [`validate_table_name`], but hyphens are
/// also allowed. Backticks are explicitly rejected.
pub fn validate_database_name(s: &str) -> Result<(), IdentifierError> {
    if s.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if s.len() > NAME_MAX_LEN {
        return Err(IdentifierError::TooLong {
            len: s.len(),
            max: NAME_MAX_LEN,
        });
    }
    let first = s.chars().next().expect("non-empty checked above");
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(IdentifierError::InvalidStart { ch: first });
    }
    for ch in s.chars() {
        if ch == '`' {
            return Err(IdentifierError::DisallowedChar { ch });
        }
        if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
            return Err(IdentifierError::DisallowedChar { ch });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ref_accepts_normal_branch_names() {
        assert!(validate_ref("refs/heads/main").is_ok());
        assert!(validate_ref("feature/add-thing_v2.1").is_ok());
    }

    #[test]
    fn ref_rejects_empty() {
        assert_eq!(validate_ref(""), Err(IdentifierError::Empty));
    }

    #[test]
    fn ref_rejects_injection_payloads() {
        assert!(validate_ref("main'; DROP TABLE issues; --").is_err());
        assert!(validate_ref("main OR 1=1").is_err());
        assert!(validate_ref("main\"").is_err());
        assert!(validate_ref("a; b").is_err());
    }

    #[test]
    fn ref_rejects_too_long() {
        let s = "a".repeat(121);
        assert!(matches!(
            validate_ref(&s),
            Err(IdentifierError::TooLong { .. })
        ));
    }

    #[test]
    fn table_name_accepts_identifiers() {
        assert!(validate_table_name("issues").is_ok());
        assert!(validate_table_name("_dirty_issues").is_ok());
        assert!(validate_table_name("decision_points_v2").is_ok());
    }

    #[test]
    fn table_name_rejects_leading_digit() {
        assert!(matches!(
            validate_table_name("1issues"),
            Err(IdentifierError::InvalidStart { .. })
        ));
    }

    #[test]
    fn table_name_rejects_injection_payloads() {
        assert!(validate_table_name("issues; DROP TABLE users").is_err());
        assert!(validate_table_name("issues--").is_err());
        assert!(validate_table_name("issues WHERE 1=1").is_err());
    }

    #[test]
    fn database_name_allows_hyphen() {
        assert!(validate_database_name("my-project-db").is_ok());
    }

    #[test]
    fn database_name_rejects_backtick() {
        assert!(validate_database_name("db`; --").is_err());
    }
}
