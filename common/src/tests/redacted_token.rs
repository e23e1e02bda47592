// Unit tests for the handshake credential wrapper

use crate::RedactedToken;

/// **VALUE**: Verifies that neither Debug nor Display leak the token.
///
/// **WHY THIS MATTERS**: The supervisor logs its settings and connection attempts.
/// A derived Debug impl would print the credential into every log file.
///
/// **BUG THIS CATCHES**: Would catch someone replacing the manual impls with
/// `#[derive(Debug)]`.
#[test]
fn given_token_when_formatted_then_value_is_redacted() {
    // GIVEN: A token with a recognizable value
    let token = RedactedToken::new("super-secret-value");

    // WHEN: Formatting it both ways
    let debug = format!("{token:?}");
    let display = format!("{token}");

    // THEN: The raw value never appears
    assert!(!debug.contains("super-secret-value"));
    assert!(!display.contains("super-secret-value"));
    assert!(debug.contains("REDACTED"));
}

/// **VALUE**: Verifies that serializing a token fails instead of emitting it.
///
/// **WHY THIS MATTERS**: Config structs get written back to disk. A token that
/// slipped into one must not end up in plain text.
///
/// **BUG THIS CATCHES**: Would catch a derived `Serialize`.
#[test]
fn given_token_when_serialized_then_returns_error() {
    // GIVEN: A token
    let token = RedactedToken::new("abc");

    // WHEN: Serializing to JSON
    let result = serde_json::to_string(&token);

    // THEN: Serialization is refused
    assert!(result.is_err(), "RedactedToken must not serialize");
}

/// **VALUE**: Whitespace-only tokens are blank but not empty, and `len` agrees
/// with `is_empty`.
///
/// **WHY THIS MATTERS**: `.env` files often contain `TOKEN= ` placeholders that
/// must be rejected, while `len`/`is_empty` keep their usual byte meaning.
///
/// **BUG THIS CATCHES**: Would catch `is_empty` trimming (so `len() > 0` and
/// `is_empty()` both hold) or `is_blank` regressing to a length check.
#[test]
fn given_whitespace_token_when_checked_then_blank_but_not_empty() {
    let token = RedactedToken::new("   ");

    assert!(token.is_blank());
    assert!(!token.is_empty());
    assert_eq!(token.len(), 3);

    let empty = RedactedToken::new("");
    assert!(empty.is_empty());
    assert!(empty.is_blank());
    assert_eq!(empty.len(), 0);

    assert!(!RedactedToken::new(" abc ").is_blank());
}
