//! Text helpers.

/// Maximum number of response-body characters written to logs.
pub const LOG_BODY_LIMIT: usize = 500;

/// Maximum number of response-body characters embedded in error messages.
pub const ERROR_BODY_LIMIT: usize = 200;

/// Returns at most `max_chars` characters of `input`.
///
/// Cuts on a char boundary, so multi-byte text (Japanese error bodies from
/// the generation service, for instance) never splits a code point.
#[must_use]
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_input_unchanged() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_chars("要約してください", 2), "要約");
    }
}
