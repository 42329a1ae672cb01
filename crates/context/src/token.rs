//! Token estimation utilities.
//!
//! Character-based heuristic: `chars_per_token` characters per token,
//! rounded up. The estimate is advisory; it drives soft truncation and
//! telemetry, never billing.

use serde::Serialize;

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str, chars_per_token: usize) -> usize {
    estimate_from_chars(text.chars().count(), chars_per_token)
}

/// Tokens for `chars` characters. A zero ratio is treated as 1.
pub fn estimate_from_chars(chars: usize, chars_per_token: usize) -> usize {
    chars.div_ceil(chars_per_token.max(1))
}

/// Character length of `value` serialized as JSON; 0 if it cannot be.
pub fn serialized_chars<T: Serialize>(value: &T) -> usize {
    serde_json::to_string(value).map_or(0, |s| s.chars().count())
}

/// Estimate tokens of `value` serialized as JSON.
pub fn estimate_serialized_tokens<T: Serialize>(value: &T, chars_per_token: usize) -> usize {
    estimate_from_chars(serialized_chars(value), chars_per_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens("", 4), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test", 4), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello", 4), 2);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(estimate_tokens("नमस्ते", 1), "नमस्ते".chars().count());
    }

    #[test]
    fn zero_ratio_does_not_divide_by_zero() {
        assert_eq!(estimate_tokens("abc", 0), 3);
    }

    #[test]
    fn serialized_value() {
        // "\"abcdefgh\"" is 10 chars
        assert_eq!(estimate_serialized_tokens(&"abcdefgh", 4), 3);
    }
}
