// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical phone-key normalization.
//!
//! Every contact identifier the system sees -- webhook sender ids, operator
//! input, listing phone columns -- is reduced to its digits before any
//! lookup, so `"33612345678@c.us"`, `"+33 6 12 34 56 78"` and
//! `"33612345678"` all address the same conversation.

/// Reduces a raw contact identifier to the digits-only canonical key.
///
/// Strips the transport suffix (everything from the first `@`) and every
/// non-digit character. Total over any input: the empty string normalizes
/// to the empty string.
pub fn normalize(raw: &str) -> String {
    let local_part = raw.split('@').next().unwrap_or("");
    local_part.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_transport_suffix() {
        assert_eq!(normalize("33612345678@c.us"), "33612345678");
        assert_eq!(normalize("123@x"), "123");
        assert_eq!(normalize("123"), "123");
    }

    #[test]
    fn strips_formatting_characters() {
        assert_eq!(normalize("+33 6 12 34 56 78"), "33612345678");
        assert_eq!(normalize("(336) 12-34-56.78"), "33612345678");
    }

    #[test]
    fn empty_and_digitless_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("demo@c.us"), "");
    }

    proptest! {
        #[test]
        fn idempotent(s in ".{0,64}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn suffix_insensitive(digits in "[0-9]{1,15}", suffix in "[a-z.]{1,10}") {
            let with_suffix = format!("{digits}@{suffix}");
            prop_assert_eq!(normalize(&with_suffix), normalize(&digits));
        }

        #[test]
        fn output_is_digits_only(s in ".{0,64}") {
            prop_assert!(normalize(&s).chars().all(|c| c.is_ascii_digit()));
        }
    }
}
