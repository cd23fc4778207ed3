// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unavailability ("already sold") signal matching.
//!
//! Keywords are configurable phrases matched accent- and case-insensitively
//! as whole words, so "vendu" fires on "il est vendu" but not inside
//! "revendu". The signal is surfaced to observers; marking the listing sold
//! stays an operator decision.

/// Returns true when `text` contains any of the configured unavailability
/// phrases as a whole word or phrase.
pub fn is_unavailability(text: &str, keywords: &[String]) -> bool {
    let haystack = fold(text);
    keywords.iter().any(|keyword| {
        let needle = fold(keyword.trim());
        !needle.is_empty() && contains_phrase(&haystack, &needle)
    })
}

/// Lowercases and strips French diacritics so "déjà vendu" and "Deja vendu"
/// compare equal.
fn fold(s: &str) -> String {
    s.chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Substring search with word boundaries: the characters adjacent to the
/// match must not be alphanumeric.
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, matched)| {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[start + matched.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
