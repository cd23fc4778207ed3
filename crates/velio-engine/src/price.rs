// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Price-offer detection over free-text chat messages.
//!
//! Detection is a prioritized rule list evaluated in order, first match
//! wins:
//!
//! 1. [`PriceSignal::Contextual`] -- a negotiation-intent phrase ("je
//!    propose", "mon dernier prix est", "pour", ...) followed by a number
//!    and a currency marker.
//! 2. [`PriceSignal::Bare`] -- the same numeric grammar directly adjacent
//!    to a currency marker, no intent phrase required.
//! 3. [`PriceSignal::PlausibleBare`] -- a 4-5 digit number (or 1-2 digits
//!    plus a 3-digit group) with no currency marker, accepted only inside
//!    the plausible vehicle-price band and only in very short messages.
//!    Known to misfire on addresses and date fragments; the short-message
//!    guard bounds the damage.
//!
//! The numeric grammar accepts space/dot/comma thousands separators, an
//! optional decimal part, and an optional `k` multiplier (x1000). Detection
//! is a pure function with no I/O.

use std::sync::LazyLock;

use regex::Regex;

/// Currency recorded when the marker does not say otherwise. The detector
/// currently recognizes a single currency.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Plausible vehicle-price band for bare numbers without a currency marker.
const MIN_PLAUSIBLE: f64 = 500.0;
const MAX_PLAUSIBLE: f64 = 200_000.0;

/// Maximum word count for a message to qualify for the bare-number rule.
const MAX_BARE_WORDS: usize = 5;

/// Outcome of price detection, tagged by the rule that fired.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceSignal {
    NoMatch,
    Contextual { price: f64, currency: &'static str },
    Bare { price: f64, currency: &'static str },
    PlausibleBare { price: f64, currency: &'static str },
}

impl PriceSignal {
    pub fn detected(&self) -> bool {
        !matches!(self, PriceSignal::NoMatch)
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            PriceSignal::NoMatch => None,
            PriceSignal::Contextual { price, .. }
            | PriceSignal::Bare { price, .. }
            | PriceSignal::PlausibleBare { price, .. } => Some(*price),
        }
    }

    pub fn currency(&self) -> Option<&'static str> {
        match self {
            PriceSignal::NoMatch => None,
            PriceSignal::Contextual { currency, .. }
            | PriceSignal::Bare { currency, .. }
            | PriceSignal::PlausibleBare { currency, .. } => Some(currency),
        }
    }
}

const NUMBER: &str = r"(\d{1,3}(?:[\s.,]?\d{3})*(?:[.,]\d{1,2})?)";

static CONTEXTUAL: LazyLock<Regex> = LazyLock::new(|| {
    let intent = r"(?:je\s+(?:propose|offre|donne)|prix\s*(?:de|est\s*de)?|offre\s*(?:de|à)?|pour|à|mon\s*dernier\s*prix\s*est)";
    Regex::new(&format!(
        r"(?i){intent}\s*{NUMBER}\s*(k)?\s*(?:€|euros?|eur)"
    ))
    .expect("contextual price regex")
});

static BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){NUMBER}\s*(k)?\s*(?:€|euros?|eur)"))
        .expect("bare price regex")
});

static PLAUSIBLE_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}(?:\s?\d{3})|\d{4,5})\s*(k)?(?:\s*(?:€|euros?|eur))?\b")
        .expect("plausible bare price regex")
});

/// Runs the rule list against `text` and returns the first match.
pub fn detect(text: &str) -> PriceSignal {
    type Build = fn(f64) -> PriceSignal;
    let contextual: Build = |price| PriceSignal::Contextual {
        price,
        currency: DEFAULT_CURRENCY,
    };
    let bare: Build = |price| PriceSignal::Bare {
        price,
        currency: DEFAULT_CURRENCY,
    };
    let rules: [(&Regex, Build); 2] = [(&CONTEXTUAL, contextual), (&BARE, bare)];

    for (matcher, build) in rules {
        if let Some(caps) = matcher.captures(text)
            && let Some(price) = parse_literal(&caps[1], caps.get(2).is_some())
        {
            return build(price);
        }
    }

    // Rule 3: bare plausible number, guarded against unrelated numeric text
    // (phone numbers, dates, quantities).
    if let Some(caps) = PLAUSIBLE_BARE.captures(text)
        && let Some(price) = parse_literal(&caps[1], caps.get(2).is_some())
        && (MIN_PLAUSIBLE..=MAX_PLAUSIBLE).contains(&price)
    {
        let whole_match = caps.get(0).map(|m| m.as_str().trim()).unwrap_or_default();
        let just_the_number = text.trim() == whole_match;
        let word_count = text.split_whitespace().count();
        if just_the_number || word_count <= MAX_BARE_WORDS {
            return PriceSignal::PlausibleBare {
                price,
                currency: DEFAULT_CURRENCY,
            };
        }
    }

    PriceSignal::NoMatch
}

/// Parses a captured numeric literal: strips whitespace, treats a trailing
/// one-or-two-digit `[.,]` group as the decimal part, drops every other
/// separator, and applies the `k` multiplier.
///
/// Returns `None` unless the value is finite and positive.
fn parse_literal(raw: &str, thousands: bool) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let (int_part, frac_part) = match compact.rfind(['.', ',']) {
        Some(idx) if (1..=2).contains(&(compact.len() - idx - 1)) => {
            (&compact[..idx], Some(&compact[idx + 1..]))
        }
        _ => (compact.as_str(), None),
    };

    let mut normalized: String = int_part
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .collect();
    if let Some(frac) = frac_part {
        normalized.push('.');
        normalized.push_str(frac);
    }

    let mut price: f64 = normalized.parse().ok()?;
    if thousands {
        price *= 1000.0;
    }
    (price.is_finite() && price > 0.0).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_of(text: &str) -> Option<f64> {
        detect(text).price()
    }

    #[test]
    fn contextual_phrase_with_currency() {
        assert_eq!(price_of("je propose 15000 euros"), Some(15000.0));
        assert_eq!(price_of("mon dernier prix est 12k€"), Some(12000.0));
        assert_eq!(price_of("je vous offre 9 500€"), Some(9500.0));
        assert!(matches!(
            detect("prix de 8000 eur"),
            PriceSignal::Contextual { .. }
        ));
    }

    #[test]
    fn bare_number_with_currency() {
        let signal = detect("I offer 15000€");
        assert!(matches!(signal, PriceSignal::Bare { .. }));
        assert_eq!(signal.price(), Some(15000.0));
        assert_eq!(signal.currency(), Some("EUR"));
    }

    #[test]
    fn thousands_separators_are_stripped() {
        assert_eq!(price_of("15 000€"), Some(15000.0));
        assert_eq!(price_of("15.000€"), Some(15000.0));
        assert_eq!(price_of("15,000 euros"), Some(15000.0));
    }

    #[test]
    fn decimal_comma_is_normalized() {
        assert_eq!(price_of("1500,50€"), Some(1500.5));
        assert_eq!(price_of("1500.50€"), Some(1500.5));
    }

    #[test]
    fn k_multiplier() {
        assert_eq!(price_of("12k€"), Some(12000.0));
        assert_eq!(price_of("12K euros"), Some(12000.0));
    }

    #[test]
    fn bare_plausible_number_alone() {
        let signal = detect("18000");
        assert!(matches!(signal, PriceSignal::PlausibleBare { .. }));
        assert_eq!(signal.price(), Some(18000.0));

        assert_eq!(price_of("18 000"), Some(18000.0));
    }

    #[test]
    fn bare_number_in_short_message() {
        assert_eq!(price_of("ok pour 18000 ?"), Some(18000.0));
    }

    #[test]
    fn bare_number_in_long_message_is_rejected() {
        assert_eq!(
            detect("I have 18000 subscribers on my channel today"),
            PriceSignal::NoMatch
        );
    }

    #[test]
    fn implausible_bare_numbers_are_rejected() {
        // Below the band.
        assert_eq!(detect("420"), PriceSignal::NoMatch);
        // Phone-number fragments are longer than 5 digits.
        assert_eq!(detect("0612345678"), PriceSignal::NoMatch);
    }

    #[test]
    fn no_number_means_no_match() {
        assert_eq!(detect("free"), PriceSignal::NoMatch);
        assert_eq!(detect(""), PriceSignal::NoMatch);
        assert_eq!(detect("bonjour, toujours disponible ?"), PriceSignal::NoMatch);
    }

    #[test]
    fn priority_order_contextual_wins() {
        // Both rule 1 and rule 2 would match; the contextual variant is
        // reported.
        assert!(matches!(
            detect("je propose 7000€"),
            PriceSignal::Contextual { .. }
        ));
    }

    #[test]
    fn currency_is_always_the_default() {
        assert_eq!(detect("15000€").currency(), Some(DEFAULT_CURRENCY));
        assert_eq!(detect("18000").currency(), Some(DEFAULT_CURRENCY));
    }
}
