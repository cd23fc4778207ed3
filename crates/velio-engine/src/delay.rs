// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-like reply delay.
//!
//! An instant reply from a "typing human" gives the bot away. The delay is
//! derived from the reply's word count at a configured words-per-minute
//! rate, clamped to a configured range, and optionally jittered upward by
//! as much as 30%. Demo conversations reply instantly so simulations stay
//! fast.

use std::time::Duration;

use rand::Rng;

use velio_config::model::TypingConfig;

/// Computes how long to wait before dispatching `reply`.
pub fn response_delay(reply: &str, typing: &TypingConfig, demo: bool) -> Duration {
    if demo || !typing.enabled {
        return Duration::ZERO;
    }

    let words = reply.split_whitespace().count() as u64;
    let wpm = u64::from(typing.words_per_minute.max(1));
    let base_ms = (words * 60_000 / wpm).clamp(typing.min_delay_ms, typing.max_delay_ms);

    let delayed_ms = if typing.randomize {
        let factor = 1.0 + rand::thread_rng().r#gen::<f64>() * 0.3;
        ((base_ms as f64 * factor) as u64).min(typing.max_delay_ms)
    } else {
        base_ms
    };

    Duration::from_millis(delayed_ms)
}
