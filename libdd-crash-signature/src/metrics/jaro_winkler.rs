// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants::{JARO_WINKLER_PREFIX_CAP, JARO_WINKLER_PREFIX_WEIGHT};
use crate::frame::DistanceComparable;

/// Jaro-Winkler similarity of two frame sequences: 1 for identical sequences, 0 when no frame
/// matches.
///
/// Frames at positions `i` and `j` match when they are equal and `|i - j|` is at most half the
/// longer length minus one. Every frame of `a` takes the first matching frame of `b` inside that
/// window, and a frame of `b` may be taken more than once, so repeated frames can make the result
/// depend on the order of the arguments. A match at a different position counts as half a
/// transposition. The result is boosted by the common prefix of up to four frames.
pub fn jaro_winkler<F: DistanceComparable>(a: &[F], b: &[F]) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut matches = 0usize;
    let mut transpositions = 0usize;
    for (i, frame) in a.iter().enumerate() {
        let low = i.saturating_sub(window);
        let high = (i + window).min(b.len() - 1);
        if low > high {
            continue;
        }
        if let Some(j) = (low..=high).find(|&j| frame.distance_eq(&b[j])) {
            matches += 1;
            if i != j {
                transpositions += 1;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let m = matches as f32;
    let t = transpositions as f32 / 2.0;
    let jaro = (m / a.len() as f32 + m / b.len() as f32 + (m - t) / m) / 3.0;

    // Classical common prefix, it never runs past the end of the shorter sequence.
    let prefix = a
        .iter()
        .zip(b)
        .take_while(|(x, y)| x.distance_eq(y))
        .take(JARO_WINKLER_PREFIX_CAP)
        .count();
    let similarity = jaro + prefix as f32 * JARO_WINKLER_PREFIX_WEIGHT * (1.0 - jaro);
    // Frames of `b` matched several times can push the score past 1.
    similarity.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Token(char);

    impl DistanceComparable for Token {
        fn distance_eq(&self, other: &Self) -> bool {
            self.0 != '?' && self.0 == other.0
        }
    }

    fn jw(a: &str, b: &str) -> f32 {
        let a: Vec<_> = a.chars().map(Token).collect();
        let b: Vec<_> = b.chars().map(Token).collect();
        jaro_winkler(&a, &b)
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_degenerate() {
        assert_eq!(jw("", ""), 1.0);
        assert_eq!(jw("", "abc"), 0.0);
        assert_eq!(jw("abc", ""), 0.0);
        assert_eq!(jw("?", "?"), 0.0);
        assert_eq!(jw("ab", "cd"), 0.0);
    }

    #[test]
    fn test_identity() {
        assert_eq!(jw("a", "a"), 1.0);
        assert_eq!(jw("abcdef", "abcdef"), 1.0);
    }

    #[test]
    fn test_classic_value() {
        // m = 6, one out of place pair, common prefix "mar" weighted 0.2 per frame.
        let jaro = (1.0 + 1.0 + 5.0 / 6.0) / 3.0;
        assert_close(jw("martha", "marhta"), jaro + 3.0 * 0.2 * (1.0 - jaro));
        assert_close(jw("martha", "marhta"), 0.97778);
    }

    #[test]
    fn test_greedy_matching_is_asymmetric() {
        // The first `x` of "xyyy" is matched by the first two frames of "xxxx", once in place and
        // once as a transposition. In the other direction it is matched once.
        assert_close(jw("xxxx", "xyyy"), 2.0 / 3.0);
        assert_close(jw("xyyy", "xxxx"), 0.6);
    }

    #[test]
    fn test_prefix_ends_with_shorter_sequence() {
        // "ab" against "abcd": m = 2, jaro = (1 + 0.5 + 1) / 3, prefix of two frames.
        let jaro = (1.0 + 0.5 + 1.0) / 3.0;
        assert_close(jw("ab", "abcd"), jaro + 2.0 * 0.2 * (1.0 - jaro));
    }

    #[test]
    fn test_repeated_frames_capped() {
        assert!(jw("xxxxxx", "xx") <= 1.0);
    }
}
