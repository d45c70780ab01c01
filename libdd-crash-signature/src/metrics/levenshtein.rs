// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::frame::DistanceComparable;

/// Edit distance between two frame sequences, normalized by the length of the longer one.
///
/// Inserting, deleting or substituting a frame costs one edit. With `transposition`, swapping two
/// adjacent frames costs one edit too (optimal string alignment). Two empty sequences are at
/// distance 0.
pub fn levenshtein<F: DistanceComparable>(a: &[F], b: &[F], transposition: bool) -> f32 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }

    // Rows i - 2, i - 1 and i of the edit matrix.
    let mut before: Vec<usize> = vec![0; b.len() + 1];
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(!a[i - 1].distance_eq(&b[j - 1]));
            let mut edits = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            if transposition
                && i > 1
                && j > 1
                && a[i - 1].distance_eq(&b[j - 2])
                && a[i - 2].distance_eq(&b[j - 1])
            {
                edits = edits.min(before[j - 2] + 1);
            }
            curr[j] = edits;
        }
        std::mem::swap(&mut before, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()] as f32 / longest as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plain tokens where `?` plays the unknown frame.
    struct Token(char);

    impl DistanceComparable for Token {
        fn distance_eq(&self, other: &Self) -> bool {
            self.0 != '?' && self.0 == other.0
        }
    }

    fn tokens(s: &str) -> Vec<Token> {
        s.chars().map(Token).collect()
    }

    fn lev(a: &str, b: &str) -> f32 {
        levenshtein(&tokens(a), &tokens(b), false)
    }

    fn damerau(a: &str, b: &str) -> f32 {
        levenshtein(&tokens(a), &tokens(b), true)
    }

    #[test]
    fn test_empty() {
        assert_eq!(lev("", ""), 0.0);
        assert_eq!(lev("", "abc"), 1.0);
        assert_eq!(lev("ab", ""), 1.0);
    }

    #[test]
    fn test_classic() {
        assert_eq!(lev("abc", "abc"), 0.0);
        assert_eq!(lev("abcd", "abd"), 0.25);
        assert_eq!(lev("kitten", "sitting"), 3.0 / 7.0);
    }

    #[test]
    fn test_unknown_never_matches() {
        assert_eq!(lev("a?", "a?"), 0.5);
        assert_eq!(lev("??", "??"), 1.0);
    }

    #[test]
    fn test_transposition() {
        assert_eq!(lev("abcd", "badc"), 0.75);
        assert_eq!(damerau("abcd", "badc"), 0.5);
        assert_eq!(damerau("ab", "ba"), 0.5);
        // Swapped unknown frames are still unknown.
        assert_eq!(damerau("a?", "?a"), 1.0);
    }
}
