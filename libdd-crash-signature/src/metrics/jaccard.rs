// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::frame::DistanceComparable;

/// Jaccard distance between the sets of distinct frames of two sequences.
///
/// A frame equal to a later frame of the same sequence is folded into that later one. Frame
/// equality is not a plain value comparison, so sets are built by scanning instead of hashing.
/// Two empty sequences are at distance 0.
pub fn jaccard<F: DistanceComparable>(a: &[F], b: &[F]) -> f32 {
    let mut intersection = 0usize;
    let mut a_size = 0usize;
    for (i, frame) in a.iter().enumerate() {
        if contains(&a[i + 1..], frame) {
            continue;
        }
        a_size += 1;
        if contains(b, frame) {
            intersection += 1;
        }
    }
    let b_size = (0..b.len()).filter(|&j| !contains(&b[j + 1..], &b[j])).count();

    let union = (a_size + b_size).saturating_sub(intersection);
    if union == 0 {
        return 0.0;
    }
    (1.0 - intersection as f32 / union as f32).max(0.0)
}

fn contains<F: DistanceComparable>(frames: &[F], frame: &F) -> bool {
    frames.iter().any(|other| other.distance_eq(frame))
}
