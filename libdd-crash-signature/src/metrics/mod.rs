// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Distances between two threads.
//!
//! The metrics are written over slices of any [`DistanceComparable`] frame so each of them can be
//! tested on its own. [`distance`] and [`distance_paired`] are the entry points working on
//! [`Thread`]s.

mod jaccard;
mod jaro_winkler;
mod levenshtein;

pub use jaccard::jaccard;
pub use jaro_winkler::jaro_winkler;
pub use levenshtein::levenshtein;

use crate::frame::{DistanceComparable, FrameKind};
use crate::normalize::pair_unknowns;
use crate::thread::Thread;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceType {
    /// Edit distance normalized by the length of the longer thread, 0 for identical threads.
    Levenshtein,
    /// Levenshtein where swapping two adjacent frames costs a single edit.
    DamerauLevenshtein,
    /// One minus the share of common distinct frames, 0 for identical threads.
    Jaccard,
    /// Similarity, 1 for identical threads.
    JaroWinkler,
}

impl DistanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceType::Levenshtein => "levenshtein",
            DistanceType::DamerauLevenshtein => "damerau-levenshtein",
            DistanceType::Jaccard => "jaccard",
            DistanceType::JaroWinkler => "jaro-winkler",
        }
    }
}

impl fmt::Display for DistanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "levenshtein" => Ok(DistanceType::Levenshtein),
            "damerau-levenshtein" => Ok(DistanceType::DamerauLevenshtein),
            "jaccard" => Ok(DistanceType::Jaccard),
            "jaro-winkler" => Ok(DistanceType::JaroWinkler),
            _ => anyhow::bail!("unknown distance type: {s}"),
        }
    }
}

/// Runs `metric` over two frame sequences.
pub fn sequence_distance<F: DistanceComparable>(metric: DistanceType, a: &[F], b: &[F]) -> f32 {
    match metric {
        DistanceType::Levenshtein => levenshtein(a, b, false),
        DistanceType::DamerauLevenshtein => levenshtein(a, b, true),
        DistanceType::Jaccard => jaccard(a, b),
        DistanceType::JaroWinkler => jaro_winkler(a, b),
    }
}

/// Distance between two threads. Threads of different kinds are at the maximal distance 1.0.
pub fn distance(metric: DistanceType, a: &Thread, b: &Thread) -> f32 {
    if a.kind() != b.kind() {
        return 1.0;
    }
    sequence_distance(metric, a.frames(), b.frames())
}

/// Distance between two threads after pairing their unknown frames when that is worth it.
///
/// Debugger threads that are not fully resolved are cloned and paired with [`pair_unknowns`]
/// first. The threads passed in are left untouched.
pub fn distance_paired(metric: DistanceType, a: &Thread, b: &Thread) -> f32 {
    if a.kind() != b.kind() {
        return 1.0;
    }
    if needs_pairing(a, b) {
        let (a, b) = pair_unknowns(a.clone(), b.clone());
        return distance(metric, &a, &b);
    }
    distance(metric, a, b)
}

fn needs_pairing(a: &Thread, b: &Thread) -> bool {
    match a.kind() {
        FrameKind::Gdb => !(a.is_fully_resolved() && b.is_fully_resolved()),
        _ => false,
    }
}
