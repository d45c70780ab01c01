// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for `libdd-crash-signature`.

use crate::frame::FrameKind;
use crate::metrics::DistanceType;
use thiserror::Error;

/// Errors raised when building or comparing threads and distance matrices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceError {
    /// A frame or thread of another kind was mixed into a uniform population.
    #[error("frame kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: FrameKind,
        found: FrameKind,
    },

    /// A matrix needs at least two columns and one row.
    #[error("invalid distance matrix dimensions {m}x{n}")]
    InvalidDimensions { m: usize, n: usize },

    #[error("shard count must be positive")]
    InvalidShardCount,

    /// The population handed over does not match the matrix it should fill.
    #[error("expected {expected} threads, got {found}")]
    PopulationSize { expected: usize, found: usize },

    /// A cell or a range of cells lies outside of the matrix.
    #[error("cell ({i}, {j}) is outside of the {m}x{n} distance matrix")]
    OutOfRange {
        i: usize,
        j: usize,
        m: usize,
        n: usize,
    },

    /// The flat storage handed to `DistanceMatrix::from_parts` has the wrong size.
    #[error("distance matrix storage holds {found} values, expected {expected}")]
    StorageSize { expected: usize, found: usize },
}

/// Reasons for rejecting a merge of distance matrix partitions.
///
/// Partitions are only merged when they were all computed from the same population, so any of
/// these means the batch must not be clustered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    #[error("no partitions to merge")]
    NoPartitions,

    #[error("partition {index} covers a {m}x{n} matrix, expected {expected_m}x{expected_n}")]
    DimensionMismatch {
        index: usize,
        m: usize,
        n: usize,
        expected_m: usize,
        expected_n: usize,
    },

    #[error("partition {index} was computed with {found}, expected {expected}")]
    MetricMismatch {
        index: usize,
        expected: DistanceType,
        found: DistanceType,
    },

    /// The partition was computed over a different population than the first one.
    #[error("partition {index} has checksum {found:#010x}, expected {expected:#010x}")]
    ChecksumMismatch {
        index: usize,
        expected: u32,
        found: u32,
    },

    #[error("partition {index} has not been computed")]
    NotComputed { index: usize },

    #[error("partition {index} holds {found} distances but claims {expected} cells")]
    LengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("partition {index} reaches outside of the distance matrix")]
    OutOfRange { index: usize },

    #[error("partition {index} overlaps an earlier partition")]
    Overlap { index: usize },

    #[error("partitions cover {covered} of {total} cells")]
    Incomplete { covered: usize, total: usize },

    #[error(transparent)]
    Distance(#[from] DistanceError),
}
