// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sharded computation of a distance matrix.
//!
//! [`partition`] splits the cells of a matrix into contiguous runs of the row-major enumeration.
//! Each [`DistancePartition`] is a plain value: it can be sent to another thread or process,
//! computed there against the same population, serialized, and handed back to [`merge`]. Every
//! computed partition carries a checksum of the population it saw, and partitions computed
//! against different populations are never merged.

use crate::config::ClusteringConfiguration;
use crate::error::{DistanceError, MergeError};
use crate::matrix::{cell_at, cell_count, cell_position, clamp_dimensions, Cells, DistanceMatrix};
use crate::metrics::{distance_paired, DistanceType};
use crate::normalize::normalize_thread;
use crate::thread::{ensure_uniform_kind, Thread};
use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};

/// A run of `len` consecutive cells of an `m x n` distance matrix, starting at the cell
/// `(m_begin, n_begin)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DistancePartition {
    m: usize,
    n: usize,
    m_begin: usize,
    n_begin: usize,
    len: usize,
    metric: DistanceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distances: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checksum: Option<u32>,
}

impl DistancePartition {
    /// A partition that has not been computed yet. The range is only checked when computing and
    /// merging.
    pub fn new(
        m: usize,
        n: usize,
        m_begin: usize,
        n_begin: usize,
        len: usize,
        metric: DistanceType,
    ) -> Self {
        Self {
            m,
            n,
            m_begin,
            n_begin,
            len,
            metric,
            distances: None,
            checksum: None,
        }
    }

    /// Restores a partition computed elsewhere.
    pub fn with_distances(mut self, distances: Vec<f32>, checksum: u32) -> Self {
        self.distances = Some(distances);
        self.checksum = Some(checksum);
        self
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn m_begin(&self) -> usize {
        self.m_begin
    }

    pub fn n_begin(&self) -> usize {
        self.n_begin
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn metric(&self) -> DistanceType {
        self.metric
    }

    pub fn distances(&self) -> Option<&[f32]> {
        self.distances.as_deref()
    }

    pub fn checksum(&self) -> Option<u32> {
        self.checksum
    }

    pub fn is_computed(&self) -> bool {
        self.distances.is_some() && self.checksum.is_some()
    }

    /// The cells of the partition, in the order of its distances.
    pub fn cells(&self) -> Cells {
        Cells::new(self.m, self.n, self.m_begin, self.n_begin, self.len)
    }

    /// Position of the first cell in the enumeration, if the range fits in the matrix.
    fn start_position(&self) -> Option<usize> {
        let valid_start = self.m_begin < self.m
            && self.m < self.n
            && self.m_begin < self.n_begin
            && self.n_begin < self.n;
        if !valid_start {
            return None;
        }
        let start = cell_position(self.m_begin, self.n_begin, self.n);
        let end = start.checked_add(self.len)?;
        (end <= cell_count(self.m, self.n)).then_some(start)
    }

    /// Computes the distances of the partition's cells over `threads`, the whole population, and
    /// stamps the partition with the population checksum.
    pub fn compute(&mut self, threads: &[Thread]) -> Result<(), DistanceError> {
        if threads.len() != self.n {
            return Err(DistanceError::PopulationSize {
                expected: self.n,
                found: threads.len(),
            });
        }
        if self.start_position().is_none() {
            return Err(DistanceError::OutOfRange {
                i: self.m_begin,
                j: self.n_begin,
                m: self.m,
                n: self.n,
            });
        }
        ensure_uniform_kind(threads)?;
        trace!(
            m_begin = self.m_begin,
            n_begin = self.n_begin,
            len = self.len,
            "computing partition"
        );
        let distances = self
            .cells()
            .map(|(i, j)| distance_paired(self.metric, &threads[i], &threads[j]))
            .collect();
        self.distances = Some(distances);
        self.checksum = Some(population_checksum(threads));
        Ok(())
    }

    /// Whether the partition was computed over a population with the same checksum as
    /// `threads`. Restored partitions should be checked before merging.
    pub fn verify_checksum(&self, threads: &[Thread]) -> bool {
        self.checksum == Some(population_checksum(threads))
    }
}

/// Checksum of a population: the first four bytes of the SHA-256 digest of the frame counts of
/// the threads, in order.
pub fn population_checksum(threads: &[Thread]) -> u32 {
    let mut hasher = Sha256::new();
    for thread in threads {
        hasher.update((thread.frame_count() as u64).to_le_bytes());
    }
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Splits the cells of an `m x n` matrix into at most `shard_count` runs whose lengths differ by
/// at most one, the longer runs first. `m` is clamped as in [`DistanceMatrix::new`].
pub fn partition(
    m: usize,
    n: usize,
    metric: DistanceType,
    shard_count: usize,
) -> Result<Vec<DistancePartition>, DistanceError> {
    if shard_count == 0 {
        return Err(DistanceError::InvalidShardCount);
    }
    let (m, n) = clamp_dimensions(m, n)?;
    let total = cell_count(m, n);
    let shards = shard_count.min(total);
    let (base, extra) = (total / shards, total % shards);
    debug!(m, n, %metric, total, shards, "partitioning distance matrix");

    let mut partitions = Vec::with_capacity(shards);
    let mut position = 0;
    for shard in 0..shards {
        let len = base + usize::from(shard < extra);
        let (m_begin, n_begin) = cell_at(m, n, position).ok_or(DistanceError::OutOfRange {
            i: m,
            j: n,
            m,
            n,
        })?;
        partitions.push(DistancePartition::new(m, n, m_begin, n_begin, len, metric));
        position += len;
    }
    Ok(partitions)
}

/// Assembles computed partitions into a distance matrix.
///
/// Every partition must describe the same matrix and metric as the first one, carry the same
/// checksum, and hold its distances. Together they must cover every cell exactly once. Any
/// other input is rejected as a whole.
pub fn merge(partitions: &[DistancePartition]) -> Result<DistanceMatrix, MergeError> {
    merge_checked(partitions).inspect_err(|err| warn!(%err, "rejected distance partitions"))
}

fn merge_checked(partitions: &[DistancePartition]) -> Result<DistanceMatrix, MergeError> {
    let first = partitions.first().ok_or(MergeError::NoPartitions)?;
    let expected_checksum = first.checksum.ok_or(MergeError::NotComputed { index: 0 })?;
    let mut matrix = DistanceMatrix::new(first.m, first.n)?;
    let (m, n) = (matrix.m(), matrix.n());
    let total = cell_count(m, n);
    let mut covered = vec![false; total];

    for (index, partition) in partitions.iter().enumerate() {
        if (partition.m, partition.n) != (m, n) {
            return Err(MergeError::DimensionMismatch {
                index,
                m: partition.m,
                n: partition.n,
                expected_m: m,
                expected_n: n,
            });
        }
        if partition.metric != first.metric {
            return Err(MergeError::MetricMismatch {
                index,
                expected: first.metric,
                found: partition.metric,
            });
        }
        let (Some(distances), Some(checksum)) = (&partition.distances, partition.checksum) else {
            return Err(MergeError::NotComputed { index });
        };
        if checksum != expected_checksum {
            return Err(MergeError::ChecksumMismatch {
                index,
                expected: expected_checksum,
                found: checksum,
            });
        }
        if distances.len() != partition.len {
            return Err(MergeError::LengthMismatch {
                index,
                expected: partition.len,
                found: distances.len(),
            });
        }
        let start = partition
            .start_position()
            .ok_or(MergeError::OutOfRange { index })?;
        for (slot, ((i, j), distance)) in covered[start..start + partition.len]
            .iter_mut()
            .zip(partition.cells().zip(distances))
        {
            if *slot {
                return Err(MergeError::Overlap { index });
            }
            *slot = true;
            matrix.try_set(i, j, *distance)?;
        }
    }

    let covered = covered.iter().filter(|c| **c).count();
    if covered != total {
        return Err(MergeError::Incomplete { covered, total });
    }
    debug!(m, n, partitions = partitions.len(), "merged distance partitions");
    Ok(matrix)
}

/// Computes the distance matrix of `threads` as described by `config`, through partitions.
pub fn compute_distances(
    config: &ClusteringConfiguration,
    threads: &[Thread],
) -> anyhow::Result<DistanceMatrix> {
    let normalized: Vec<Thread>;
    let population = if config.normalize_threads() {
        normalized = threads.iter().cloned().map(normalize_thread).collect();
        &normalized
    } else {
        threads
    };

    let n = population.len();
    let mut partitions = partition(
        config.rows_for(n),
        n,
        config.metric(),
        config.shard_count(),
    )
    .with_context(|| format!("Failed to partition a population of {n} threads"))?;
    for partition in &mut partitions {
        partition.compute(population)?;
    }
    Ok(merge(&partitions)?)
}
