// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use crate::constants::DEFAULT_SHARD_COUNT;
use crate::metrics::DistanceType;
use serde::{Deserialize, Serialize};

/// How a population of threads is turned into a distance matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringConfiguration {
    metric: DistanceType,
    // Number of threads compared against the whole population, all but the last one if unset
    rows: Option<usize>,
    shard_count: usize,
    // Whether every thread goes through `normalize_thread` before any comparison
    normalize_threads: bool,
}

impl Default for ClusteringConfiguration {
    fn default() -> Self {
        Self {
            metric: DistanceType::Levenshtein,
            rows: None,
            shard_count: DEFAULT_SHARD_COUNT,
            normalize_threads: false,
        }
    }
}

impl ClusteringConfiguration {
    pub fn new(
        metric: DistanceType,
        rows: Option<usize>,
        shard_count: Option<usize>,
        normalize_threads: bool,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(rows != Some(0), "A distance matrix needs at least one row");
        let shard_count = shard_count.unwrap_or(DEFAULT_SHARD_COUNT);
        anyhow::ensure!(shard_count > 0, "Shard count must be positive");
        Ok(Self {
            metric,
            rows,
            shard_count,
            normalize_threads,
        })
    }

    pub fn metric(&self) -> DistanceType {
        self.metric
    }

    pub fn rows(&self) -> Option<usize> {
        self.rows
    }

    /// Rows of the matrix for a population of `n` threads.
    pub fn rows_for(&self, n: usize) -> usize {
        self.rows.unwrap_or(n.saturating_sub(1))
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    pub fn normalize_threads(&self) -> bool {
        self.normalize_threads
    }

    pub fn set_metric(&mut self, metric: DistanceType) {
        self.metric = metric;
    }

    pub fn set_rows(&mut self, rows: Option<usize>) -> anyhow::Result<()> {
        anyhow::ensure!(rows != Some(0), "A distance matrix needs at least one row");
        self.rows = rows;
        Ok(())
    }

    pub fn set_shard_count(&mut self, shard_count: usize) -> anyhow::Result<()> {
        anyhow::ensure!(shard_count > 0, "Shard count must be positive");
        self.shard_count = shard_count;
        Ok(())
    }

    pub fn set_normalize_threads(&mut self, normalize_threads: bool) {
        self.normalize_threads = normalize_threads;
    }
}
