// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Crash signature comparison.
//!
//! This crate decides whether two crashes are the same bug by comparing the stack traces of their
//! crashing threads. It is meant to sit between the parsers producing [`Thread`]s and a
//! clustering stage consuming a [`DistanceMatrix`].
//!
//! 1. Frames of every supported kind (core dumps, debugger transcripts, kernel oopses, Java,
//!    Python, Ruby, JavaScript) answer whether they denote the same code location as another
//!    frame. Two frames whose function is unknown are never the same.
//! 2. Unknown frames found at the same place in two threads can be paired before comparing them,
//!    see [`pair_unknowns`], so that two crashes in the same stripped code still look alike.
//! 3. Threads are compared with one of the [`DistanceType`] metrics.
//! 4. A population of threads is compared pairwise into a [`DistanceMatrix`], either directly or
//!    through [`DistancePartition`]s that can be computed independently and [`merge`]d. A
//!    checksum of the population guards against merging partitions computed over different
//!    inputs.
//!
//! The crate does no I/O and spawns no threads; partitions are plain values so callers can
//! distribute them however they see fit.

mod config;
mod constants;
mod error;
pub mod frame;
mod matrix;
pub mod metrics;
mod normalize;
mod partition;
#[cfg(test)]
mod test_utils;
mod thread;

pub use config::ClusteringConfiguration;
pub use constants::*;
pub use error::{DistanceError, MergeError};
pub use frame::{distance_equal, Frame, FrameKind, FunctionName};
pub use matrix::{Cells, DistanceMatrix};
pub use metrics::{distance, distance_paired, DistanceType};
pub use normalize::{normalize_thread, pair_unknowns};
pub use partition::{compute_distances, merge, partition, population_checksum, DistancePartition};
pub use thread::{Stacktrace, Thread};
