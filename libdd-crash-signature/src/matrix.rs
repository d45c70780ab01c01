// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Pairwise distances of a population of threads.
//!
//! Only the first `m` threads are compared against the whole population of `n`, which gives the
//! rows `0..m` of an `n x n` symmetric matrix with a zero diagonal. Only the cells strictly above
//! the diagonal are stored.

use crate::error::DistanceError;
use crate::metrics::{distance_paired, DistanceType};
use crate::thread::{ensure_uniform_kind, Thread};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistanceMatrixRepr")]
pub struct DistanceMatrix {
    m: usize,
    n: usize,
    distances: Vec<f32>,
}

#[derive(Deserialize)]
struct DistanceMatrixRepr {
    m: usize,
    n: usize,
    distances: Vec<f32>,
}

impl TryFrom<DistanceMatrixRepr> for DistanceMatrix {
    type Error = DistanceError;

    fn try_from(repr: DistanceMatrixRepr) -> Result<Self, Self::Error> {
        DistanceMatrix::from_parts(repr.m, repr.n, repr.distances)
    }
}

impl DistanceMatrix {
    /// Creates a zeroed matrix comparing the first `m` of `n` threads. `m` is clamped to `n - 1`,
    /// the last row having no cell above the diagonal.
    pub fn new(m: usize, n: usize) -> Result<Self, DistanceError> {
        let (m, n) = clamp_dimensions(m, n)?;
        Ok(Self {
            m,
            n,
            distances: vec![0.0; storage_len(m, n)],
        })
    }

    /// Rebuilds a matrix from its exported flat storage.
    pub fn from_parts(m: usize, n: usize, distances: Vec<f32>) -> Result<Self, DistanceError> {
        if m == 0 || m >= n {
            return Err(DistanceError::InvalidDimensions { m, n });
        }
        let expected = storage_len(m, n);
        if distances.len() != expected {
            return Err(DistanceError::StorageSize {
                expected,
                found: distances.len(),
            });
        }
        Ok(Self { m, n, distances })
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// The flat storage, in the layout expected by [`DistanceMatrix::from_parts`].
    pub fn as_slice(&self) -> &[f32] {
        &self.distances
    }

    pub fn into_parts(self) -> (usize, usize, Vec<f32>) {
        (self.m, self.n, self.distances)
    }

    /// Distance between threads `i` and `j`, in either order.
    ///
    /// # Panics
    /// Panics if the smaller of `i` and `j` is not below `m`, or the larger not below `n`.
    #[allow(clippy::panic)]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        match self.checked_get(i, j) {
            Some(distance) => distance,
            None => panic!(
                "cell ({i}, {j}) is outside of the {}x{} distance matrix",
                self.m, self.n
            ),
        }
    }

    pub fn checked_get(&self, i: usize, j: usize) -> Option<f32> {
        if i == j {
            return (i < self.n).then_some(0.0);
        }
        let (i, j) = (i.min(j), i.max(j));
        if i >= self.m || j >= self.n {
            return None;
        }
        self.distances.get(triangular_index(i, j, self.n)).copied()
    }

    /// Stores the distance between threads `i` and `j`. Writes to the diagonal are ignored.
    ///
    /// # Panics
    /// Panics on the same coordinates as [`DistanceMatrix::get`].
    #[allow(clippy::panic)]
    pub fn set(&mut self, i: usize, j: usize, distance: f32) {
        if let Err(err) = self.try_set(i, j, distance) {
            panic!("{err}");
        }
    }

    /// Stores the distance between threads `i` and `j`, or reports the coordinates as out of range
    /// without touching the matrix.
    pub fn try_set(&mut self, i: usize, j: usize, distance: f32) -> Result<(), DistanceError> {
        let out_of_range = DistanceError::OutOfRange {
            i,
            j,
            m: self.m,
            n: self.n,
        };
        if i == j {
            return if i < self.n { Ok(()) } else { Err(out_of_range) };
        }
        let (i, j) = (i.min(j), i.max(j));
        if i >= self.m || j >= self.n {
            return Err(out_of_range);
        }
        let index = triangular_index(i, j, self.n);
        match self.distances.get_mut(index) {
            Some(cell) => {
                *cell = distance;
                Ok(())
            }
            None => Err(out_of_range),
        }
    }

    /// Every cell `(i, j)` with `i < j`, `i < m` and `j < n`, in row-major order.
    pub fn cells(&self) -> Cells {
        Cells::new(self.m, self.n, 0, 1, cell_count(self.m, self.n))
    }

    /// Compares the first `m` threads of `threads` against all `n` of them.
    ///
    /// Debugger threads that are not fully resolved have their unknown frames paired first, on
    /// clones.
    pub fn compare_population(
        threads: &[Thread],
        m: usize,
        n: usize,
        metric: DistanceType,
    ) -> Result<Self, DistanceError> {
        if threads.len() != n {
            return Err(DistanceError::PopulationSize {
                expected: n,
                found: threads.len(),
            });
        }
        ensure_uniform_kind(threads)?;
        let mut matrix = Self::new(m, n)?;
        debug!(m = matrix.m, n = matrix.n, %metric, "comparing population");
        for (i, j) in matrix.cells() {
            let distance = distance_paired(metric, &threads[i], &threads[j]);
            matrix.try_set(i, j, distance)?;
        }
        Ok(matrix)
    }
}

pub(crate) fn clamp_dimensions(m: usize, n: usize) -> Result<(usize, usize), DistanceError> {
    if n < 2 || m == 0 {
        return Err(DistanceError::InvalidDimensions { m, n });
    }
    Ok((m.min(n - 1), n))
}

/// Offset of the cell `(i, j)`, `i < j < n`, in the flat storage.
///
/// With `l = n - i`, rows before `i` take `((n² - n) - (l² - l)) / 2` slots. Every row keeps one
/// slot more than it has cells, so one slot between consecutive rows is never written.
pub(crate) fn triangular_index(i: usize, j: usize, n: usize) -> usize {
    let l = n - i;
    ((n * n - n) - (l * l - l)) / 2 + j - 1
}

fn storage_len(m: usize, n: usize) -> usize {
    triangular_index(m - 1, n - 1, n) + 1
}

/// Number of cells of an `m x n` matrix.
pub(crate) fn cell_count(m: usize, n: usize) -> usize {
    m * (n - 1) - m * m.saturating_sub(1) / 2
}

/// Position of the cell `(i, j)` in the row-major enumeration of the cells.
pub(crate) fn cell_position(i: usize, j: usize, n: usize) -> usize {
    i * (n - 1) - i * i.saturating_sub(1) / 2 + j - i - 1
}

/// The cell at `position` in the row-major enumeration, if the matrix has that many cells.
pub(crate) fn cell_at(m: usize, n: usize, mut position: usize) -> Option<(usize, usize)> {
    for i in 0..m.min(n.saturating_sub(1)) {
        let row = n - 1 - i;
        if position < row {
            return Some((i, i + 1 + position));
        }
        position -= row;
    }
    None
}

/// One line per compared thread, with its distance to every thread of the population.
impl fmt::Display for DistanceMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.m {
            for j in 0..self.n {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{:.4}", self.checked_get(i, j).unwrap_or_default())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Iterator over a run of consecutive cells of the row-major enumeration.
#[derive(Debug, Clone)]
pub struct Cells {
    m: usize,
    n: usize,
    i: usize,
    j: usize,
    remaining: usize,
}

impl Cells {
    pub(crate) fn new(m: usize, n: usize, i: usize, j: usize, len: usize) -> Self {
        Self {
            m,
            n,
            i,
            j,
            remaining: len,
        }
    }
}

impl Iterator for Cells {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.i >= self.m || self.j >= self.n {
            return None;
        }
        let cell = (self.i, self.j);
        self.remaining -= 1;
        self.j += 1;
        if self.j == self.n {
            self.i += 1;
            self.j = self.i + 1;
        }
        Some(cell)
    }
}
