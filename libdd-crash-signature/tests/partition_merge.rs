// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use libdd_crash_signature::frame::GdbFrame;
use libdd_crash_signature::{
    merge, partition, population_checksum, DistanceMatrix, DistancePartition, DistanceType,
    FrameKind, MergeError, Thread,
};

fn gdb_thread(names: &[&str]) -> Thread {
    let mut thread = Thread::new(0, FrameKind::Gdb);
    for name in names {
        thread.push_frame(GdbFrame::with_function(*name)).unwrap();
    }
    thread
}

fn population() -> Vec<Thread> {
    vec![
        gdb_thread(&["asd", "agd", "das", "??"]),
        gdb_thread(&["asd", "agd", "??"]),
        gdb_thread(&["asd", "agd", "??"]),
        gdb_thread(&["dg", "??", "??"]),
        gdb_thread(&["foo", "??"]),
        gdb_thread(&["bbb", "??", "foo", "bar", "baz"]),
        gdb_thread(&["dg"]),
        gdb_thread(&["bar", "das", "baz"]),
    ]
}

fn cells(m: usize, n: usize) -> usize {
    m * (m - 1) / 2 + m * (n - m)
}

fn compute_all(
    threads: &[Thread],
    m: usize,
    n: usize,
    metric: DistanceType,
    shard_count: usize,
) -> Vec<DistancePartition> {
    let mut partitions = partition(m, n, metric, shard_count).unwrap();
    for partition in &mut partitions {
        partition.compute(&threads[..n]).unwrap();
    }
    partitions
}

#[test]
fn compare_population_reference_values() {
    let threads = population();
    let matrix =
        DistanceMatrix::compare_population(&threads[..4], 3, 4, DistanceType::Jaccard).unwrap();
    let expected = [
        ((0, 1), 0.6),
        ((0, 2), 0.6),
        ((0, 3), 1.0),
        ((1, 2), 0.0),
        ((1, 3), 1.0),
        ((2, 3), 1.0),
    ];
    for ((i, j), distance) in expected {
        assert!(
            (matrix.get(i, j) - distance).abs() < 1e-6,
            "({i}, {j}) = {}",
            matrix.get(i, j)
        );
    }
}

#[test]
fn partition_divide() {
    let mut cases = vec![];
    for k in (1..=13).chain([18, 19, 5000]) {
        cases.push((3, 8, k));
    }
    for k in [5, 10, 20, 50] {
        cases.push((50, 50, k));
    }
    for k in [50, 3000] {
        cases.push((1, 50, k));
    }

    for (m, n, k) in cases {
        let partitions = partition(m, n, DistanceType::Levenshtein, k).unwrap();
        let effective_m = m.min(n - 1);
        let total = cells(effective_m, n);
        assert_eq!(partitions.len(), k.min(total), "({m}, {n}, {k})");

        let lens: Vec<_> = partitions.iter().map(DistancePartition::len).collect();
        assert_eq!(lens.iter().sum::<usize>(), total);
        let (min, max) = (lens.iter().min().unwrap(), lens.iter().max().unwrap());
        assert!(max - min <= 1, "({m}, {n}, {k}) sizes {lens:?}");
        assert!(lens.windows(2).all(|w| w[0] >= w[1]));

        // Runs follow each other without gaps.
        let mut expected_cells = (0..effective_m).flat_map(|i| (i + 1..n).map(move |j| (i, j)));
        for partition in &partitions {
            assert_eq!(partition.m(), effective_m);
            for cell in partition.cells() {
                assert_eq!(Some(cell), expected_cells.next());
            }
        }
        assert_eq!(expected_cells.next(), None);
    }
}

#[test]
fn partition_conquer() {
    let threads = population();
    for (m, n, shard_counts) in [
        (3, 4, vec![1, 2, 3, 4]),
        (2, 5, vec![1, 2, 3, 4]),
        (7, 8, vec![1, 2, 4, 8, 16]),
    ] {
        let direct =
            DistanceMatrix::compare_population(&threads[..n], m, n, DistanceType::Jaccard).unwrap();
        for k in shard_counts {
            let merged = merge(&compute_all(&threads, m, n, DistanceType::Jaccard, k)).unwrap();
            assert_eq!(merged, direct, "({m}, {n}, {k})");
        }
    }
}

#[test]
fn merge_equivalence_for_every_metric() {
    let threads = population();
    for metric in [
        DistanceType::Levenshtein,
        DistanceType::DamerauLevenshtein,
        DistanceType::Jaccard,
        DistanceType::JaroWinkler,
    ] {
        let direct = DistanceMatrix::compare_population(&threads, 3, 8, metric).unwrap();
        for k in 1..=19 {
            let merged = merge(&compute_all(&threads, 3, 8, metric, k)).unwrap();
            assert_eq!(merged, direct, "{metric} with {k} shards");
        }
    }
}

#[test]
fn shards_computed_on_separate_threads() {
    let threads = population();
    let mut partitions = partition(7, 8, DistanceType::DamerauLevenshtein, 5).unwrap();
    std::thread::scope(|scope| {
        for partition in &mut partitions {
            let threads = &threads;
            scope.spawn(move || partition.compute(threads).unwrap());
        }
    });
    let direct =
        DistanceMatrix::compare_population(&threads, 7, 8, DistanceType::DamerauLevenshtein)
            .unwrap();
    assert_eq!(merge(&partitions).unwrap(), direct);
}

#[test]
fn checksum_mismatch_is_rejected() {
    let threads = population();
    let mut other = threads.clone();
    other[5] = gdb_thread(&["bbb", "??", "foo"]);
    assert_ne!(population_checksum(&threads), population_checksum(&other));

    let mut partitions = compute_all(&threads, 3, 8, DistanceType::Jaccard, 4);
    let foreign = compute_all(&other, 3, 8, DistanceType::Jaccard, 4);
    partitions[2] = foreign[2].clone();
    assert_eq!(
        merge(&partitions),
        Err(MergeError::ChecksumMismatch {
            index: 2,
            expected: population_checksum(&threads),
            found: population_checksum(&other),
        })
    );
}

#[test]
fn restored_partitions_merge() {
    let threads = population();
    let partitions = compute_all(&threads, 7, 8, DistanceType::JaroWinkler, 6);
    let json = serde_json::to_string(&partitions).unwrap();

    let restored: Vec<DistancePartition> = serde_json::from_str(&json).unwrap();
    assert!(restored.iter().all(|p| p.verify_checksum(&threads)));
    let merged = merge(&restored).unwrap();

    // The matrix itself survives persistence through its flat storage.
    let (m, n, distances) = merged.clone().into_parts();
    assert_eq!(DistanceMatrix::from_parts(m, n, distances).unwrap(), merged);
    assert_eq!(merged, merge(&partitions).unwrap());
}
