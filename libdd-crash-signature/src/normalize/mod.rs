// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Rewrites of threads that make distances less sensitive to missing symbols.
//!
//! [`pair_unknowns`] works on a pair of threads: it aligns them on the frames they share and gives
//! matching runs of unknown frames a common label, so that two crashes going through the same
//! stripped code are not told apart only because the debugger could not name it.
//! [`normalize_thread`] works on a single thread and drops frames that carry no information.

mod library;

use crate::frame::{DistanceComparable, Frame, FrameKind, FunctionName, Normalizable};
use crate::thread::Thread;
use tracing::trace;

/// Aligns `a` and `b` on their resolved frames and relabels the runs of unresolved frames found
/// at the same place in both threads.
///
/// A run is relabeled only when both sides of it consist of unresolved frames and have the same
/// length. Each relabeled position gets a fresh `unknown#k` label, so paired frames compare equal
/// to their counterpart and to nothing else. Threads without any common resolved frame are
/// returned unchanged.
///
/// The threads are consumed: pair clones, never the threads a population is built from.
pub fn pair_unknowns(mut a: Thread, mut b: Thread) -> (Thread, Thread) {
    let anchors = find_anchors(a.frames(), b.frames());
    if anchors.is_empty() {
        return (a, b);
    }
    trace!(anchors = anchors.len(), "pairing unknown frames");

    let ends = (a.frame_count(), b.frame_count());
    let mut label = 0u32;
    let mut prev: Option<(usize, usize)> = None;
    for &(ai, bj) in anchors.iter().chain(std::iter::once(&ends)) {
        let (a_start, b_start) = match prev {
            Some((pa, pb)) => (pa + 1, pb + 1),
            None => (0, 0),
        };
        // Anchors may reuse a position of `b`, which leaves an empty segment on that side.
        let a_range = a_start.min(ai)..ai;
        let b_range = b_start.min(bj)..bj;
        if a_range.len() == b_range.len()
            && !a_range.is_empty()
            && a.frames()[a_range.clone()].iter().all(Frame::is_unresolved)
            && b.frames()[b_range.clone()].iter().all(Frame::is_unresolved)
        {
            let a_frames = &mut a.frames_mut()[a_range];
            let b_frames = &mut b.frames_mut()[b_range];
            for (fa, fb) in a_frames.iter_mut().zip(b_frames.iter_mut()) {
                fa.set_function(FunctionName::Paired(label));
                fb.set_function(FunctionName::Paired(label));
                label += 1;
            }
        }
        prev = Some((ai, bj));
    }
    (a, b)
}

/// Positions `(i, j)` where the resolved frame `a[i]` equals `b[j]`.
///
/// Each resolved frame of `a` is matched with the nearest equal resolved frame of `b` after the
/// previous match. When there is none, the frame of `b` of the previous match is reused if it is
/// equal, e.g. for a recursion that is one frame deeper on one side. Both coordinates are
/// therefore non-decreasing.
pub(crate) fn find_anchors(a: &[Frame], b: &[Frame]) -> Vec<(usize, usize)> {
    let mut anchors: Vec<(usize, usize)> = vec![];
    for (i, fa) in a.iter().enumerate() {
        if fa.is_unresolved() {
            continue;
        }
        let from = anchors.last().map_or(0, |&(_, j)| j + 1);
        let next = b
            .get(from..)
            .unwrap_or_default()
            .iter()
            .position(|fb| !fb.is_unresolved() && fa.distance_eq(fb))
            .map(|offset| from + offset);
        let reused = anchors
            .last()
            .map(|&(_, j)| j)
            .filter(|&j| fa.distance_eq(&b[j]));
        if let Some(j) = next.or(reused) {
            anchors.push((i, j));
        }
    }
    anchors
}

/// Drops the frames that only add noise to a comparison.
///
/// Debugger threads lose the exit path, the assertion and allocator internals and the startup
/// and glib dispatch frames, and CPU specific variants of libc functions get their public name.
/// Kernel oops threads lose the generic frames of the core kernel.
///
/// An unresolved frame at address zero on top of the thread comes from a call through a null
/// function pointer, and at the bottom of the thread from the end of the unwinding; both are
/// removed. Direct recursion is folded so that the recursion depth does not count as a
/// difference.
pub fn normalize_thread(mut thread: Thread) -> Thread {
    let kind = thread.kind();
    let frames = thread.frames_vec_mut();
    match kind {
        FrameKind::Gdb => library::normalize_gdb_frames(frames),
        FrameKind::Koops => library::normalize_koops_frames(frames),
        _ => {}
    }
    if frames.first().is_some_and(is_null_jump) {
        frames.remove(0);
    }
    if frames.last().is_some_and(is_null_jump) {
        frames.pop();
    }
    frames.dedup_by(|next, prev| next.distance_eq(prev));
    thread
}

fn is_null_jump(frame: &Frame) -> bool {
    frame.is_unresolved() && frame.address() == Some(0)
}
