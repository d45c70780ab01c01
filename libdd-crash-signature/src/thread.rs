// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::DistanceError;
use crate::frame::{Frame, FrameKind, Normalizable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of frames of a single kind, innermost call first.
///
/// The kind is fixed when the thread is created and every frame pushed afterwards must share it,
/// so the metrics never see a mixed sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThreadRepr")]
pub struct Thread {
    id: u32,
    kind: FrameKind,
    frames: Vec<Frame>,
}

#[derive(Deserialize)]
struct ThreadRepr {
    #[serde(default)]
    id: u32,
    kind: FrameKind,
    #[serde(default)]
    frames: Vec<Frame>,
}

impl TryFrom<ThreadRepr> for Thread {
    type Error = DistanceError;

    fn try_from(repr: ThreadRepr) -> Result<Self, Self::Error> {
        Thread::from_frames(repr.id, repr.kind, repr.frames)
    }
}

impl Thread {
    pub fn new(id: u32, kind: FrameKind) -> Self {
        Self {
            id,
            kind,
            frames: vec![],
        }
    }

    pub fn from_frames(id: u32, kind: FrameKind, frames: Vec<Frame>) -> Result<Self, DistanceError> {
        if let Some(frame) = frames.iter().find(|frame| frame.kind() != kind) {
            return Err(DistanceError::KindMismatch {
                expected: kind,
                found: frame.kind(),
            });
        }
        Ok(Self { id, kind, frames })
    }

    pub fn push_frame(&mut self, frame: impl Into<Frame>) -> Result<(), DistanceError> {
        let frame = frame.into();
        if frame.kind() != self.kind {
            return Err(DistanceError::KindMismatch {
                expected: self.kind,
                found: frame.kind(),
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frame contents may be edited in place, the sequence itself only through the methods
    /// below, which keeps the kind invariant.
    pub(crate) fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub(crate) fn frames_vec_mut(&mut self) -> &mut Vec<Frame> {
        &mut self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Removes and returns the frame at `index`, or `None` when there is no such frame.
    pub fn remove_frame(&mut self, index: usize) -> Option<Frame> {
        (index < self.frames.len()).then(|| self.frames.remove(index))
    }

    /// Removes every frame above (more inner than) `index`, so that the frame at `index` becomes
    /// the top of the thread. Returns false if `index` is out of range.
    pub fn remove_frames_above(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        self.frames.drain(..index);
        true
    }

    /// Keeps only the `n` innermost frames.
    pub fn remove_frames_below_n(&mut self, n: usize) {
        self.frames.truncate(n);
    }

    /// Returns `(ok, all)`: the number of well resolved frames and the number of frames.
    pub fn quality_counts(&self) -> (usize, usize) {
        let ok = self.frames.iter().filter(|f| f.is_quality_ok()).count();
        (ok, self.frames.len())
    }

    /// Share of well resolved frames, 1.0 for an empty thread.
    pub fn quality(&self) -> f32 {
        match self.quality_counts() {
            (_, 0) => 1.0,
            (ok, all) => ok as f32 / all as f32,
        }
    }

    pub fn is_fully_resolved(&self) -> bool {
        let (ok, all) = self.quality_counts();
        ok == all
    }

    /// The rendered function identity of every frame, innermost first.
    pub fn function_names(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|frame| frame.function().to_string())
            .collect()
    }
}

impl fmt::Display for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Thread {} ({})", self.id, self.kind)?;
        for frame in &self.frames {
            writeln!(f, "{frame}")?;
        }
        Ok(())
    }
}

/// Returns the kind shared by every thread, or `None` for an empty population.
pub(crate) fn ensure_uniform_kind(threads: &[Thread]) -> Result<Option<FrameKind>, DistanceError> {
    let Some(first) = threads.first() else {
        return Ok(None);
    };
    let expected = first.kind();
    match threads.iter().find(|t| t.kind() != expected) {
        Some(other) => Err(DistanceError::KindMismatch {
            expected,
            found: other.kind(),
        }),
        None => Ok(Some(expected)),
    }
}

/// All the threads of one crash report.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stacktrace {
    threads: Vec<Thread>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crash_thread: Option<usize>,
}

impl Stacktrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stacktrace of a runtime without threads, where the trace itself is the crash thread.
    pub fn single(thread: Thread) -> Self {
        Self {
            threads: vec![thread],
            crash_thread: Some(0),
        }
    }

    pub fn push_thread(&mut self, thread: Thread) {
        self.threads.push(thread);
    }

    pub fn set_crash_thread(&mut self, index: usize) -> anyhow::Result<()> {
        anyhow::ensure!(
            index < self.threads.len(),
            "crash thread {index} out of range, stacktrace has {} threads",
            self.threads.len()
        );
        self.crash_thread = Some(index);
        Ok(())
    }

    /// The thread that crashed. When the parser did not single one out, a stacktrace with exactly
    /// one thread answers with that thread.
    pub fn crash_thread(&self) -> Option<&Thread> {
        match self.crash_thread {
            Some(index) => self.threads.get(index),
            None if self.threads.len() == 1 => self.threads.first(),
            None => None,
        }
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{GdbFrame, JavaFrame};
    use crate::test_utils::{gdb_thread, TestInstance};

    #[test]
    fn test_push_rejects_other_kinds() {
        let mut thread = Thread::new(1, FrameKind::Gdb);
        thread.push_frame(GdbFrame::with_function("main")).unwrap();
        let err = thread
            .push_frame(JavaFrame::with_function("Main.main"))
            .unwrap_err();
        assert_eq!(
            err,
            DistanceError::KindMismatch {
                expected: FrameKind::Gdb,
                found: FrameKind::Java
            }
        );
        assert_eq!(thread.frame_count(), 1);
    }

    #[test]
    fn test_from_frames_checks_kind() {
        let frames = vec![
            Frame::from(GdbFrame::with_function("a")),
            Frame::from(JavaFrame::with_function("b")),
        ];
        assert!(Thread::from_frames(0, FrameKind::Gdb, frames).is_err());
    }

    #[test]
    fn test_remove_frames() {
        let mut thread = gdb_thread(&["a", "b", "c", "d", "e"]);
        assert_eq!(thread.remove_frame(1).map(|f| f.to_string()), Some("#0 b".to_string()));
        assert_eq!(thread.remove_frame(10), None);
        assert_eq!(thread.function_names(), ["a", "c", "d", "e"]);

        assert!(thread.remove_frames_above(1));
        assert_eq!(thread.function_names(), ["c", "d", "e"]);
        assert!(!thread.remove_frames_above(3));

        thread.remove_frames_below_n(2);
        assert_eq!(thread.function_names(), ["c", "d"]);
        thread.remove_frames_below_n(5);
        assert_eq!(thread.frame_count(), 2);
    }

    #[test]
    fn test_quality() {
        let mut thread = Thread::new(0, FrameKind::Gdb);
        assert_eq!(thread.quality(), 1.0);
        assert!(thread.is_fully_resolved());

        thread.push_frame(GdbFrame::test_instance(1)).unwrap();
        thread.push_frame(GdbFrame::with_function("??")).unwrap();
        assert_eq!(thread.quality_counts(), (1, 2));
        assert_eq!(thread.quality(), 0.5);
        assert!(!thread.is_fully_resolved());
    }

    #[test]
    fn test_uniform_kind() {
        assert_eq!(ensure_uniform_kind(&[]), Ok(None));
        let threads = [gdb_thread(&["a"]), gdb_thread(&["b"])];
        assert_eq!(ensure_uniform_kind(&threads), Ok(Some(FrameKind::Gdb)));
        let mixed = [gdb_thread(&["a"]), Thread::new(0, FrameKind::Koops)];
        assert!(ensure_uniform_kind(&mixed).is_err());
    }

    #[test]
    fn test_crash_thread() {
        let mut trace = Stacktrace::new();
        assert!(trace.crash_thread().is_none());
        trace.push_thread(gdb_thread(&["a"]));
        assert_eq!(trace.crash_thread().map(Thread::function_names), Some(vec!["a".to_string()]));
        trace.push_thread(gdb_thread(&["b"]));
        assert!(trace.crash_thread().is_none());
        trace.set_crash_thread(1).unwrap();
        assert_eq!(trace.crash_thread().map(Thread::function_names), Some(vec!["b".to_string()]));
        assert!(trace.set_crash_thread(2).is_err());

        let single = Stacktrace::single(gdb_thread(&["c"]));
        assert_eq!(single.threads().len(), 1);
        assert!(single.crash_thread().is_some());
    }

    #[test]
    fn test_serde_keeps_kind_invariant() {
        let thread = gdb_thread(&["main", "??"]);
        let json = serde_json::to_string(&thread).unwrap();
        let restored: Thread = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, thread);

        let mixed = r#"{"id":0,"kind":"java","frames":[{"Gdb":{"function":"Unknown"}}]}"#;
        assert!(serde_json::from_str::<Thread>(mixed).is_err());
    }

    #[test]
    fn test_display() {
        let thread = gdb_thread(&["raise", "main"]);
        assert_eq!(thread.to_string(), "Thread 0 (gdb)\n#0 raise\n#0 main\n");
    }
}
