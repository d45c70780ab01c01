// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stack frames of the supported crash report kinds.
//!
//! Every kind keeps its own field set, but all of them answer the same question: do two frames
//! denote the same code location? That question is asked through [`DistanceComparable`] by every
//! distance metric, and the unknown-function pairing relabels frames through [`Normalizable`].

mod coredump;
mod gdb;
mod java;
mod js;
mod koops;
mod python;
mod ruby;

pub use coredump::CoreFrame;
pub use gdb::GdbFrame;
pub use java::JavaFrame;
pub use js::JsFrame;
pub use koops::KoopsFrame;
pub use python::PythonFrame;
pub use ruby::RubyFrame;

use crate::constants::{PAIRED_FUNCTION_PREFIX, UNKNOWN_FUNCTION};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Equality used by the distance metrics.
///
/// This is deliberately not `PartialEq`: two unresolved frames are never equal here, even when
/// every one of their fields is.
pub trait DistanceComparable {
    fn distance_eq(&self, other: &Self) -> bool;
}

/// Access to the function identity of a frame, used to pair unknown frames between threads.
pub trait Normalizable {
    fn function(&self) -> &FunctionName;

    fn set_function(&mut self, function: FunctionName);

    /// Whether nothing identifies the code location of this frame.
    fn is_unresolved(&self) -> bool {
        self.function().is_unknown()
    }
}

/// Identity of the function a frame belongs to.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum FunctionName {
    /// The parser could not resolve the function, rendered as `??`.
    #[default]
    Unknown,
    Known(String),
    /// Label shared by two unknown frames aligned by `pair_unknowns`, rendered as `unknown#k`.
    Paired(u32),
}

impl FunctionName {
    pub fn is_unknown(&self) -> bool {
        matches!(self, FunctionName::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, FunctionName::Known(_))
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            FunctionName::Known(name) => Some(name),
            _ => None,
        }
    }

    /// Two identities match when they are the same known name or the same pairing label.
    /// Unknown never matches anything, not even another unknown.
    pub fn identity_eq(&self, other: &FunctionName) -> bool {
        match (self, other) {
            (FunctionName::Known(a), FunctionName::Known(b)) => a == b,
            (FunctionName::Paired(a), FunctionName::Paired(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for FunctionName {
    fn from(name: &str) -> Self {
        if name.is_empty() || name == UNKNOWN_FUNCTION {
            FunctionName::Unknown
        } else {
            FunctionName::Known(name.to_string())
        }
    }
}

impl From<String> for FunctionName {
    fn from(name: String) -> Self {
        if name.is_empty() || name == UNKNOWN_FUNCTION {
            FunctionName::Unknown
        } else {
            FunctionName::Known(name)
        }
    }
}

impl From<Option<String>> for FunctionName {
    fn from(name: Option<String>) -> Self {
        name.map(FunctionName::from).unwrap_or_default()
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionName::Unknown => f.write_str(UNKNOWN_FUNCTION),
            FunctionName::Known(name) => f.write_str(name),
            FunctionName::Paired(label) => write!(f, "{PAIRED_FUNCTION_PREFIX}{label}"),
        }
    }
}

/// The closed set of frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// Frames unwound from a core dump.
    Core,
    Python,
    /// Kernel oops frames.
    Koops,
    Java,
    /// Frames of a debugger (gdb) backtrace transcript.
    Gdb,
    Ruby,
    Js,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Core => "core",
            FrameKind::Python => "python",
            FrameKind::Koops => "koops",
            FrameKind::Java => "java",
            FrameKind::Gdb => "gdb",
            FrameKind::Ruby => "ruby",
            FrameKind::Js => "js",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum Frame {
    Core(CoreFrame),
    Python(PythonFrame),
    Koops(KoopsFrame),
    Java(JavaFrame),
    Gdb(GdbFrame),
    Ruby(RubyFrame),
    Js(JsFrame),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Core(_) => FrameKind::Core,
            Frame::Python(_) => FrameKind::Python,
            Frame::Koops(_) => FrameKind::Koops,
            Frame::Java(_) => FrameKind::Java,
            Frame::Gdb(_) => FrameKind::Gdb,
            Frame::Ruby(_) => FrameKind::Ruby,
            Frame::Js(_) => FrameKind::Js,
        }
    }

    /// Absolute address of the frame, for the kinds that record one.
    pub fn address(&self) -> Option<u64> {
        match self {
            Frame::Core(frame) => Some(frame.address),
            Frame::Koops(frame) => Some(frame.address),
            Frame::Gdb(frame) => frame.address,
            Frame::Python(_) | Frame::Java(_) | Frame::Ruby(_) | Frame::Js(_) => None,
        }
    }

    /// Whether the frame counts as well resolved when rating the quality of a thread.
    ///
    /// Debugger frames need both a function name and a source file (or to be the signal handler
    /// trampoline), other kinds only need to be resolved.
    pub fn is_quality_ok(&self) -> bool {
        match self {
            Frame::Gdb(frame) => frame.is_quality_ok(),
            _ => !self.is_unresolved(),
        }
    }
}

/// Returns whether two frames denote the same code location. Frames of different kinds are
/// never equal.
pub fn distance_equal(a: &Frame, b: &Frame) -> bool {
    a.distance_eq(b)
}

impl DistanceComparable for Frame {
    fn distance_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Frame::Core(a), Frame::Core(b)) => a.distance_eq(b),
            (Frame::Python(a), Frame::Python(b)) => a.distance_eq(b),
            (Frame::Koops(a), Frame::Koops(b)) => a.distance_eq(b),
            (Frame::Java(a), Frame::Java(b)) => a.distance_eq(b),
            (Frame::Gdb(a), Frame::Gdb(b)) => a.distance_eq(b),
            (Frame::Ruby(a), Frame::Ruby(b)) => a.distance_eq(b),
            (Frame::Js(a), Frame::Js(b)) => a.distance_eq(b),
            _ => false,
        }
    }
}

impl Normalizable for Frame {
    fn function(&self) -> &FunctionName {
        match self {
            Frame::Core(frame) => frame.function(),
            Frame::Python(frame) => frame.function(),
            Frame::Koops(frame) => frame.function(),
            Frame::Java(frame) => frame.function(),
            Frame::Gdb(frame) => frame.function(),
            Frame::Ruby(frame) => frame.function(),
            Frame::Js(frame) => frame.function(),
        }
    }

    fn set_function(&mut self, function: FunctionName) {
        match self {
            Frame::Core(frame) => frame.set_function(function),
            Frame::Python(frame) => frame.set_function(function),
            Frame::Koops(frame) => frame.set_function(function),
            Frame::Java(frame) => frame.set_function(function),
            Frame::Gdb(frame) => frame.set_function(function),
            Frame::Ruby(frame) => frame.set_function(function),
            Frame::Js(frame) => frame.set_function(function),
        }
    }

    fn is_unresolved(&self) -> bool {
        match self {
            Frame::Core(frame) => frame.is_unresolved(),
            Frame::Python(frame) => frame.is_unresolved(),
            Frame::Koops(frame) => frame.is_unresolved(),
            Frame::Java(frame) => frame.is_unresolved(),
            Frame::Gdb(frame) => frame.is_unresolved(),
            Frame::Ruby(frame) => frame.is_unresolved(),
            Frame::Js(frame) => frame.is_unresolved(),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Core(frame) => frame.fmt(f),
            Frame::Python(frame) => frame.fmt(f),
            Frame::Koops(frame) => frame.fmt(f),
            Frame::Java(frame) => frame.fmt(f),
            Frame::Gdb(frame) => frame.fmt(f),
            Frame::Ruby(frame) => frame.fmt(f),
            Frame::Js(frame) => frame.fmt(f),
        }
    }
}

impl From<CoreFrame> for Frame {
    fn from(frame: CoreFrame) -> Self {
        Frame::Core(frame)
    }
}

impl From<PythonFrame> for Frame {
    fn from(frame: PythonFrame) -> Self {
        Frame::Python(frame)
    }
}

impl From<KoopsFrame> for Frame {
    fn from(frame: KoopsFrame) -> Self {
        Frame::Koops(frame)
    }
}

impl From<JavaFrame> for Frame {
    fn from(frame: JavaFrame) -> Self {
        Frame::Java(frame)
    }
}

impl From<GdbFrame> for Frame {
    fn from(frame: GdbFrame) -> Self {
        Frame::Gdb(frame)
    }
}

impl From<RubyFrame> for Frame {
    fn from(frame: RubyFrame) -> Self {
        Frame::Ruby(frame)
    }
}

impl From<JsFrame> for Frame {
    fn from(frame: JsFrame) -> Self {
        Frame::Js(frame)
    }
}

/// Missing qualifiers are not used to tell two frames apart.
pub(crate) fn qualifiers_match(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_from_str() {
        assert_eq!(FunctionName::from("??"), FunctionName::Unknown);
        assert_eq!(FunctionName::from(""), FunctionName::Unknown);
        assert_eq!(
            FunctionName::from("main"),
            FunctionName::Known("main".to_string())
        );
        // A real function may carry the pairing prefix without becoming a pairing label.
        assert_eq!(
            FunctionName::from("unknown#0"),
            FunctionName::Known("unknown#0".to_string())
        );
        assert_eq!(FunctionName::from(None), FunctionName::Unknown);
    }

    #[test]
    fn test_function_name_display() {
        assert_eq!(FunctionName::Unknown.to_string(), "??");
        assert_eq!(FunctionName::Known("f".to_string()).to_string(), "f");
        assert_eq!(FunctionName::Paired(3).to_string(), "unknown#3");
    }

    #[test]
    fn test_identity_eq() {
        let main = FunctionName::from("main");
        assert!(main.identity_eq(&FunctionName::from("main")));
        assert!(!main.identity_eq(&FunctionName::from("other")));
        assert!(!FunctionName::Unknown.identity_eq(&FunctionName::Unknown));
        assert!(FunctionName::Paired(1).identity_eq(&FunctionName::Paired(1)));
        assert!(!FunctionName::Paired(1).identity_eq(&FunctionName::Paired(2)));
        assert!(!FunctionName::Paired(0).identity_eq(&FunctionName::Known("unknown#0".into())));
    }

    #[test]
    fn test_different_kinds_never_equal() {
        let gdb: Frame = GdbFrame::with_function("main").into();
        let koops: Frame = KoopsFrame::with_function("main").into();
        assert!(!distance_equal(&gdb, &koops));
        assert!(!distance_equal(&koops, &gdb));
        assert!(distance_equal(&gdb, &gdb.clone()));
    }

    #[test]
    fn test_unresolved_frames_never_equal() {
        use crate::test_utils::TestInstance;

        let mut frames: Vec<Frame> = vec![
            CoreFrame::test_instance(1).into(),
            GdbFrame::test_instance(1).into(),
            JavaFrame::test_instance(1).into(),
            JsFrame::test_instance(1).into(),
            KoopsFrame::test_instance(1).into(),
            PythonFrame::test_instance(1).into(),
            RubyFrame::test_instance(1).into(),
        ];
        for frame in &mut frames {
            frame.set_function(FunctionName::Unknown);
            if let Frame::Core(core) = frame {
                core.build_id = None;
            }
            assert!(frame.is_unresolved(), "{frame:?}");
        }
        for a in &frames {
            for b in &frames {
                assert!(!distance_equal(a, b), "{a:?} equals {b:?}");
            }
        }
    }

    #[test]
    fn test_qualifiers_match() {
        let a = Some("libc.so.6".to_string());
        let b = Some("libm.so.6".to_string());
        assert!(qualifiers_match(&a, &a.clone()));
        assert!(!qualifiers_match(&a, &b));
        assert!(qualifiers_match(&a, &None));
        assert!(qualifiers_match(&None, &b));
        assert!(qualifiers_match(&None, &None));
    }

    #[test]
    fn test_frame_kind_serde() {
        let json = serde_json::to_string(&FrameKind::Koops).unwrap();
        assert_eq!(json, "\"koops\"");
        let kind: FrameKind = serde_json::from_str("\"gdb\"").unwrap();
        assert_eq!(kind, FrameKind::Gdb);
    }
}
