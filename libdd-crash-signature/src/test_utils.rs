// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::frame::{FrameKind, GdbFrame};
use crate::thread::Thread;

pub trait TestInstance {
    fn test_instance(seed: u64) -> Self;
}

/// A debugger thread with one frame per name, `??` standing for an unknown function.
pub fn gdb_thread(names: &[&str]) -> Thread {
    let mut thread = Thread::new(0, FrameKind::Gdb);
    for name in names {
        thread.push_frame(GdbFrame::with_function(*name)).unwrap();
    }
    thread
}
