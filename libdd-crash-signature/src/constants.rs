// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Marker used by debuggers and symbolizers for a function they could not resolve.
pub const UNKNOWN_FUNCTION: &str = "??";

/// Prefix of the labels given to unknown frames paired between two threads.
pub const PAIRED_FUNCTION_PREFIX: &str = "unknown#";

/// Longest common prefix taken into account by Jaro-Winkler.
pub const JARO_WINKLER_PREFIX_CAP: usize = 4;

/// Weight of the common prefix in Jaro-Winkler (always < 0.25).
pub const JARO_WINKLER_PREFIX_WEIGHT: f32 = 0.2;

pub const DEFAULT_SHARD_COUNT: usize = 1;
