// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{DistanceComparable, FunctionName, Normalizable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame of a Ruby backtrace, such as
/// `/usr/share/ruby/vendor_ruby/will_crash.rb:13:in `block (2 levels) in func'`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RubyFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_line: u32,
    /// `function` is a placeholder such as `<main>` rather than a method name.
    #[serde(default)]
    pub special_function: bool,
    #[serde(default)]
    pub function: FunctionName,
    /// Nesting of blocks the frame executes in, zero outside of blocks.
    #[serde(default)]
    pub block_level: u32,
    #[serde(default)]
    pub rescue_level: u32,
}

impl RubyFrame {
    pub fn new(function: impl Into<FunctionName>, file_name: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }
}

impl DistanceComparable for RubyFrame {
    fn distance_eq(&self, other: &Self) -> bool {
        self.function.identity_eq(&other.function)
            && self.file_name == other.file_name
            && self.special_function == other.special_function
    }
}

impl Normalizable for RubyFrame {
    fn function(&self) -> &FunctionName {
        &self.function
    }

    fn set_function(&mut self, function: FunctionName) {
        self.function = function;
    }
}

impl fmt::Display for RubyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file_name.as_deref().unwrap_or_default();
        write!(f, "{file}:{}:in `", self.file_line)?;
        for _ in 0..self.rescue_level {
            f.write_str("rescue in ")?;
        }
        match self.block_level {
            0 => {}
            1 => f.write_str("block in ")?,
            levels => write!(f, "block ({levels} levels) in ")?,
        }
        if self.special_function {
            write!(f, "<{}>'", self.function)
        } else {
            write!(f, "{}'", self.function)
        }
    }
}

#[cfg(test)]
impl crate::test_utils::TestInstance for RubyFrame {
    fn test_instance(seed: u64) -> Self {
        Self {
            file_name: Some(format!("/usr/share/ruby/file_{seed}.rb")),
            file_line: seed as u32,
            special_function: false,
            function: FunctionName::Known(format!("fn_{seed}")),
            block_level: 0,
            rescue_level: 0,
        }
    }
}
