// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{qualifiers_match, DistanceComparable, FunctionName, Normalizable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame of a debugger backtrace transcript, such as `#2  0x00007f3 in raise () from
/// /lib64/libc.so.6`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GdbFrame {
    #[serde(default)]
    pub function: FunctionName,
    /// Return type and qualifiers printed before the function name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_type: Option<String>,
    /// Position of the frame in the backtrace, as printed by the debugger.
    #[serde(default)]
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<u32>,
    /// The frame is the `<signal handler called>` trampoline.
    #[serde(default)]
    pub signal_handler_called: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_name: Option<String>,
}

impl GdbFrame {
    pub fn with_function(function: impl Into<FunctionName>) -> Self {
        Self {
            function: function.into(),
            ..Default::default()
        }
    }

    pub(crate) fn is_quality_ok(&self) -> bool {
        if self.signal_handler_called {
            return true;
        }
        self.function.is_known() && self.source_file.as_deref().is_some_and(|f| !f.is_empty())
    }
}

impl DistanceComparable for GdbFrame {
    fn distance_eq(&self, other: &Self) -> bool {
        self.function.identity_eq(&other.function)
            && qualifiers_match(&self.library_name, &other.library_name)
    }
}

impl Normalizable for GdbFrame {
    fn function(&self) -> &FunctionName {
        &self.function
    }

    fn set_function(&mut self, function: FunctionName) {
        self.function = function;
    }
}

impl fmt::Display for GdbFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.signal_handler_called {
            return f.write_str("<signal handler called>");
        }
        write!(f, "#{} ", self.number)?;
        if let Some(address) = self.address {
            write!(f, "{address:#x} in ")?;
        }
        write!(f, "{}", self.function)?;
        if let Some(file) = &self.source_file {
            write!(f, " at {file}")?;
            if let Some(line) = self.source_line {
                write!(f, ":{line}")?;
            }
        }
        if let Some(library) = &self.library_name {
            write!(f, " from {library}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl crate::test_utils::TestInstance for GdbFrame {
    fn test_instance(seed: u64) -> Self {
        Self {
            function: FunctionName::Known(format!("fn_{seed}")),
            function_type: None,
            number: seed as u32,
            source_file: Some(format!("/src/file_{seed}.c")),
            source_line: Some(seed as u32 * 10),
            signal_handler_called: false,
            address: Some(0x400000 + seed),
            library_name: Some("libexample.so".to_string()),
        }
    }
}
