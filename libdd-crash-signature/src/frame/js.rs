// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{DistanceComparable, FunctionName, Normalizable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame of a JavaScript stack trace, such as `at doWork (/srv/app/index.js:12:7)`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JsFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_line: u32,
    #[serde(default)]
    pub line_column: u32,
    #[serde(default)]
    pub function: FunctionName,
}

impl JsFrame {
    pub fn new(function: impl Into<FunctionName>, file_name: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file_name: Some(file_name.into()),
            file_line: line,
            line_column: 0,
        }
    }
}

impl DistanceComparable for JsFrame {
    fn distance_eq(&self, other: &Self) -> bool {
        // Source line first, then function, then file.
        self.file_line == other.file_line
            && self.function.identity_eq(&other.function)
            && self.file_name == other.file_name
    }
}

impl Normalizable for JsFrame {
    fn function(&self) -> &FunctionName {
        &self.function
    }

    fn set_function(&mut self, function: FunctionName) {
        self.function = function;
    }
}

impl fmt::Display for JsFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file_name.as_deref().unwrap_or_default();
        write!(
            f,
            "at {} ({file}:{}:{})",
            self.function, self.file_line, self.line_column
        )
    }
}

#[cfg(test)]
impl crate::test_utils::TestInstance for JsFrame {
    fn test_instance(seed: u64) -> Self {
        Self {
            file_name: Some(format!("/srv/app/file_{seed}.js")),
            file_line: seed as u32,
            line_column: 1,
            function: FunctionName::Known(format!("fn_{seed}")),
        }
    }
}
