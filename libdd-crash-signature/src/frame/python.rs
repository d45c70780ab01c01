// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{DistanceComparable, FunctionName, Normalizable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame of a Python traceback.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PythonFrame {
    /// `file_name` is a placeholder such as `<stdin>` rather than a path.
    #[serde(default)]
    pub special_file: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_line: u32,
    /// `function` is a placeholder such as `<module>` rather than a function name.
    #[serde(default)]
    pub special_function: bool,
    #[serde(default)]
    pub function: FunctionName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_contents: Option<String>,
}

impl PythonFrame {
    pub fn new(function: impl Into<FunctionName>, file_name: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }
}

impl DistanceComparable for PythonFrame {
    fn distance_eq(&self, other: &Self) -> bool {
        self.function.identity_eq(&other.function)
            && self.file_name == other.file_name
            && self.special_function == other.special_function
            && self.special_file == other.special_file
    }
}

impl Normalizable for PythonFrame {
    fn function(&self) -> &FunctionName {
        &self.function
    }

    fn set_function(&mut self, function: FunctionName) {
        self.function = function;
    }
}

impl fmt::Display for PythonFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file_name.as_deref().unwrap_or_default();
        if self.special_file {
            write!(f, "File \"<{file}>\"")?;
        } else {
            write!(f, "File \"{file}\"")?;
        }
        write!(f, ", line {}, in ", self.file_line)?;
        if self.special_function {
            write!(f, "<{}>", self.function)
        } else {
            write!(f, "{}", self.function)
        }
    }
}

#[cfg(test)]
impl crate::test_utils::TestInstance for PythonFrame {
    fn test_instance(seed: u64) -> Self {
        Self {
            special_file: false,
            file_name: Some(format!("/usr/lib/python3/module_{seed}.py")),
            file_line: seed as u32,
            special_function: false,
            function: FunctionName::Known(format!("fn_{seed}")),
            line_contents: Some("raise ValueError()".to_string()),
        }
    }
}
