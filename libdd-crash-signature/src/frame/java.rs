// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{DistanceComparable, FunctionName, Normalizable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame of a Java stack trace.
///
/// Exceptions are recorded as frames too: `function` then holds the exception class and
/// `message` its message.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JavaFrame {
    /// Fully qualified method name, e.g. `org.example.Main.run`.
    #[serde(default)]
    pub function: FunctionName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_line: Option<u32>,
    /// Jar or directory the class was loaded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_path: Option<String>,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default)]
    pub is_exception: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JavaFrame {
    pub fn with_function(function: impl Into<FunctionName>) -> Self {
        Self {
            function: function.into(),
            ..Default::default()
        }
    }
}

impl DistanceComparable for JavaFrame {
    fn distance_eq(&self, other: &Self) -> bool {
        self.function.identity_eq(&other.function)
    }
}

impl Normalizable for JavaFrame {
    fn function(&self) -> &FunctionName {
        &self.function
    }

    fn set_function(&mut self, function: FunctionName) {
        self.function = function;
    }
}

impl fmt::Display for JavaFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exception {
            write!(f, "{}", self.function)?;
            if let Some(message) = &self.message {
                write!(f, ": {message}")?;
            }
            return Ok(());
        }
        write!(f, "at {}(", self.function)?;
        match (&self.file_name, self.file_line) {
            _ if self.is_native => f.write_str("Native Method")?,
            (Some(file), Some(line)) => write!(f, "{file}:{line}")?,
            (Some(file), None) => f.write_str(file)?,
            (None, _) => f.write_str("Unknown Source")?,
        }
        f.write_str(")")
    }
}

#[cfg(test)]
impl crate::test_utils::TestInstance for JavaFrame {
    fn test_instance(seed: u64) -> Self {
        Self {
            function: FunctionName::Known(format!("org.example.Class{seed}.run")),
            file_name: Some(format!("Class{seed}.java")),
            file_line: Some(seed as u32),
            class_path: Some("/opt/app/app.jar".to_string()),
            is_native: false,
            is_exception: false,
            message: None,
        }
    }
}
