// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{qualifiers_match, DistanceComparable, FunctionName, Normalizable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame of a kernel oops call trace, such as
/// `[<ffffffff8108b3c9>] ? warn_slowpath_common+0x69/0xa0 [ext4]`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KoopsFrame {
    #[serde(default)]
    pub address: u64,
    /// False when the kernel printed the frame with a `?`, meaning it was only guessed from a
    /// stale stack slot.
    #[serde(default)]
    pub reliable: bool,
    #[serde(default)]
    pub function: FunctionName,
    #[serde(default)]
    pub function_offset: u64,
    #[serde(default)]
    pub function_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    /// Name of the exception or interrupt stack the frame was found on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_stack: Option<String>,
}

impl KoopsFrame {
    pub fn with_function(function: impl Into<FunctionName>) -> Self {
        Self {
            function: function.into(),
            reliable: true,
            ..Default::default()
        }
    }
}

impl DistanceComparable for KoopsFrame {
    fn distance_eq(&self, other: &Self) -> bool {
        self.function.identity_eq(&other.function)
            && qualifiers_match(&self.module_name, &other.module_name)
    }
}

impl Normalizable for KoopsFrame {
    fn function(&self) -> &FunctionName {
        &self.function
    }

    fn set_function(&mut self, function: FunctionName) {
        self.function = function;
    }
}

impl fmt::Display for KoopsFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[<{:016x}>] ", self.address)?;
        if !self.reliable {
            f.write_str("? ")?;
        }
        write!(
            f,
            "{}+{:#x}/{:#x}",
            self.function, self.function_offset, self.function_length
        )?;
        if let Some(module) = &self.module_name {
            write!(f, " [{module}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl crate::test_utils::TestInstance for KoopsFrame {
    fn test_instance(seed: u64) -> Self {
        Self {
            address: 0xffff_ffff_8100_0000 + seed,
            reliable: seed % 2 == 0,
            function: FunctionName::Known(format!("fn_{seed}")),
            function_offset: seed,
            function_length: 0x100,
            module_name: None,
            special_stack: None,
        }
    }
}
