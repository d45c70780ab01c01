// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{DistanceComparable, FunctionName, Normalizable};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame unwound from a core dump.
///
/// Stripped binaries often leave the function unknown, in which case the frame is located by the
/// build id of its module and the offset inside of it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoreFrame {
    /// Absolute address in the crashed process.
    #[serde(default)]
    pub address: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    /// Offset of the address from the start of the module identified by `build_id`.
    #[serde(default)]
    pub build_id_offset: u64,
    #[serde(default)]
    pub function: FunctionName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Hash of the machine code around the address, used when nothing else identifies the frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub fingerprint_hashed: bool,
}

impl CoreFrame {
    pub fn with_function(function: impl Into<FunctionName>) -> Self {
        Self {
            function: function.into(),
            ..Default::default()
        }
    }

    pub fn with_build_id(build_id: impl Into<String>, build_id_offset: u64) -> Self {
        Self {
            build_id: Some(build_id.into()),
            build_id_offset,
            ..Default::default()
        }
    }
}

impl DistanceComparable for CoreFrame {
    fn distance_eq(&self, other: &Self) -> bool {
        if !self.function.is_unknown() && !other.function.is_unknown() {
            return self.function.identity_eq(&other.function);
        }
        if let (Some(a), Some(b)) = (&self.build_id, &other.build_id) {
            if a == b && self.build_id_offset == other.build_id_offset {
                return true;
            }
        }
        // The same code may still be found in another build of the module.
        match (&self.fingerprint, &other.fingerprint) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Normalizable for CoreFrame {
    fn function(&self) -> &FunctionName {
        &self.function
    }

    fn set_function(&mut self, function: FunctionName) {
        self.function = function;
    }

    /// A core frame is located by its function, its build id or its fingerprint.
    fn is_unresolved(&self) -> bool {
        self.function.is_unknown() && self.build_id.is_none() && self.fingerprint.is_none()
    }
}

impl fmt::Display for CoreFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.address)?;
        if let Some(build_id) = &self.build_id {
            write!(f, " {build_id}+{:#x}", self.build_id_offset)?;
        }
        write!(f, " {}", self.function)?;
        if let Some(file) = &self.file_name {
            write!(f, " {file}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl crate::test_utils::TestInstance for CoreFrame {
    fn test_instance(seed: u64) -> Self {
        Self {
            address: 0x7f00_0000 + seed,
            build_id: Some(format!("{seed:040x}")),
            build_id_offset: seed * 0x10,
            function: FunctionName::Known(format!("fn_{seed}")),
            file_name: Some("/usr/lib64/libexample.so".to_string()),
            fingerprint: None,
            fingerprint_hashed: false,
        }
    }
}
