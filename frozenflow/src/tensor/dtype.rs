use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "bool")]
    Bool,
}

impl DType {
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Int32 => "int32",
            DType::Bool => "bool",
        }
    }

    /// Parse either the short name (`float32`) or the graph enum name (`DT_FLOAT`).
    pub fn from_ident(ident: &str) -> Result<Self> {
        match ident.trim() {
            "float32" | "f32" | "DT_FLOAT" | "DT_HALF" | "DT_DOUBLE" => Ok(DType::Float32),
            "int32" | "i32" | "DT_INT32" | "DT_INT64" | "DT_INT16" | "DT_INT8" | "DT_UINT8" => {
                Ok(DType::Int32)
            }
            "bool" | "DT_BOOL" => Ok(DType::Bool),
            other => Err(anyhow!("unsupported dtype {}", other)),
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, DType::Bool)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        DType::from_ident(s)
    }
}
