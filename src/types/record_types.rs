use crate::errors::engine_error::EngineError;
use crate::types::catalog_types::{ColMeta, ColType};
use std::fmt;

// Represents a single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl Value {
    /// Serialize into the raw column representation: host-endian for numbers,
    /// zero-padded and truncated to the column length for CHAR.
    pub fn to_raw(&self, col: &ColMeta) -> Result<Vec<u8>, EngineError> {
        match (self, col.ty) {
            (Value::Int(v), ColType::Int) => Ok(v.to_ne_bytes().to_vec()),
            (Value::Float(v), ColType::Float) => Ok(v.to_ne_bytes().to_vec()),
            (Value::Str(s), ColType::Char) => {
                let mut buf = vec![0u8; col.len];
                let n = s.len().min(col.len);
                buf[..n].copy_from_slice(&s.as_bytes()[..n]);
                Ok(buf)
            }
            _ => Err(EngineError::TypeMismatch {
                col: col.name.clone(),
                expected: col.ty,
            }),
        }
    }

    /// Write this value into `buf` at the column's offset.
    pub fn write_to(&self, buf: &mut [u8], col: &ColMeta) -> Result<(), EngineError> {
        let raw = self.to_raw(col)?;
        buf[col.offset..col.offset + col.len].copy_from_slice(&raw);
        Ok(())
    }
}

/// Fixed-length record payload as stored in a heap slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
        }
    }

    /// Decode the value stored in one column of this record.
    pub fn read_value(&self, col: &ColMeta) -> Value {
        let seg = &self.data[col.offset..col.offset + col.len];
        match col.ty {
            ColType::Int => {
                let mut b = [0u8; 4];
                b.copy_from_slice(seg);
                Value::Int(i32::from_ne_bytes(b))
            }
            ColType::Float => {
                let mut b = [0u8; 4];
                b.copy_from_slice(seg);
                Value::Float(f32::from_ne_bytes(b))
            }
            ColType::Char => {
                let end = seg.iter().position(|&b| b == 0).unwrap_or(seg.len());
                Value::Str(String::from_utf8_lossy(&seg[..end]).into_owned())
            }
        }
    }
}
