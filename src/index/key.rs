//! Composite key materialization.
//!
//! Index keys are the concatenation of the indexed column segments in
//! declaration order, each re-encoded so that plain byte comparison equals
//! typed comparison: INT sign-flipped big-endian, FLOAT with the IEEE-754
//! total-order bit trick, CHAR raw bytes.

use crate::errors::engine_error::EngineError;
use crate::types::catalog_types::{ColMeta, ColType, IndexMeta};
use crate::types::record_types::Value;

const SIGN_BIT: u32 = 1 << 31;

pub fn encode_i32(v: i32) -> [u8; 4] {
    ((v as u32) ^ SIGN_BIT).to_be_bytes()
}

pub fn encode_f32(v: f32) -> [u8; 4] {
    let bits = v.to_bits();
    let bits = if bits & SIGN_BIT != 0 {
        // Negative: flip all bits.
        !bits
    } else {
        // Positive or zero: flip the sign bit.
        bits ^ SIGN_BIT
    };
    bits.to_be_bytes()
}

/// Encode one column segment taken from a raw record.
fn encode_segment(col: &ColMeta, seg: &[u8], out: &mut Vec<u8>) {
    match col.ty {
        ColType::Int => {
            let mut b = [0u8; 4];
            b.copy_from_slice(seg);
            out.extend_from_slice(&encode_i32(i32::from_ne_bytes(b)));
        }
        ColType::Float => {
            let mut b = [0u8; 4];
            b.copy_from_slice(seg);
            out.extend_from_slice(&encode_f32(f32::from_ne_bytes(b)));
        }
        ColType::Char => out.extend_from_slice(seg),
    }
}

/// Build the composite key for `index` from a record's raw bytes.
pub fn composite_key(index: &IndexMeta, data: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(index.col_tot_len);
    for col in &index.cols {
        encode_segment(col, &data[col.offset..col.offset + col.len], &mut key);
    }
    key
}

/// Encode a single probe value for `col`, type-checked against the column.
pub fn encode_value(col: &ColMeta, val: &Value) -> Result<Vec<u8>, EngineError> {
    match (val, col.ty) {
        (Value::Int(v), ColType::Int) => Ok(encode_i32(*v).to_vec()),
        (Value::Float(v), ColType::Float) => Ok(encode_f32(*v).to_vec()),
        (Value::Str(_), ColType::Char) => val.to_raw(col),
        _ => Err(EngineError::TypeMismatch {
            col: col.name.clone(),
            expected: col.ty,
        }),
    }
}
