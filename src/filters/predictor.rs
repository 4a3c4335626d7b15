use std::convert::TryFrom;

use crate::error::DecompressError;
use crate::{Dictionary, Object};

/// PNG row filter tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None,
    Sub,
    Up,
    Avg,
    Paeth,
}

impl TryFrom<u8> for FilterType {
    type Error = DecompressError;

    fn try_from(n: u8) -> Result<FilterType, DecompressError> {
        match n {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Avg),
            4 => Ok(FilterType::Paeth),
            _ => Err(DecompressError::Predictor(format!("invalid PNG filter type ({})", n))),
        }
    }
}

fn param(params: &Dictionary, key: &[u8], default: i64) -> Result<usize, DecompressError> {
    let value = params.get(key).and_then(Object::as_i64).unwrap_or(default);
    usize::try_from(value).map_err(|_| {
        DecompressError::Predictor(format!("/{} is negative", String::from_utf8_lossy(key)))
    })
}

/// Undo the predictor named in `/DecodeParms`, if any.
pub fn decode(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>, DecompressError> {
    let Some(params) = params else {
        return Ok(data);
    };
    match params.get(b"Predictor").and_then(Object::as_i64).unwrap_or(1) {
        1 => Ok(data),
        10..=15 => {
            let columns = param(params, b"Columns", 1)?.max(1);
            let colors = param(params, b"Colors", 1)?.max(1);
            let bits = param(params, b"BitsPerComponent", 8)?.max(1);
            let row_len = (columns * colors * bits).div_ceil(8);
            decode_up_rows(&data, row_len)
        }
        other => Err(DecompressError::Predictor(format!("predictor {}", other))),
    }
}

/// Decode rows of `row_len` bytes, each prefixed by a filter tag that must be Up.
///
/// The tag of the first row is not checked, since Up over a zero row is a copy.
/// An incomplete final row is dropped.
pub fn decode_up_rows(content: &[u8], row_len: usize) -> Result<Vec<u8>, DecompressError> {
    let rows = content.len() / (row_len + 1);
    if rows == 0 {
        return Err(DecompressError::Predictor("/Columns is greater than the stream length".to_string()));
    }

    let mut decoded = Vec::with_capacity(rows * row_len);
    for (row, chunk) in content.chunks_exact(row_len + 1).enumerate() {
        let (tag, current) = (chunk[0], &chunk[1..]);
        if row == 0 {
            decoded.extend_from_slice(current);
            continue;
        }
        match FilterType::try_from(tag)? {
            FilterType::Up => {
                let previous = decoded.len() - row_len;
                for (i, &byte) in current.iter().enumerate() {
                    let above = decoded[previous + i];
                    decoded.push(byte.wrapping_add(above));
                }
            }
            other => {
                return Err(DecompressError::Predictor(format!("unsupported PNG filter {:?}", other)));
            }
        }
    }
    Ok(decoded)
}
