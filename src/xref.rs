use crate::error::XrefError;
use crate::{Dictionary, Object, Result};
use log::warn;

/// One cross reference record as read from a table or stream section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free entry, `f` in a table.
    Free { generation: u16 },
    /// Object stored at a byte offset in the file.
    Normal { offset: u64, generation: u16 },
    /// Object stored inside an object stream, generation is always 0.
    Compressed { container: u32, index: u32 },
}

impl XrefEntry {
    pub fn generation(&self) -> u16 {
        match *self {
            XrefEntry::Free { generation } | XrefEntry::Normal { generation, .. } => generation,
            XrefEntry::Compressed { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefRecord {
    pub number: u32,
    pub entry: XrefEntry,
}

/// Field widths from `/W`.
fn field_widths(dict: &Dictionary) -> Result<[usize; 3]> {
    let widths = dict.get(b"W").and_then(Object::as_array)?;
    if widths.len() != 3 {
        return Err(XrefError::Parse.into());
    }

    let mut result = [0usize; 3];
    for (slot, width) in result.iter_mut().zip(widths) {
        let width = width.as_i64()?;
        if !(0..=8).contains(&width) {
            return Err(XrefError::Parse.into());
        }
        *slot = width as usize;
    }
    Ok(result)
}

/// Object number ranges from `/Index`, or `[0 Size]` when absent.
fn subsections(dict: &Dictionary) -> Result<Vec<(u32, u32)>> {
    let Ok(index) = dict.get(b"Index") else {
        let size = dict.get(b"Size").and_then(Object::as_i64)?;
        let size = u32::try_from(size).map_err(|_| XrefError::Trailer)?;
        return Ok(vec![(0, size)]);
    };

    let index = index.as_array()?;
    if index.len() % 2 != 0 {
        return Err(XrefError::Parse.into());
    }
    index
        .chunks_exact(2)
        .map(|pair| -> Result<(u32, u32)> {
            let first = u32::try_from(pair[0].as_i64()?).map_err(|_| XrefError::Parse)?;
            let count = u32::try_from(pair[1].as_i64()?).map_err(|_| XrefError::Parse)?;
            Ok((first, count))
        })
        .collect()
}

fn read_field(data: &[u8], width: usize) -> u64 {
    data[..width].iter().fold(0u64, |value, &byte| (value << 8) | u64::from(byte))
}

/// Decode the records of a cross reference stream from its decoded data.
///
/// Type 0 records are skipped. A zero width type field means type 1.
pub fn decode_xref_stream(dict: &Dictionary, data: &[u8]) -> Result<Vec<XrefRecord>> {
    let widths = field_widths(dict)?;
    let record_len: usize = widths.iter().sum();
    if record_len == 0 {
        return Err(XrefError::Parse.into());
    }

    let mut records = Vec::new();
    let mut chunks = data.chunks_exact(record_len);
    'sections: for (first, count) in subsections(dict)? {
        for number in (first..).take(count as usize) {
            let Some(record) = chunks.next() else {
                warn!("cross reference stream data ends before object {}", number);
                break 'sections;
            };
            let (type_field, rest) = record.split_at(widths[0]);
            let (field2, field3) = rest.split_at(widths[1]);

            let kind = if widths[0] == 0 { 1 } else { read_field(type_field, widths[0]) };
            let field2 = read_field(field2, widths[1]);
            let field3 = read_field(field3, widths[2]);

            let entry = match kind {
                0 => continue,
                1 => {
                    let Ok(generation) = u16::try_from(field3) else {
                        warn!("generation {} of object {} is out of range", field3, number);
                        continue;
                    };
                    XrefEntry::Normal { offset: field2, generation }
                }
                2 => match (u32::try_from(field2), u32::try_from(field3)) {
                    (Ok(container), Ok(index)) => XrefEntry::Compressed { container, index },
                    _ => return Err(XrefError::Parse.into()),
                },
                other => return Err(XrefError::RecordType(other).into()),
            };
            records.push(XrefRecord { number, entry });
        }
    }
    Ok(records)
}
