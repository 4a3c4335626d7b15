//! Stream filter pipeline.

pub mod adler32;
pub mod ascii85;
pub mod flate;
pub mod lzw;
pub mod predictor;

use log::warn;

use crate::error::DecompressError;
use crate::object_table::ObjectTable;
use crate::{Dictionary, Object, Result};

/// One `/Filter` entry with its `/DecodeParms`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    pub name: Vec<u8>,
    pub params: Option<Dictionary>,
}

impl FilterStage {
    pub fn new(name: &[u8]) -> Self {
        FilterStage { name: name.to_vec(), params: None }
    }

    pub fn with_params(name: &[u8], params: Dictionary) -> Self {
        FilterStage {
            name: name.to_vec(),
            params: Some(params),
        }
    }
}

/// Output of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStream {
    pub data: Vec<u8>,
    /// The chain ended at `/DCTDecode`, `data` holds JPEG bytes.
    pub is_jpeg: bool,
}

/// Read `/Filter` and `/DecodeParms` of a stream dictionary, following references.
pub fn filter_chain(table: &ObjectTable, dict: &Dictionary) -> Result<Vec<FilterStage>> {
    let names: Vec<&[u8]> = match dict.get(b"Filter") {
        Err(_) => return Ok(vec![]),
        Ok(filter) => match table.dereference(filter)? {
            Object::Name(name) => vec![name.as_slice()],
            Object::Array(items) => items
                .iter()
                .map(|item| table.dereference(item).and_then(Object::as_name))
                .collect::<Result<_>>()?,
            Object::Null => vec![],
            other => return Err(crate::Error::ObjectType {
                expected: "Name or Array",
                found: other.enum_variant(),
            }),
        },
    };

    let params: Vec<Option<&Dictionary>> = match dict.get(b"DecodeParms").and_then(|p| table.dereference(p)) {
        Ok(Object::Dictionary(params)) => vec![Some(params)],
        Ok(Object::Array(items)) => items
            .iter()
            .map(|item| table.dereference(item).ok().and_then(|p| p.as_dict().ok()))
            .collect(),
        _ => vec![],
    };

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(i, name)| FilterStage {
            name: name.to_vec(),
            params: params.get(i).copied().flatten().cloned(),
        })
        .collect())
}

/// Run `data` through each stage in order.
pub fn decode(stages: &[FilterStage], data: &[u8]) -> Result<DecodedStream> {
    let mut data = data.to_vec();
    for (position, stage) in stages.iter().enumerate() {
        let params = stage.params.as_ref();
        data = match stage.name.as_slice() {
            b"FlateDecode" | b"Fl" => predictor::decode(flate::decode(&data)?, params)?,
            b"LZWDecode" | b"LZW" => {
                let early_change = params
                    .and_then(|p| p.get(b"EarlyChange").and_then(Object::as_i64).ok())
                    .unwrap_or(1);
                predictor::decode(lzw::decode(&data, early_change != 0)?, params)?
            }
            b"ASCII85Decode" | b"A85" => ascii85::decode(&data)?,
            b"DCTDecode" | b"DCT" => {
                if position + 1 < stages.len() {
                    warn!("filters after /DCTDecode are ignored");
                }
                return Ok(DecodedStream { data, is_jpeg: true });
            }
            other => {
                return Err(DecompressError::UnknownFilter(String::from_utf8_lossy(other).into_owned()).into());
            }
        };
    }
    Ok(DecodedStream { data, is_jpeg: false })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_table::{IndirectObject, ObjectLocation};
    use crate::{dictionary, Error};
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn chains_filters_in_order() {
        // ASCII85 of a zlib stream.
        let compressed = compress(b"0 0 m 100 100 l S");
        let mut text = Vec::new();
        for chunk in compressed.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            let mut value = u32::from_be_bytes(word);
            let mut digits = [0u8; 5];
            for digit in digits.iter_mut().rev() {
                *digit = (value % 85) as u8 + b'!';
                value /= 85;
            }
            text.extend_from_slice(&digits[..chunk.len() + 1]);
        }
        text.extend_from_slice(b"~>");

        let stages = [FilterStage::new(b"ASCII85Decode"), FilterStage::new(b"FlateDecode")];
        let decoded = decode(&stages, &text).unwrap();
        assert_eq!(decoded.data, b"0 0 m 100 100 l S");
        assert!(!decoded.is_jpeg);
    }

    #[test]
    fn flate_with_up_predictor() {
        let rows = [2u8, 1, 2, 2, 1, 1];
        let stages = [FilterStage::with_params(
            b"FlateDecode",
            dictionary! { "Predictor" => 12, "Columns" => 2 },
        )];
        assert_eq!(decode(&stages, &compress(&rows)).unwrap().data, vec![1, 2, 2, 3]);
    }

    #[test]
    fn dct_is_terminal() {
        let stages = [FilterStage::new(b"DCTDecode"), FilterStage::new(b"FlateDecode")];
        let decoded = decode(&stages, b"\xFF\xD8jpeg").unwrap();
        assert!(decoded.is_jpeg);
        assert_eq!(decoded.data, b"\xFF\xD8jpeg");
    }

    #[test]
    fn unknown_filter_fails() {
        let stages = [FilterStage::new(b"JBIG2Decode")];
        assert!(matches!(
            decode(&stages, b"data"),
            Err(Error::Decompress(DecompressError::UnknownFilter(name))) if name == "JBIG2Decode"
        ));
        assert_eq!(decode(&[], b"raw").unwrap().data, b"raw");
    }

    #[test]
    fn reads_filter_chain_from_dictionary() {
        let mut table = ObjectTable::new();
        let mut params = IndirectObject::new((9, 0), ObjectLocation::Offset(0));
        params.set_value(Object::Dictionary(dictionary! { "EarlyChange" => 0 }));
        table.insert(params);

        let dict = dictionary! {
            "Filter" => Object::Array(vec!["ASCII85Decode".into(), "LZWDecode".into()]),
            "DecodeParms" => Object::Array(vec![Object::Null, Object::Reference((9, 0))]),
        };
        let stages = filter_chain(&table, &dict).unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0], FilterStage::new(b"ASCII85Decode"));
        assert_eq!(stages[1], FilterStage::with_params(b"LZWDecode", dictionary! { "EarlyChange" => 0 }));

        let single = dictionary! { "Filter" => "FlateDecode", "DecodeParms" => dictionary! { "Columns" => 3 } };
        let stages = filter_chain(&table, &single).unwrap();
        assert_eq!(stages[0].params, Some(dictionary! { "Columns" => 3 }));

        assert!(filter_chain(&table, &Dictionary::new()).unwrap().is_empty());
    }
}
