use std::io::{self, Write};

use log::warn;

use crate::error::ParseError;
use crate::parser::{is_whitespace, Tokenizer};
use crate::writer::Writer;
use crate::{Dictionary, Object, StringFormat};

/// Operator that opens an inline image.
const INLINE_IMAGE: &str = "BI";

/// One content stream operator with the operands that preceded it.
///
/// An inline image is a single `BI` operation with two operands: the image
/// dictionary and the raw image bytes as a string.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Object>,
}

impl Operation {
    pub fn new(operator: &str, operands: Vec<Object>) -> Operation {
        Operation {
            operator: operator.to_string(),
            operands,
        }
    }

    pub fn is_inline_image(&self) -> bool {
        self.operator == INLINE_IMAGE
    }

    /// Dictionary and data of an inline image operation.
    pub fn inline_image(&self) -> Option<(&Dictionary, &[u8])> {
        if !self.is_inline_image() {
            return None;
        }
        match self.operands.as_slice() {
            [Object::Dictionary(dict), Object::String(data, _)] => Some((dict, data.as_slice())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub operations: Vec<Operation>,
}

impl Content {
    /// Split decoded content stream bytes into operations.
    pub fn decode(data: &[u8]) -> Result<Content, ParseError> {
        let mut tokenizer = Tokenizer::for_content(data);
        let mut operations = Vec::new();
        let mut operands = Vec::new();

        while let Some(token) = tokenizer.next_token()? {
            match token {
                Object::Operator(operator) if operator == INLINE_IMAGE => {
                    if !operands.is_empty() {
                        warn!("{} operands before inline image discarded", operands.len());
                        operands.clear();
                    }
                    operations.push(inline_image(&mut tokenizer)?);
                }
                Object::Operator(operator) => operations.push(Operation {
                    operator,
                    operands: std::mem::take(&mut operands),
                }),
                operand => operands.push(operand),
            }
        }

        if !operands.is_empty() {
            return Err(ParseError::Expected {
                expected: "operator",
                offset: data.len(),
            });
        }
        Ok(Content { operations })
    }

    /// Serialize operations back to content stream syntax, one per line.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        for operation in &self.operations {
            match operation.inline_image() {
                Some((dict, data)) => {
                    buffer.write_all(b"BI")?;
                    for (key, value) in dict {
                        buffer.write_all(b" ")?;
                        Writer::write_name(&mut buffer, key)?;
                        buffer.write_all(b" ")?;
                        Writer::write_object(&mut buffer, value)?;
                    }
                    buffer.write_all(b" ID\n")?;
                    buffer.write_all(data)?;
                    buffer.write_all(b"\nEI\n")?;
                }
                None => {
                    for operand in &operation.operands {
                        Writer::write_object(&mut buffer, operand)?;
                        buffer.write_all(b" ")?;
                    }
                    buffer.write_all(operation.operator.as_bytes())?;
                    buffer.write_all(b"\n")?;
                }
            }
        }
        Ok(buffer)
    }
}

/// Read the body of an inline image, the cursor sitting just after `BI`.
fn inline_image(tokenizer: &mut Tokenizer) -> Result<Operation, ParseError> {
    let mut dict = Dictionary::new();
    loop {
        let offset = tokenizer.offset();
        match tokenizer.next_token()? {
            Some(Object::Operator(operator)) if operator == "ID" => break,
            Some(Object::Name(key)) => {
                let value = tokenizer.next_value()?;
                dict.set(key, value);
            }
            Some(_) => {
                return Err(ParseError::Expected {
                    expected: "inline image key",
                    offset,
                });
            }
            None => return Err(ParseError::EndOfInput),
        }
    }

    // A single white-space byte separates ID from the data.
    let remaining = tokenizer.remaining();
    let skip = usize::from(remaining.first().is_some_and(|&c| is_whitespace(c)));
    let data_start = tokenizer.offset() + skip;
    let body = &remaining[skip..];

    let end = find_end_marker(body).ok_or(ParseError::EndOfInput)?;
    let mut data = &body[..end];
    // Drop the white-space byte that precedes EI.
    if let Some((&last, rest)) = data.split_last() {
        if is_whitespace(last) {
            data = rest;
        }
    }
    tokenizer.seek(data_start + end + 2);

    Ok(Operation::new(
        INLINE_IMAGE,
        vec![
            Object::Dictionary(dict),
            Object::String(data.to_vec(), StringFormat::Hexadecimal),
        ],
    ))
}

/// Offset of the first `EI` preceded by white-space and followed by white-space or the end.
fn find_end_marker(body: &[u8]) -> Option<usize> {
    (0..body.len().saturating_sub(1)).find(|&index| {
        body[index..].starts_with(b"EI")
            && index > 0
            && is_whitespace(body[index - 1])
            && body.get(index + 2).is_none_or(|&c| is_whitespace(c))
    })
}
