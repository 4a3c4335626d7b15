use std::io::{Result, Write};

use super::Object::*;
use super::{Dictionary, Object, StringFormat};

/// Reals closer to zero than this are written as `0`.
const REAL_EPSILON: f64 = 1e-4;

impl Object {
    /// PDF syntax for this value.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = Writer::write_object(&mut buffer, self);
        buffer
    }
}

impl Dictionary {
    /// PDF syntax for this dictionary.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        let _ = Writer::write_dictionary(&mut buffer, self);
        buffer
    }
}

pub struct Writer;

impl Writer {
    /// True when a value must be separated from a preceding token by a space.
    pub fn need_separator(object: &Object) -> bool {
        matches!(
            *object,
            Null | Boolean(_) | Integer(_) | Real(_) | Reference(_) | Keyword(_) | Operator(_)
        )
    }

    pub fn write_object(file: &mut dyn Write, object: &Object) -> Result<()> {
        match *object {
            Null => file.write_all(b"null"),
            Boolean(value) => file.write_all(if value { b"true" } else { b"false" }),
            Integer(value) => {
                let mut buffer = itoa::Buffer::new();
                file.write_all(buffer.format(value).as_bytes())
            }
            Real(value) => Writer::write_real(file, value),
            Name(ref name) => Writer::write_name(file, name),
            String(ref text, ref format) => Writer::write_string(file, text, format),
            Array(ref array) => Writer::write_array(file, array),
            Object::Dictionary(ref dict) => Writer::write_dictionary(file, dict),
            Reference(ref id) => write!(file, "{} {} R", id.0, id.1),
            Keyword(ref keyword) => file.write_all(keyword.as_bytes()),
            Operator(ref operator) => file.write_all(operator.as_bytes()),
        }
    }

    fn write_real(file: &mut dyn Write, value: f64) -> Result<()> {
        if value.abs() < REAL_EPSILON {
            return file.write_all(b"0");
        }
        // Shortest single precision form, never in exponent notation.
        write!(file, "{}", value as f32)
    }

    pub fn write_name(file: &mut dyn Write, name: &[u8]) -> Result<()> {
        file.write_all(b"/")?;
        for &byte in name {
            // white-space and delimiter chars are encoded to # sequences
            // also encode bytes outside of the range 33 (!) to 126 (~)
            if b" \t\n\r\x0C()<>[]{}/%#".contains(&byte) || !(33..=126).contains(&byte) {
                write!(file, "#{:02X}", byte)?;
            } else {
                file.write_all(&[byte])?;
            }
        }
        Ok(())
    }

    pub fn write_string(file: &mut dyn Write, text: &[u8], format: &StringFormat) -> Result<()> {
        match *format {
            // Backslashes, unbalanced parentheses and bare carriage returns are escaped.
            StringFormat::Literal => {
                let mut escape_indice = Vec::new();
                let mut parentheses = Vec::new();
                for (index, &byte) in text.iter().enumerate() {
                    match byte {
                        b'(' => parentheses.push(index),
                        b')' => {
                            if parentheses.pop().is_none() {
                                escape_indice.push(index);
                            }
                        }
                        b'\\' | b'\r' => escape_indice.push(index),
                        _ => continue,
                    }
                }
                escape_indice.append(&mut parentheses);

                file.write_all(b"(")?;
                for (index, &byte) in text.iter().enumerate() {
                    if escape_indice.contains(&index) {
                        file.write_all(b"\\")?;
                        file.write_all(&[if byte == b'\r' { b'r' } else { byte }])?;
                    } else {
                        file.write_all(&[byte])?;
                    }
                }
                file.write_all(b")")?;
            }
            StringFormat::Hexadecimal => {
                file.write_all(b"<")?;
                for &byte in text {
                    write!(file, "{:02X}", byte)?;
                }
                file.write_all(b">")?;
            }
        }
        Ok(())
    }

    pub fn write_array(file: &mut dyn Write, array: &[Object]) -> Result<()> {
        file.write_all(b"[")?;
        let mut first = true;
        for object in array {
            if first {
                first = false;
            } else if Writer::need_separator(object) {
                file.write_all(b" ")?;
            }
            Writer::write_object(file, object)?;
        }
        file.write_all(b"]")?;
        Ok(())
    }

    pub fn write_dictionary(file: &mut dyn Write, dictionary: &Dictionary) -> Result<()> {
        file.write_all(b"<<")?;
        for (key, value) in dictionary {
            Writer::write_name(file, key)?;
            if Writer::need_separator(value) {
                file.write_all(b" ")?;
            }
            Writer::write_object(file, value)?;
        }
        file.write_all(b">>")?;
        Ok(())
    }
}
