use crate::filters::DecodedStream;
use crate::object_table::{IndirectObject, ObjectTable};
use crate::{Dictionary, Error, Object, ObjectId, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRGB,
    DeviceCMYK,
    /// `/DCTDecode` data; the color model is carried by the JPEG itself.
    Jpeg,
    /// Any other color space, by name. Array color spaces use their family name.
    Other(String),
}

/// An image XObject with its filter chain applied.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    /// Decoded samples, or the JPEG file for `ColorSpace::Jpeg`.
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Describe the image stream `object` whose data was decoded to `decoded`.
    pub fn new(table: &ObjectTable, object: &IndirectObject, decoded: DecodedStream) -> Result<ImageXObject> {
        let dict = object.dict()?;
        if !object.is_stream() || !dict.find_value(b"Subtype").as_name().is_ok_and(|name| name == b"Image") {
            return Err(Error::ObjectType {
                expected: "Image XObject",
                found: object.description(),
            });
        }

        let width = dimension(table, dict, b"Width", "Width")?;
        let height = dimension(table, dict, b"Height", "Height")?;
        let bits_per_component = match dict.get(b"BitsPerComponent") {
            Ok(value) => {
                let bits = table.dereference(value)?.as_i64()?;
                match bits {
                    1 | 2 | 4 | 8 | 16 => bits as u8,
                    _ => return Err(Error::NumericRange("BitsPerComponent")),
                }
            }
            Err(_) => 8,
        };

        let color_space = if decoded.is_jpeg {
            ColorSpace::Jpeg
        } else {
            color_space(table, dict)?
        };

        Ok(ImageXObject {
            id: object.id,
            width,
            height,
            bits_per_component,
            color_space,
            data: decoded.data,
        })
    }
}

fn dimension(table: &ObjectTable, dict: &Dictionary, key: &[u8], name: &'static str) -> Result<u32> {
    let value = table.get_in(dict, key)?.as_i64()?;
    u32::try_from(value)
        .ok()
        .filter(|&value| value > 0)
        .ok_or(Error::NumericRange(name))
}

fn color_space(table: &ObjectTable, dict: &Dictionary) -> Result<ColorSpace> {
    let value = match dict.get(b"ColorSpace") {
        Ok(value) => table.dereference(value)?,
        Err(_) => return Ok(ColorSpace::DeviceGray),
    };
    let family = match value {
        Object::Name(name) => name.as_slice(),
        Object::Array(array) if !array.is_empty() => table.dereference(&array[0])?.as_name()?,
        _ => {
            return Err(Error::ObjectType {
                expected: "Name or Array",
                found: value.enum_variant(),
            });
        }
    };
    Ok(match family {
        b"DeviceGray" => ColorSpace::DeviceGray,
        b"DeviceRGB" => ColorSpace::DeviceRGB,
        b"DeviceCMYK" => ColorSpace::DeviceCMYK,
        other => ColorSpace::Other(String::from_utf8_lossy(other).into_owned()),
    })
}
