use crate::error::DecompressError;
use crate::parser::is_whitespace;

fn group_value(group: &[u8; 5]) -> Result<u32, DecompressError> {
    let value = group
        .iter()
        .fold(0u64, |value, &digit| value * 85 + u64::from(digit - b'!'));
    u32::try_from(value).map_err(|_| DecompressError::Ascii85("group value out of range"))
}

/// Decode ASCII base-85 data up to the `~` of the `~>` marker.
pub fn decode(input: &[u8]) -> Result<Vec<u8>, DecompressError> {
    let mut output = Vec::with_capacity(input.len() * 4 / 5 + 4);
    let mut group = [0u8; 5];
    let mut count = 0;

    for &byte in input {
        match byte {
            b'~' => break,
            _ if is_whitespace(byte) => continue,
            b'z' if count == 0 => output.extend_from_slice(&[0; 4]),
            b'z' => return Err(DecompressError::Ascii85("'z' inside a group")),
            b'!'..=b'u' => {
                group[count] = byte;
                count += 1;
                if count == 5 {
                    output.extend_from_slice(&group_value(&group)?.to_be_bytes());
                    count = 0;
                }
            }
            _ => return Err(DecompressError::Ascii85("invalid character")),
        }
    }

    match count {
        0 => {}
        1 => return Err(DecompressError::Ascii85("final group has a single character")),
        _ => {
            group[count..].fill(b'u');
            let bytes = group_value(&group)?.to_be_bytes();
            output.extend_from_slice(&bytes[..count - 1]);
        }
    }

    Ok(output)
}
