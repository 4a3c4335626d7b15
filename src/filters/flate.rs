use std::io::Read;

use flate2::read::DeflateDecoder;

use super::adler32;
use crate::error::DecompressError;

/// Inflate a zlib stream, checking its header and Adler-32 trailer.
pub fn decode(input: &[u8]) -> Result<Vec<u8>, DecompressError> {
    if input.len() < 2 {
        return Err(DecompressError::ZlibHeader);
    }
    let (cmf, flg) = (input[0], input[1]);
    let header_ok = (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0;
    // Deflate method, no preset dictionary.
    if !header_ok || cmf & 0x0F != 8 || flg & 0x20 != 0 {
        return Err(DecompressError::ZlibHeader);
    }

    let body = &input[2..];
    let mut output = Vec::with_capacity(body.len() * 2);
    let mut decoder = DeflateDecoder::new(body);
    decoder
        .read_to_end(&mut output)
        .map_err(|err| DecompressError::Inflate(err.to_string()))?;

    let consumed = usize::try_from(decoder.total_in()).unwrap_or(usize::MAX);
    let trailer = consumed
        .checked_add(4)
        .and_then(|end| body.get(consumed..end))
        .ok_or_else(|| DecompressError::Inflate("missing adler-32 trailer".to_string()))?;
    let stored = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = adler32::checksum(&output);
    if stored != computed {
        return Err(DecompressError::Adler32 { stored, computed });
    }

    Ok(output)
}
