use weezl::BitOrder;
use weezl::decode::Decoder;

use crate::error::DecompressError;

/// Decode MSB-first LZW data with 8-bit literals.
///
/// With `early_change` the code width grows one code early, which is the
/// default for PDF streams.
pub fn decode(input: &[u8], early_change: bool) -> Result<Vec<u8>, DecompressError> {
    let mut decoder = if early_change {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Decoder::new(BitOrder::Msb, 8)
    };

    let mut output = Vec::with_capacity(input.len() * 2);
    decoder
        .into_vec(&mut output)
        .decode(input)
        .status
        .map_err(|err| DecompressError::Lzw(err.to_string()))?;
    Ok(output)
}
