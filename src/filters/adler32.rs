//! Adler-32 checksum used by the zlib trailer.

const MODULUS: u32 = 65521;

/// Largest block for which the accumulators cannot overflow before reduction.
const BLOCK: usize = 5552;

pub fn checksum(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    for block in data.chunks(BLOCK) {
        for &byte in block {
            a += u32::from(byte);
            b += a;
        }
        a %= MODULUS;
        b %= MODULUS;
    }

    (b << 16) | a
}
