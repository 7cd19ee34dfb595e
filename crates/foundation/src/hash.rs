/// 32-bit FNV-1a offset basis.
pub const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
/// 32-bit FNV-1a prime.
pub const FNV_PRIME: u32 = 0x0100_0193;

/// Stable 32-bit XOR/multiply hash of a string's UTF-8 bytes.
///
/// Used to derive PRNG seeds from names; the value must never change between
/// releases or rendered decorations would shift.
pub fn string_seed(s: &str) -> u32 {
    s.bytes().fold(FNV_OFFSET_BASIS, |h, b| {
        (h ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}
