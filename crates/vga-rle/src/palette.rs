//! 64-colour palette.
//!
//! A colour index carries two bits per channel: `RRGGBB`, red in bits 5-4.
//! Each 2-bit level drives a resistor DAC, so the four levels are evenly
//! spaced: 0x00, 0x55, 0xAA, 0xFF.

/// ARGB32 palette, indexed by colour value.
pub const PALETTE: [u32; 64] = build_palette();

const fn build_palette() -> [u32; 64] {
    let mut palette = [0u32; 64];
    let mut i = 0;
    while i < 64 {
        let [r, g, b] = rgb(i as u8);
        palette[i] = 0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32;
        i += 1;
    }
    palette
}

/// 8-bit RGB for a colour index. Bits above the sixth are ignored.
#[must_use]
pub const fn rgb(index: u8) -> [u8; 3] {
    [
        ((index >> 4) & 3) * 0x55,
        ((index >> 2) & 3) * 0x55,
        (index & 3) * 0x55,
    ]
}

/// Nearest colour index for an 8-bit RGB triple.
#[must_use]
pub const fn quantize(r: u8, g: u8, b: u8) -> u8 {
    const fn level(c: u8) -> u8 {
        // Round to the nearest multiple of 0x55.
        ((c as u16 + 0x2A) / 0x55) as u8
    }
    level(r) << 4 | level(g) << 2 | level(b)
}
