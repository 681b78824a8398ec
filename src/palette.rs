use log::debug;

use crate::error::ConvertError;

/// Byte length of the palette footer: 16 colors stored as 2-byte words.
pub const PALETTE_TAIL_LEN: usize = 32;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub fn opaque(r: u8, g: u8, b: u8) -> Rgba8 {
        Rgba8 { r, g, b, a: 255 }
    }

    /// Decode one OCS palette word: 12 bits of color in the low bits of a
    /// big-endian 16-bit word, 4 bits per channel, R in the highest nibble.
    /// Each nibble scales to 8 bits by multiplying by 17 (0xF -> 255).
    pub fn from_word(word: u16) -> Rgba8 {
        Rgba8::opaque(
            (((word >> 8) & 0xF) * 17) as u8,
            (((word >> 4) & 0xF) * 17) as u8,
            ((word & 0xF) * 17) as u8,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Rgba8>,
}

impl Palette {
    /// Decode the 32-byte palette footer into its 16 colors.
    pub fn from_tail(tail: &[u8]) -> Palette {
        debug_assert_eq!(tail.len(), PALETTE_TAIL_LEN);

        let colors = tail
            .chunks_exact(2)
            .map(|pair| Rgba8::from_word(u16::from_be_bytes([pair[0], pair[1]])))
            .collect();

        Palette { colors }
    }

    /// Build a synthetic grayscale ramp spanning 0-255 linearly.
    pub fn grayscale(size: usize) -> Palette {
        let max = size.saturating_sub(1).max(1);
        let colors = (0..size)
            .map(|i| {
                let v = (i * 255 / max) as u8;
                Rgba8::opaque(v, v, v)
            })
            .collect();

        Palette { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn colors(&self) -> &[Rgba8] {
        &self.colors
    }
}

/// Split the post-header-skip bytes into planar data and a palette.
///
/// With `require_palette` the last [`PALETTE_TAIL_LEN`] bytes are decoded as
/// the color table and everything before them is planar data. Without it the
/// whole slice is planar data and the palette is a grayscale ramp sized for
/// the largest plane count under consideration.
pub fn resolve(
    data: &[u8],
    require_palette: bool,
    min_planes: usize,
    max_planes: usize,
) -> Result<(&[u8], Palette), ConvertError> {
    if require_palette {
        if data.len() < PALETTE_TAIL_LEN {
            return Err(ConvertError::PaletteTooSmall(PALETTE_TAIL_LEN));
        }

        let split = data.len() - PALETTE_TAIL_LEN;
        let palette = Palette::from_tail(&data[split..]);
        debug!("decoded {} palette colors from footer", palette.len());

        Ok((&data[..split], palette))
    } else {
        let planes = min_planes.max(max_planes).max(1);
        let palette = Palette::grayscale(1 << planes);
        debug!("synthesized {}-entry grayscale palette", palette.len());

        Ok((data, palette))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x0000, Rgba8::opaque(0, 0, 0))]
    #[case(0x0FFF, Rgba8::opaque(255, 255, 255))]
    #[case(0x0F00, Rgba8::opaque(255, 0, 0))]
    #[case(0x00F0, Rgba8::opaque(0, 255, 0))]
    #[case(0x000F, Rgba8::opaque(0, 0, 255))]
    // top nibble is discarded
    #[case(0xF123, Rgba8::opaque(17, 34, 51))]
    fn word_decode(#[case] word: u16, #[case] expected: Rgba8) {
        assert_eq!(Rgba8::from_word(word), expected);
    }

    #[test]
    fn nibble_scale_round_trips() {
        // scale-by-17 must be exactly invertible at 4-bit granularity
        for v in 0u16..16 {
            assert_eq!((v * 17) / 17, v);
            let color = Rgba8::from_word(v << 8);
            assert_eq!((color.r as u16) / 17, v);
        }
    }

    #[test]
    fn tail_decodes_16_colors() {
        let mut tail = [0u8; PALETTE_TAIL_LEN];
        // color 0 = 0x0123, color 15 = 0x0FFF
        tail[0] = 0x01;
        tail[1] = 0x23;
        tail[30] = 0x0F;
        tail[31] = 0xFF;

        let palette = Palette::from_tail(&tail);
        assert_eq!(palette.len(), 16);
        assert_eq!(palette.colors()[0], Rgba8::opaque(17, 34, 51));
        assert_eq!(palette.colors()[15], Rgba8::opaque(255, 255, 255));
        assert_eq!(palette.colors()[1], Rgba8::opaque(0, 0, 0));
    }

    #[test]
    fn grayscale_ramp_spans_full_range() {
        let palette = Palette::grayscale(16);
        assert_eq!(palette.len(), 16);
        assert_eq!(palette.colors()[0].r, 0);
        assert_eq!(palette.colors()[15].r, 255);

        // monotonic and achromatic
        let mut prev = 0u8;
        for color in palette.colors() {
            assert!(color.r >= prev);
            assert_eq!(color.r, color.g);
            assert_eq!(color.g, color.b);
            assert_eq!(color.a, 255);
            prev = color.r;
        }
    }

    #[rstest]
    #[case(true, 40, 8)]
    #[case(true, 32, 0)]
    fn resolve_splits_palette_tail(
        #[case] require_palette: bool,
        #[case] len: usize,
        #[case] expected_planar: usize,
    ) {
        let data = vec![0u8; len];
        let (planar, palette) = resolve(&data, require_palette, 3, 6).unwrap();
        assert_eq!(planar.len(), expected_planar);
        assert_eq!(palette.len(), 16);
    }

    #[test]
    fn resolve_rejects_short_tail() {
        let data = vec![0u8; PALETTE_TAIL_LEN - 1];
        assert!(matches!(
            resolve(&data, true, 3, 6),
            Err(ConvertError::PaletteTooSmall(_))
        ));
    }

    #[test]
    fn resolve_grayscale_sized_for_max_planes() {
        let data = vec![0u8; 100];
        let (planar, palette) = resolve(&data, false, 3, 4).unwrap();
        assert_eq!(planar.len(), 100);
        assert_eq!(palette.len(), 16);

        // min/max swapped still uses the larger bound
        let (_, palette) = resolve(&data, false, 5, 2).unwrap();
        assert_eq!(palette.len(), 32);
    }
}
