use std::io::BufWriter;

use anyhow::Result;
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};

use crate::palette::Palette;
use crate::planar::IndexGrid;

// bits are packed so that the first value is in the highest bits and the
// last value is in the lowest bits

#[inline]
fn pack_1bit(v1: u8, v2: u8, v3: u8, v4: u8, v5: u8, v6: u8, v7: u8, v8: u8) -> u8 {
    v1 << 7u8 | v2 << 6u8 | v3 << 5u8 | v4 << 4u8 | v5 << 3u8 | v6 << 2u8 | v7 << 1u8 | v8
}

#[inline]
fn pack_2bit(v1: u8, v2: u8, v3: u8, v4: u8) -> u8 {
    v1 << 6u8 | v2 << 4u8 | v3 << 2u8 | v4
}

#[inline]
fn pack_4bit(v1: u8, v2: u8) -> u8 {
    v1 << 4u8 | v2
}

/// Encodes an index grid as an indexed-color PNG using the resolved palette.
#[derive(Debug)]
pub struct IndexedEncoder {
    width: u32,
    height: u32,
    /// Palette flattened to RGB triples as the PLTE chunk wants it.
    colors: Vec<u8>,
}

impl IndexedEncoder {
    pub fn new(width: u32, height: u32, palette: &Palette) -> IndexedEncoder {
        let mut colors = Vec::with_capacity(palette.len() * 3);
        for color in palette.colors() {
            colors.push(color.r);
            colors.push(color.g);
            colors.push(color.b);
        }

        IndexedEncoder {
            width,
            height,
            colors,
        }
    }

    fn depth(&self) -> BitDepth {
        match self.colors.len() / 3 {
            l if l <= 2 => BitDepth::One,
            l if l <= 4 => BitDepth::Two,
            l if l <= 16 => BitDepth::Four,
            _ => BitDepth::Eight,
        }
    }

    // sub-byte packing never crosses a scanline because image widths are
    // multiples of 8
    fn pack(&self, buffer: &[u8], depth: BitDepth) -> Vec<u8> {
        match depth {
            BitDepth::One => {
                let mut pixels = Vec::with_capacity(buffer.len() / 8);
                for v in buffer.chunks_exact(8) {
                    pixels.push(pack_1bit(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7]));
                }
                pixels
            }
            BitDepth::Two => {
                let mut pixels = Vec::with_capacity(buffer.len() / 4);
                for v in buffer.chunks_exact(4) {
                    pixels.push(pack_2bit(v[0], v[1], v[2], v[3]));
                }
                pixels
            }
            BitDepth::Four => {
                let mut pixels = Vec::with_capacity(buffer.len() / 2);
                for v in buffer.chunks_exact(2) {
                    pixels.push(pack_4bit(v[0], v[1]));
                }
                pixels
            }
            _ => buffer.to_vec(),
        }
    }

    pub fn encode(&self, grid: &IndexGrid) -> Result<Vec<u8>> {
        let mut png_buffer: Vec<u8> = Vec::new();

        let mut encoder = Encoder::new(BufWriter::new(&mut png_buffer), self.width, self.height);

        encoder.set_color(ColorType::Indexed);
        encoder.set_compression(Compression::Best);
        // turn off filter, not useful for paletted PNGs
        encoder.set_filter(FilterType::NoFilter);

        let depth = self.depth();
        encoder.set_depth(depth);
        encoder.set_palette(self.colors.clone());

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pack(grid.pixels(), depth))?;
        writer.finish()?;

        Ok(png_buffer)
    }
}
