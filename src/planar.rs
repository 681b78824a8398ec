use crate::error::ConvertError;

/// Dense grid of palette indices in a flat row-major buffer.
#[derive(Debug, Eq, PartialEq)]
pub struct IndexGrid {
    pub width: usize,
    pub height: usize,
    pixels: Vec<u8>,
}

impl IndexGrid {
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }
}

/// Convert plane-sequential bitplane data to a grid of palette indices.
///
/// The data holds `planes` contiguous blocks, each `height` rows of
/// `width / 8` bytes. Within a byte the leftmost pixel is the highest bit,
/// and plane `p` contributes bit `p` of the index (plane 0 is the LSB).
///
/// # Arguments
/// * `planar` - plane-sequential bitmap bytes
/// * `width` - pixel width, a multiple of 8
/// * `height` - pixel height
/// * `planes` - bitplane count
pub fn decode(
    planar: &[u8],
    width: usize,
    height: usize,
    planes: usize,
) -> Result<IndexGrid, ConvertError> {
    let bytes_per_row = width / 8;
    let bytes_per_plane = bytes_per_row * height;

    if planar.len() != bytes_per_plane * planes {
        return Err(ConvertError::GeometryMismatch {
            width,
            height,
            planes,
            expected: bytes_per_plane * planes,
            actual: planar.len(),
        });
    }

    let mut pixels = vec![0u8; width * height];

    for y in 0..height {
        let row_offset = y * bytes_per_row;
        let out_row = y * width;
        for x in 0..width {
            let byte_index = x >> 3;
            let bit = 7 - (x & 7);
            let mut color = 0u8;
            for p in 0..planes {
                let b = planar[p * bytes_per_plane + row_offset + byte_index];
                color |= ((b >> bit) & 1) << p;
            }

            pixels[out_row + x] = color;
        }
    }

    Ok(IndexGrid {
        width,
        height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn single_plane_msb_first() {
        // one 8x1 row, bit pattern 0b10000001
        let grid = decode(&[0b1000_0001], 8, 1, 1).unwrap();
        assert_eq!(grid.pixels(), &[1, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn planes_assemble_lsb_from_plane_zero() {
        // 8x1, 2 planes: plane 0 sets pixel 0, plane 1 sets pixels 0 and 1
        let grid = decode(&[0b1000_0000, 0b1100_0000], 8, 1, 2).unwrap();
        assert_eq!(grid.pixels(), &[3, 2, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn plane_blocks_are_row_major() {
        // 8x2, 2 planes: plane 0 rows then plane 1 rows
        let planar = [
            0b1111_0000, // plane 0 row 0
            0b0000_1111, // plane 0 row 1
            0b1010_1010, // plane 1 row 0
            0b0101_0101, // plane 1 row 1
        ];
        let grid = decode(&planar, 8, 2, 2).unwrap();
        assert_eq!(grid.get(0, 0), 3);
        assert_eq!(grid.get(1, 0), 1);
        assert_eq!(grid.get(4, 0), 2);
        assert_eq!(grid.get(0, 1), 0);
        assert_eq!(grid.get(4, 1), 1);
        assert_eq!(grid.get(5, 1), 3);
    }

    #[test]
    fn decode_is_deterministic() {
        let planar: Vec<u8> = (0..32u8).map(|i| i.wrapping_mul(37)).collect();
        let first = decode(&planar, 16, 8, 2).unwrap();
        let second = decode(&planar, 16, 8, 2).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    #[case(16, 8, 2, 31)]
    #[case(16, 8, 2, 33)]
    #[case(320, 160, 3, 19201)]
    fn length_mismatch_is_rejected(
        #[case] width: usize,
        #[case] height: usize,
        #[case] planes: usize,
        #[case] len: usize,
    ) {
        let planar = vec![0u8; len];
        assert!(matches!(
            decode(&planar, width, height, planes),
            Err(ConvertError::GeometryMismatch { .. })
        ));
    }
}
