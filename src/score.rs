/// Plausibility score for one geometry hypothesis; lower is better.
///
/// A correctly guessed stride keeps adjacent scanlines similar, so the score
/// is the mean absolute per-column difference between vertically adjacent
/// rows plus its population standard deviation. Pixel indices are rescaled
/// to 0-255 intensity before differencing so hypotheses with different plane
/// counts are comparable. This intensity approximation is for scoring only
/// and ignores the palette's chrominance.
///
/// Scoring is total: a hypothesis whose byte footprint does not match the
/// slice, or with fewer than two rows, returns `f64::MAX` instead of erroring.
pub fn stripe_score(planar: &[u8], width: usize, height: usize, planes: usize) -> f64 {
    let bytes_per_row = width / 8;
    let bytes_per_plane = bytes_per_row * height;

    if planar.len() != bytes_per_plane * planes || height < 2 {
        return f64::MAX;
    }

    let max_color = (1u32 << planes) - 1;
    let mut intensity = vec![0u8; width * height];

    for y in 0..height {
        let row_offset = y * bytes_per_row;
        let out_row = y * width;
        for x in 0..width {
            let byte_index = x >> 3;
            let bit = 7 - (x & 7);
            let mut color = 0u32;
            for p in 0..planes {
                let b = planar[p * bytes_per_plane + row_offset + byte_index];
                color |= (((b >> bit) & 1) as u32) << p;
            }

            intensity[out_row + x] = if max_color == 0 {
                0
            } else {
                (color * 255 / max_color) as u8
            };
        }
    }

    let mut row_diffs = Vec::with_capacity(height - 1);
    for y in 0..height - 1 {
        let mut sum = 0u64;
        let upper = &intensity[y * width..(y + 1) * width];
        let lower = &intensity[(y + 1) * width..(y + 2) * width];
        for (a, b) in upper.iter().zip(lower.iter()) {
            sum += (*a as i64 - *b as i64).unsigned_abs();
        }

        row_diffs.push(sum as f64 / width as f64);
    }

    let mean = row_diffs.iter().sum::<f64>() / row_diffs.len() as f64;
    let variance = row_diffs
        .iter()
        .map(|d| (d - mean) * (d - mean))
        .sum::<f64>()
        / row_diffs.len() as f64;

    mean + variance.sqrt()
}
