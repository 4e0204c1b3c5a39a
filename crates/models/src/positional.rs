/// Sinusoidal position table of shape `[steps, width]`, row-major.
///
/// Even dimension `2i` holds `sin(pos * f_i)` and odd dimension `2i + 1` holds
/// `cos(pos * f_i)` with `f_i = exp(-2i * ln(10000) / width)`. For odd widths the
/// trailing sine slot has no cosine partner, so cosines only use the first
/// `width / 2` frequencies.
pub fn positional_encoding(steps: usize, width: usize) -> Vec<f32> {
    let freqs: Vec<f64> = (0..width)
        .step_by(2)
        .map(|i| (-(i as f64) * 10000f64.ln() / width as f64).exp())
        .collect();
    let mut table = vec![0f32; steps * width];
    for pos in 0..steps {
        let row = &mut table[pos * width..(pos + 1) * width];
        for (k, freq) in freqs.iter().enumerate() {
            let angle = pos as f64 * freq;
            row[2 * k] = angle.sin() as f32;
            if 2 * k + 1 < width {
                row[2 * k + 1] = angle.cos() as f32;
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_deterministic() {
        assert_eq!(positional_encoding(30, 11), positional_encoding(30, 11));
    }

    #[test]
    fn first_row_alternates_zero_one() {
        let table = positional_encoding(3, 4);
        assert_eq!(&table[0..4], &[0.0, 1.0, 0.0, 1.0]);
        assert!((table[4] - 1f32.sin()).abs() < 1e-6);
        assert!((table[5] - 1f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn odd_width_keeps_trailing_sine() {
        let width = 11;
        let table = positional_encoding(2, width);
        let f5 = (-(10.0f64) * 10000f64.ln() / width as f64).exp();
        assert!((table[width + 10] as f64 - f5.sin()).abs() < 1e-6);
        let f4 = (-(8.0f64) * 10000f64.ln() / width as f64).exp();
        assert!((table[width + 9] as f64 - f4.cos()).abs() < 1e-6);
    }
}
