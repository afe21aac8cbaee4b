//! Discrete Cosine Transform (DCT) for 8x8 blocks.
//!
//! Only the spatial requantization path uses this; the default pipeline works
//! on coefficients directly.

use std::f32::consts::{FRAC_1_SQRT_2, PI};
use std::sync::OnceLock;

pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

/// `COS[u][x] = cos((2x + 1) * u * pi / 16)`, built on first use.
fn cosine_table() -> &'static [[f32; BLOCK_SIZE]; BLOCK_SIZE] {
    static COS: OnceLock<[[f32; BLOCK_SIZE]; BLOCK_SIZE]> = OnceLock::new();
    COS.get_or_init(|| {
        let mut table = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
        for (u, row) in table.iter_mut().enumerate() {
            for (x, value) in row.iter_mut().enumerate() {
                *value = (((2 * x + 1) * u) as f32 * PI / 16.0).cos();
            }
        }
        table
    })
}

fn scale_factor(u: usize) -> f32 {
    if u == 0 { FRAC_1_SQRT_2 } else { 1.0 }
}

/// Forward DCT of a level-shifted row-major block.
pub fn fdct_8x8(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    let cos = cosine_table();
    for u in 0..BLOCK_SIZE {
        for v in 0..BLOCK_SIZE {
            let mut sum = 0.0f32;
            for x in 0..BLOCK_SIZE {
                for y in 0..BLOCK_SIZE {
                    sum += input[x * BLOCK_SIZE + y] * cos[u][x] * cos[v][y];
                }
            }
            output[u * BLOCK_SIZE + v] = 0.25 * scale_factor(u) * scale_factor(v) * sum;
        }
    }
}

/// Inverse DCT; the output is still level-shifted.
pub fn idct_8x8(input: &[f32; BLOCK_DIM], output: &mut [f32; BLOCK_DIM]) {
    let cos = cosine_table();
    for x in 0..BLOCK_SIZE {
        for y in 0..BLOCK_SIZE {
            let mut sum = 0.0f32;
            for u in 0..BLOCK_SIZE {
                for v in 0..BLOCK_SIZE {
                    sum += scale_factor(u)
                        * scale_factor(v)
                        * input[u * BLOCK_SIZE + v]
                        * cos[u][x]
                        * cos[v][y];
                }
            }
            output[x * BLOCK_SIZE + y] = 0.25 * sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fdct_idct_dc_only() {
        let input = [-128.0f32; 64];
        let mut dct_coeffs = [0.0f32; 64];
        fdct_8x8(&input, &mut dct_coeffs);
        assert!((dct_coeffs[0] + 1024.0).abs() < 0.01);
        assert!(dct_coeffs[1..].iter().all(|c| c.abs() < 0.01));

        let mut output = [0.0f32; 64];
        idct_8x8(&dct_coeffs, &mut output);
        for i in 0..64 {
            assert!(
                (input[i] - output[i]).abs() < 0.1,
                "Mismatch at {}: {} vs {}",
                i,
                input[i],
                output[i]
            );
        }
    }

    #[test]
    fn test_fdct_idct_roundtrip() {
        arbtest::arbtest(|u| {
            let mut input = [0.0f32; 64];
            for sample in input.iter_mut() {
                *sample = u.int_in_range(0..=255u8)? as f32 - 128.0;
            }
            let mut coeffs = [0.0f32; 64];
            let mut output = [0.0f32; 64];
            fdct_8x8(&input, &mut coeffs);
            idct_8x8(&coeffs, &mut output);
            for (a, b) in input.iter().zip(output.iter()) {
                assert!((a - b).abs() < 0.05, "{} vs {}", a, b);
            }
            Ok(())
        });
    }
}
