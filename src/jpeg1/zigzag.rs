//! Zigzag reordering between row-major 8x8 blocks and scan order.

use crate::error::{RequantError, Result};
use crate::jpeg1::dct::{BLOCK_DIM, BLOCK_SIZE};

/// Zigzag scan pattern for 8x8 blocks: `ZIGZAG_ORDER[scan_index]` is the
/// row-major index of that coefficient.
#[rustfmt::skip]
pub const ZIGZAG_ORDER: [usize; BLOCK_DIM] = [
    0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Flattens a row-major 8x8 matrix into zigzag scan order.
pub fn to_scan_order<T: Copy + Default>(matrix: &[[T; BLOCK_SIZE]]) -> Result<[T; BLOCK_DIM]> {
    if matrix.len() != BLOCK_SIZE {
        return Err(RequantError::ShapeError {
            expected: BLOCK_DIM,
            actual: matrix.len() * BLOCK_SIZE,
        });
    }
    let mut flat = [T::default(); BLOCK_DIM];
    for (scan_index, &natural) in ZIGZAG_ORDER.iter().enumerate() {
        flat[scan_index] = matrix[natural / BLOCK_SIZE][natural % BLOCK_SIZE];
    }
    Ok(flat)
}

/// Places 64 scan-ordered values back into a row-major 8x8 matrix.
pub fn to_matrix<T: Copy + Default>(scan: &[T]) -> Result<[[T; BLOCK_SIZE]; BLOCK_SIZE]> {
    if scan.len() != BLOCK_DIM {
        return Err(RequantError::ShapeError {
            expected: BLOCK_DIM,
            actual: scan.len(),
        });
    }
    let mut matrix = [[T::default(); BLOCK_SIZE]; BLOCK_SIZE];
    for (scan_index, &natural) in ZIGZAG_ORDER.iter().enumerate() {
        matrix[natural / BLOCK_SIZE][natural % BLOCK_SIZE] = scan[scan_index];
    }
    Ok(matrix)
}
