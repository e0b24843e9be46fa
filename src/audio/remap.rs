use serde::Serialize;

use crate::error::{Result, SpectrogramError};

/// Heatmap data of one channel: `stride` rows (bins, lowest first) by
/// `tick_count` columns (time).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpectrogramMatrix {
    rows: Vec<Vec<u8>>,
    tick_count: usize,
}

impl SpectrogramMatrix {
    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.tick_count
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.rows.get(row)?.get(col).copied()
    }

    /// The first `count` rows, for renderers that only show the low end of
    /// the frequency axis.
    pub fn rows_below(&self, count: usize) -> &[Vec<u8>] {
        &self.rows[..count.min(self.rows.len())]
    }

    pub fn into_rows(self) -> Vec<Vec<u8>> {
        self.rows
    }
}

/// Transpose a block-major buffer into a bin-major matrix:
/// `matrix[row][col] == buffer[col * stride + row]`.
pub fn remap(buffer: &[u8], stride: usize, tick_count: usize) -> Result<SpectrogramMatrix> {
    let expected = stride
        .checked_mul(tick_count)
        .ok_or_else(|| SpectrogramError::Processing("stride * tick_count overflows".into()))?;
    if buffer.len() != expected {
        return Err(SpectrogramError::Processing(format!(
            "buffer holds {} bytes, expected {} ({} bins x {} ticks)",
            buffer.len(),
            expected,
            stride,
            tick_count
        )));
    }

    let mut rows = vec![vec![0u8; tick_count]; stride];
    for (col, block) in buffer.chunks_exact(stride.max(1)).enumerate() {
        for (row, &value) in block.iter().enumerate() {
            rows[row][col] = value;
        }
    }

    Ok(SpectrogramMatrix { rows, tick_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposes_two_bins_three_ticks() {
        let m = remap(&[1, 2, 3, 4, 5, 6], 2, 3).unwrap();
        assert_eq!(m.rows(), &[vec![1, 3, 5], vec![2, 4, 6]]);
    }

    #[test]
    fn transposes_three_bins_two_ticks() {
        let m = remap(&[1, 2, 3, 4, 5, 6], 3, 2).unwrap();
        assert_eq!(m.rows(), &[vec![1, 4], vec![2, 5], vec![3, 6]]);
        assert_eq!(m.row_count(), 3);
        assert_eq!(m.column_count(), 2);
    }

    #[test]
    fn transpose_law_holds() {
        let stride = 7;
        let tick_count = 11;
        let buffer: Vec<u8> = (0..stride * tick_count).map(|i| (i * 37 % 256) as u8).collect();
        let m = remap(&buffer, stride, tick_count).unwrap();
        for row in 0..stride {
            for col in 0..tick_count {
                assert_eq!(m.get(row, col), Some(buffer[col * stride + row]));
            }
        }
        assert_eq!(m.get(stride, 0), None);
        assert_eq!(m.get(0, tick_count), None);
    }

    #[test]
    fn rejects_size_mismatch() {
        assert!(matches!(remap(&[1, 2, 3], 2, 2), Err(SpectrogramError::Processing(_))));
        assert!(matches!(remap(&[1, 2, 3, 4, 5], 2, 2), Err(SpectrogramError::Processing(_))));
        assert!(remap(&[], usize::MAX, 2).is_err());
    }

    #[test]
    fn empty_inputs() {
        let m = remap(&[], 4, 0).unwrap();
        assert_eq!(m.rows(), vec![Vec::<u8>::new(); 4].as_slice());
        let m = remap(&[], 0, 5).unwrap();
        assert!(m.rows().is_empty());
    }

    #[test]
    fn repeated_calls_are_identical() {
        let buffer: Vec<u8> = (0..=255).collect();
        assert_eq!(remap(&buffer, 16, 16).unwrap(), remap(&buffer, 16, 16).unwrap());
    }

    #[test]
    fn rows_below_clamps() {
        let m = remap(&[1, 2, 3, 4, 5, 6], 3, 2).unwrap();
        assert_eq!(m.rows_below(2), &[vec![1, 4], vec![2, 5]]);
        assert_eq!(m.rows_below(10).len(), 3);
    }
}
