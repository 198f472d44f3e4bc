//! Item sizing along one axis.
//!
//! Fixed-size axes answer every query with arithmetic. Variable-size axes
//! pre-compute cumulative positions once (`positions[i]` = offset of item
//! i's leading edge, plus a final edge) and answer offset lookups with a
//! binary search, as the sheet layout did for rows and columns.

/// Sizes of the items on one axis
#[derive(Debug, Clone, PartialEq)]
pub enum AxisSizing {
    Fixed { size: f32, len: usize },
    Variable { positions: Vec<f32> },
}

impl Default for AxisSizing {
    fn default() -> Self {
        Self::Fixed { size: 0.0, len: 0 }
    }
}

/// Floor of a non-negative float as an index
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_index(value: f32) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value.floor() as usize
    }
}

impl AxisSizing {
    pub fn fixed(size: f32, len: usize) -> Self {
        Self::Fixed {
            size: size.max(0.0),
            len,
        }
    }

    /// Build cumulative positions from per-item sizes
    pub fn variable(sizes: impl IntoIterator<Item = f32>) -> Self {
        let sizes = sizes.into_iter();
        let mut positions = Vec::with_capacity(sizes.size_hint().0 + 1);
        let mut offset: f32 = 0.0;
        for size in sizes {
            positions.push(offset);
            offset += size.max(0.0);
        }
        positions.push(offset); // Final edge
        Self::Variable { positions }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fixed { len, .. } => *len,
            Self::Variable { positions } => positions.len().saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extent of the whole axis
    pub fn total(&self) -> f32 {
        match self {
            Self::Fixed { size, len } => *size * *len as f32,
            Self::Variable { positions } => positions.last().copied().unwrap_or(0.0),
        }
    }

    /// Leading edge of item `index`; `index == len` gives the final edge.
    /// Out-of-range indices clamp to the final edge.
    pub fn position(&self, index: usize) -> f32 {
        match self {
            Self::Fixed { size, len } => *size * index.min(*len) as f32,
            Self::Variable { positions } => positions
                .get(index)
                .or_else(|| positions.last())
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// Size of item `index` (0 when out of range)
    pub fn size(&self, index: usize) -> f32 {
        if index >= self.len() {
            return 0.0;
        }
        self.position(index + 1) - self.position(index)
    }

    /// Combined size of `count` items starting at `index`
    pub fn span_size(&self, index: usize, count: usize) -> f32 {
        let end = index.saturating_add(count).min(self.len());
        (self.position(end) - self.position(index)).max(0.0)
    }

    /// Item containing `offset`. Offsets past the end resolve to the last
    /// item; `None` only for an empty axis.
    pub fn index_at(&self, offset: f32) -> Option<usize> {
        let last = self.len().checked_sub(1)?;
        let index = match self {
            Self::Fixed { size, .. } => {
                if *size <= 0.0 {
                    0
                } else {
                    floor_index(offset / *size)
                }
            }
            Self::Variable { positions } => {
                match positions
                    .binary_search_by(|pos| pos.partial_cmp(&offset).unwrap_or(std::cmp::Ordering::Equal))
                {
                    Ok(i) => i,
                    Err(i) => i.saturating_sub(1),
                }
            }
        };
        Some(index.min(last))
    }

    /// Last item whose leading edge lies strictly before `offset`, i.e. the
    /// last item intersecting `[.., offset)`. Falls back to the first item.
    pub fn last_index_before(&self, offset: f32) -> Option<usize> {
        let last = self.len().checked_sub(1)?;
        let index = match self {
            Self::Fixed { size, .. } => {
                if *size <= 0.0 {
                    last
                } else {
                    let q = offset / *size;
                    let i = floor_index(q);
                    // An offset exactly on a boundary belongs to the item before it
                    if q.fract() == 0.0 { i.saturating_sub(1) } else { i }
                }
            }
            Self::Variable { positions } => {
                positions.partition_point(|pos| *pos < offset).saturating_sub(1)
            }
        };
        Some(index.min(last))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_lookup() {
        let axis = AxisSizing::fixed(24.0, 100);
        assert_eq!(axis.total(), 2400.0);
        assert_eq!(axis.index_at(0.0), Some(0));
        assert_eq!(axis.index_at(23.9), Some(0));
        assert_eq!(axis.index_at(24.0), Some(1));
        assert_eq!(axis.index_at(1e9), Some(99));
        assert_eq!(axis.last_index_before(480.0), Some(19));
        assert_eq!(axis.last_index_before(481.0), Some(20));
        assert_eq!(axis.position(3), 72.0);
    }

    #[test]
    fn test_variable_lookup() {
        let axis = AxisSizing::variable([10.0, 30.0, 20.0]);
        assert_eq!(axis.len(), 3);
        assert_eq!(axis.total(), 60.0);
        assert_eq!(axis.index_at(0.0), Some(0));
        assert_eq!(axis.index_at(10.0), Some(1));
        assert_eq!(axis.index_at(39.0), Some(1));
        assert_eq!(axis.index_at(100.0), Some(2));
        assert_eq!(axis.last_index_before(40.0), Some(1));
        assert_eq!(axis.last_index_before(40.5), Some(2));
        assert_eq!(axis.size(1), 30.0);
        assert_eq!(axis.span_size(0, 2), 40.0);
        assert_eq!(axis.span_size(2, 5), 20.0);
    }

    #[test]
    fn test_empty_axis() {
        let axis = AxisSizing::variable(std::iter::empty());
        assert!(axis.is_empty());
        assert_eq!(axis.index_at(5.0), None);
        assert_eq!(axis.total(), 0.0);
        assert_eq!(AxisSizing::fixed(20.0, 0).last_index_before(10.0), None);
    }
}
