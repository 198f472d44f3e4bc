use serde::Serialize;
use std::ops::Range;

/// Windowing mode of one axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisMode {
    /// Whole axis rendered
    #[default]
    Static,
    /// Only a sub-range rendered
    Windowed,
}

/// Window of one axis after a recompute.
///
/// `visible_start..=visible_end` are the items intersecting the viewport;
/// `start..end` (half-open) is what gets materialized, i.e. the visible
/// range widened by `preload` on each side and clamped to the axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub mode: AxisMode,
    pub len: usize,
    pub visible_start: usize,
    pub visible_end: usize,
    pub preload: usize,
    pub start: usize,
    pub end: usize,
}

impl WindowState {
    /// Window of a zero-length axis
    pub fn empty(mode: AxisMode, preload: usize) -> Self {
        Self {
            mode,
            preload,
            ..Self::default()
        }
    }

    /// Window covering the whole axis
    pub fn full(len: usize, preload: usize) -> Self {
        if len == 0 {
            return Self::empty(AxisMode::Static, preload);
        }
        Self {
            mode: AxisMode::Static,
            len,
            visible_start: 0,
            visible_end: len - 1,
            preload,
            start: 0,
            end: len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Materialized item range
    pub fn materialized(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn materialized_len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Items intersecting the viewport
    pub fn visible(&self) -> Range<usize> {
        if self.len == 0 {
            return 0..0;
        }
        self.visible_start..self.visible_end + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// Whether `visible` lies entirely inside the materialized range
    pub fn covers(&self, visible: &Range<usize>) -> bool {
        visible.start >= self.start && visible.end <= self.end
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window() {
        let w = WindowState::empty(AxisMode::Windowed, 5);
        assert!(w.is_empty());
        assert_eq!(w.materialized(), 0..0);
        assert_eq!(w.visible(), 0..0);
    }

    #[test]
    fn test_full_window() {
        let w = WindowState::full(10, 2);
        assert_eq!(w.materialized(), 0..10);
        assert_eq!(w.visible(), 0..10);
        assert!(w.contains(9));
        assert!(!w.contains(10));
    }
}
