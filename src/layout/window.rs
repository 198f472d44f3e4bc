//! Viewport window calculator.
//!
//! Decides, per axis, which items are materialized for the current scroll
//! offset. The pure computation is [`compute_window`]; [`WindowCalculator`]
//! wraps it with the mode rule and a single-entry cache.

use crate::config::VirtualAxisConfig;
use crate::types::{AxisMode, WindowState};

use super::AxisSizing;

/// Compute the window for one axis.
///
/// The visible range is found with [`AxisSizing::index_at`] /
/// [`AxisSizing::last_index_before`]. In windowed mode the materialized
/// range holds `visible + 2 * preload` items; near either end of the axis
/// it slides inward instead of shrinking, so the window size stays
/// constant while scrolling. The offset is clamped to the scrollable
/// range first.
pub fn compute_window(
    sizing: &AxisSizing,
    mode: AxisMode,
    offset: f32,
    viewport: f32,
    preload: usize,
) -> WindowState {
    let len = sizing.len();
    if len == 0 {
        return WindowState::empty(mode, preload);
    }
    let viewport = viewport.max(0.0);
    let max_offset = (sizing.total() - viewport).max(0.0);
    let offset = if offset.is_finite() {
        offset.clamp(0.0, max_offset)
    } else {
        0.0
    };

    let visible_start = sizing.index_at(offset).unwrap_or(0);
    let visible_end = sizing
        .last_index_before(offset + viewport)
        .unwrap_or(visible_start)
        .max(visible_start);

    let (start, end) = match mode {
        AxisMode::Static => (0, len),
        AxisMode::Windowed => {
            let want = (visible_end - visible_start + 1).saturating_add(preload.saturating_mul(2));
            if want >= len {
                (0, len)
            } else {
                let start = visible_start.saturating_sub(preload).min(len - want);
                (start, start + want)
            }
        }
    };

    WindowState {
        mode,
        len,
        visible_start,
        visible_end,
        preload,
        start,
        end,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CacheKey {
    offset: f32,
    viewport: f32,
    sizing_version: u64,
    len: usize,
}

/// Per-axis window calculator with cached last result
#[derive(Debug, Clone, Default)]
pub struct WindowCalculator {
    config: VirtualAxisConfig,
    cached: Option<(CacheKey, WindowState)>,
    recomputes: u64,
}

impl WindowCalculator {
    pub fn new(config: VirtualAxisConfig) -> Self {
        Self {
            config,
            cached: None,
            recomputes: 0,
        }
    }

    pub fn config(&self) -> &VirtualAxisConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: VirtualAxisConfig) {
        self.config = config;
        self.cached = None;
    }

    /// STATIC or WINDOWED for an axis of this extent
    pub fn mode_for(&self, sizing: &AxisSizing, viewport: f32) -> AxisMode {
        let windowed = match self.config.enabled {
            Some(forced) => forced,
            None => {
                sizing.len() > self.config.min_items
                    && sizing.total() > viewport.max(0.0) * self.config.capacity_factor
            }
        };
        if windowed {
            AxisMode::Windowed
        } else {
            AxisMode::Static
        }
    }

    /// Window for the current inputs.
    ///
    /// `sizing_version` must change whenever item sizes or the item count
    /// change. Identical inputs return the cached window; a scroll delta
    /// below the configured threshold keeps the cached materialized range
    /// as long as it still covers the new visible range.
    pub fn compute(
        &mut self,
        sizing: &AxisSizing,
        sizing_version: u64,
        offset: f32,
        viewport: f32,
    ) -> WindowState {
        let key = CacheKey {
            offset,
            viewport,
            sizing_version,
            len: sizing.len(),
        };
        if let Some((cached_key, state)) = &self.cached {
            if *cached_key == key {
                return *state;
            }
        }

        let mode = self.mode_for(sizing, viewport);
        let mut state = compute_window(sizing, mode, offset, viewport, self.config.preload);

        if let Some((cached_key, cached)) = &self.cached {
            let same_shape = cached_key.sizing_version == key.sizing_version
                && cached_key.len == key.len
                && cached_key.viewport.to_bits() == key.viewport.to_bits()
                && cached.mode == mode;
            let small_delta = (cached_key.offset - offset).abs() < self.config.scroll_threshold_px;
            if same_shape && small_delta && cached.covers(&state.visible()) {
                state.start = cached.start;
                state.end = cached.end;
            }
        }

        if self.cached.map(|(_, s)| s.materialized()) != Some(state.materialized()) {
            self.recomputes += 1;
            tracing::debug!(
                target: "gridview",
                start = state.start,
                end = state.end,
                len = state.len,
                "window recomputed"
            );
        }
        self.cached = Some((key, state));
        state
    }

    /// Last computed window
    pub fn last(&self) -> Option<WindowState> {
        self.cached.map(|(_, s)| s)
    }

    /// Drop the cached window
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Number of times the materialized range changed
    pub fn recomputes(&self) -> u64 {
        self.recomputes
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
    use test_case::test_case;

    fn windowed() -> VirtualAxisConfig {
        VirtualAxisConfig {
            enabled: Some(true),
            ..VirtualAxisConfig::default()
        }
    }

    #[test]
    fn test_initial_mount_window() {
        let sizing = AxisSizing::fixed(24.0, 10_000);
        let w = compute_window(&sizing, AxisMode::Windowed, 0.0, 480.0, 5);
        assert_eq!(w.visible(), 0..20);
        assert_eq!(w.materialized(), 0..30);
    }

    #[test_case(0.0 => (0, 30) ; "top")]
    #[test_case(2400.0 => (95, 125) ; "middle")]
    #[test_case(1e9 => (9970, 10000) ; "past the end")]
    #[test_case(-50.0 => (0, 30) ; "negative offset")]
    fn test_window_slides_at_edges(offset: f32) -> (usize, usize) {
        let sizing = AxisSizing::fixed(24.0, 10_000);
        let w = compute_window(&sizing, AxisMode::Windowed, offset, 480.0, 5);
        (w.start, w.end)
    }

    #[test]
    fn test_single_item_larger_than_viewport() {
        let sizing = AxisSizing::variable([1000.0]);
        let w = compute_window(&sizing, AxisMode::Windowed, 0.0, 480.0, 0);
        assert_eq!(w.visible_start, 0);
        assert_eq!(w.visible_end, 0);
        assert_eq!(w.materialized(), 0..1);
    }

    #[test]
    fn test_preload_larger_than_dataset() {
        let sizing = AxisSizing::fixed(24.0, 8);
        let w = compute_window(&sizing, AxisMode::Windowed, 0.0, 48.0, 100);
        assert_eq!(w.materialized(), 0..8);
    }

    #[test]
    fn test_empty_dataset() {
        let sizing = AxisSizing::fixed(24.0, 0);
        let w = compute_window(&sizing, AxisMode::Windowed, 100.0, 480.0, 5);
        assert!(w.is_empty());
    }

    #[test]
    fn test_auto_mode_rule() {
        let calc = WindowCalculator::new(VirtualAxisConfig::default());
        assert_eq!(calc.mode_for(&AxisSizing::fixed(24.0, 10), 480.0), AxisMode::Static);
        assert_eq!(calc.mode_for(&AxisSizing::fixed(24.0, 100), 480.0), AxisMode::Windowed);
        let calc = WindowCalculator::new(VirtualAxisConfig {
            enabled: Some(false),
            ..VirtualAxisConfig::default()
        });
        assert_eq!(calc.mode_for(&AxisSizing::fixed(24.0, 100), 480.0), AxisMode::Static);
    }

    #[test]
    fn test_cache_reuse_below_threshold() {
        let mut calc = WindowCalculator::new(VirtualAxisConfig {
            scroll_threshold_px: 30.0,
            ..windowed()
        });
        let sizing = AxisSizing::fixed(24.0, 1000);
        let first = calc.compute(&sizing, 1, 240.0, 480.0);
        let second = calc.compute(&sizing, 1, 250.0, 480.0);
        assert_eq!(first.materialized(), second.materialized());
        assert_eq!(calc.recomputes(), 1);

        // A version bump always recomputes from scratch
        let third = calc.compute(&sizing, 2, 1200.0, 480.0);
        assert_eq!(third.visible_start, 50);
        assert_eq!(calc.recomputes(), 2);
    }
}
