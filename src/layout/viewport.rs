//! Viewport state management for scrolling.

/// Viewport state - the visible area of the grid body.
///
/// `scroll_y` is shared by every pane. `scroll_x` only moves the main
/// pane and is measured over the scrollable (non-fixed) columns, so
/// `scroll_x == 0` shows the first scrollable column right after the
/// left-fixed pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Horizontal scroll position of the main pane
    pub scroll_x: f32,
    /// Vertical scroll position (all panes)
    pub scroll_y: f32,
    /// Body width in pixels, fixed panes included
    pub width: f32,
    /// Body height in pixels, header and footer excluded
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Width left for scrollable columns between the fixed panes
    pub fn body_width(&self, left_fixed: f32, right_fixed: f32) -> f32 {
        (self.width - left_fixed - right_fixed).max(0.0)
    }

    /// Largest valid scroll offsets for the given content extents
    pub fn max_scroll(&self, widths: &PaneWidths, content_height: f32) -> (f32, f32) {
        let body = self.body_width(widths.left, widths.right);
        (
            (widths.center - body).max(0.0),
            (content_height - self.height).max(0.0),
        )
    }

    /// Clamp scroll position to the valid range.
    pub fn clamp_scroll(&mut self, widths: &PaneWidths, content_height: f32) {
        let (max_x, max_y) = self.max_scroll(widths, content_height);
        self.scroll_x = finite_or_zero(self.scroll_x).clamp(0.0, max_x);
        self.scroll_y = finite_or_zero(self.scroll_y).clamp(0.0, max_y);
    }

    /// Resize the viewport
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Widths of the three column strips
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneWidths {
    pub left: f32,
    /// Total width of the scrollable columns
    pub center: f32,
    pub right: f32,
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

    fn widths() -> PaneWidths {
        PaneWidths {
            left: 100.0,
            center: 1000.0,
            right: 50.0,
        }
    }

    fn scrolled(vp: &mut Viewport, x: f32, y: f32) {
        vp.scroll_x = x;
        vp.scroll_y = y;
        vp.clamp_scroll(&widths(), 900.0);
    }

    #[test]
    fn test_clamp_scroll() {
        let mut vp = Viewport::new(450.0, 300.0);
        scrolled(&mut vp, 5000.0, 5000.0);
        assert_eq!(vp.scroll_x, 700.0);
        assert_eq!(vp.scroll_y, 600.0);
        scrolled(&mut vp, -100.0, f32::NAN);
        assert_eq!((vp.scroll_x, vp.scroll_y), (0.0, 0.0));
    }

    #[test]
    fn test_content_smaller_than_viewport() {
        let mut vp = Viewport::new(2000.0, 2000.0);
        scrolled(&mut vp, 10.0, 10.0);
        assert_eq!((vp.scroll_x, vp.scroll_y), (0.0, 0.0));
    }

    #[test]
    fn test_body_width_excludes_fixed_panes() {
        let vp = Viewport::new(450.0, 300.0);
        assert_eq!(vp.body_width(100.0, 50.0), 300.0);
        assert_eq!(vp.body_width(300.0, 300.0), 0.0);
    }
}
